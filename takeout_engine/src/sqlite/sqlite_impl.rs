//! `SqliteDatabase` is the concrete storage backend of the takeout engine.
//!
//! It implements every repository trait in [`crate::traits`]. Multi-statement operations run inside a single
//! transaction that is committed at the end of the method; returning early with an error drops the transaction, which
//! rolls it back.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{address_book, cart, catalog, db_url, new_pool, order_lines, orders, users};
use crate::{
    db_types::{CartItem, CartItemKey, CatalogItem, Order, OrderDraft, OrderLine, OrderStatus, User},
    order_objects::{OrderQueryFilter, OrderUpdate, Pagination},
    traits::{CartManagement, OrderManagement, OrderRepositoryError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({})", self.url)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn create_order_from_cart(&self, draft: OrderDraft) -> Result<(Order, Vec<OrderLine>), OrderRepositoryError> {
        let mut tx = self.pool.begin().await?;
        let address = address_book::fetch_address_for_user(draft.address_book_id, draft.user_id, &mut tx)
            .await?
            .ok_or(OrderRepositoryError::AddressNotFound(draft.address_book_id))?;
        let items = cart::fetch_cart(draft.user_id, &mut tx).await?;
        if items.is_empty() {
            debug!("🗃️ User #{} tried to submit an empty cart", draft.user_id);
            return Err(OrderRepositoryError::CartEmpty);
        }
        let user_name = users::fetch_user(draft.user_id, &mut tx).await?.and_then(|u| u.name);
        let order = orders::insert_order(&draft, &address, user_name, &mut tx).await?;
        let mut lines = Vec::with_capacity(items.len());
        for item in &items {
            let line = order_lines::insert_line_from_cart(order.id, item, &mut tx).await?;
            lines.push(line);
        }
        let cleared = cart::clear_cart(draft.user_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order [{}] saved with {} lines. {cleared} cart entries consumed.", order.number, lines.len());
        Ok((order, lines))
    }

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, OrderRepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_number(&self, number: &str) -> Result<Option<Order>, OrderRepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_number(number, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_lines(&self, order_id: i64) -> Result<Vec<OrderLine>, OrderRepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let lines = order_lines::fetch_lines(order_id, &mut conn).await?;
        Ok(lines)
    }

    async fn search_orders(
        &self,
        query: OrderQueryFilter,
        page: Pagination,
    ) -> Result<(i64, Vec<Order>), OrderRepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let result = orders::search_orders(&query, page, &mut conn).await?;
        Ok(result)
    }

    async fn count_orders_with_status(&self, status: OrderStatus) -> Result<i64, OrderRepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let count = orders::count_with_status(status, &mut conn).await?;
        Ok(count)
    }

    async fn update_order(
        &self,
        id: i64,
        expected_version: i64,
        update: OrderUpdate,
    ) -> Result<Option<Order>, OrderRepositoryError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::update_order(id, expected_version, update, &mut tx).await?;
        tx.commit().await?;
        if order.is_none() {
            debug!("🗃️ Update of order #{id} at version {expected_version} matched nothing");
        }
        Ok(order)
    }

    async fn fetch_stale_orders(
        &self,
        status: OrderStatus,
        placed_before: DateTime<Utc>,
    ) -> Result<Vec<Order>, OrderRepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_stale_orders(status, placed_before, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, OrderRepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::fetch_user(user_id, &mut conn).await?;
        Ok(user)
    }
}

impl CartManagement for SqliteDatabase {
    async fn fetch_cart(&self, user_id: i64) -> Result<Vec<CartItem>, OrderRepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let items = cart::fetch_cart(user_id, &mut conn).await?;
        Ok(items)
    }

    async fn add_to_cart(&self, user_id: i64, key: &CartItemKey) -> Result<CartItem, OrderRepositoryError> {
        let mut tx = self.pool.begin().await?;
        let item = match cart::fetch_entry(user_id, key, &mut tx).await? {
            Some(existing) => cart::set_quantity(existing.id, existing.number + 1, &mut tx)
                .await?
                .ok_or_else(|| OrderRepositoryError::CartItemNotFound(key.to_string()))?,
            None => {
                let catalog_item = match (key.dish_id, key.setmeal_id) {
                    (Some(id), _) => catalog::fetch_dish(id, &mut tx).await?,
                    (None, Some(id)) => catalog::fetch_setmeal(id, &mut tx).await?,
                    (None, None) => None,
                }
                .ok_or_else(|| OrderRepositoryError::CatalogItemNotFound(key.to_string()))?;
                cart::insert_entry(user_id, key, &catalog_item, 1, Utc::now(), &mut tx).await?
            },
        };
        tx.commit().await?;
        trace!("🗃️ User #{user_id} now has {}x {key} in the cart", item.number);
        Ok(item)
    }

    async fn subtract_from_cart(
        &self,
        user_id: i64,
        key: &CartItemKey,
    ) -> Result<Option<CartItem>, OrderRepositoryError> {
        let mut tx = self.pool.begin().await?;
        let existing = cart::fetch_entry(user_id, key, &mut tx)
            .await?
            .ok_or_else(|| OrderRepositoryError::CartItemNotFound(key.to_string()))?;
        let item = if existing.number > 1 {
            cart::set_quantity(existing.id, existing.number - 1, &mut tx).await?
        } else {
            cart::delete_entry(existing.id, &mut tx).await?;
            None
        };
        tx.commit().await?;
        Ok(item)
    }

    async fn clear_cart(&self, user_id: i64) -> Result<u64, OrderRepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let removed = cart::clear_cart(user_id, &mut conn).await?;
        Ok(removed)
    }

    async fn reorder_into_cart(&self, user_id: i64, order_id: i64) -> Result<Vec<CartItem>, OrderRepositoryError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order(order_id, &mut tx)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or(OrderRepositoryError::OrderNotFound(order_id))?;
        let lines = order_lines::fetch_lines(order.id, &mut tx).await?;
        let now = Utc::now();
        for line in lines {
            let key = CartItemKey { dish_id: line.dish_id, setmeal_id: line.setmeal_id, dish_flavor: line.dish_flavor };
            match cart::fetch_entry(user_id, &key, &mut tx).await? {
                Some(existing) => {
                    cart::set_quantity(existing.id, existing.number + line.number, &mut tx).await?;
                },
                None => {
                    let snapshot = CatalogItem { id: 0, name: line.name, image: line.image, price: line.amount };
                    cart::insert_entry(user_id, &key, &snapshot, line.number, now, &mut tx).await?;
                },
            }
        }
        let items = cart::fetch_cart(user_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order [{}] copied back into the cart of user #{user_id}", order.number);
        Ok(items)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using `TKO_DATABASE_URL` for the connection
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies any outstanding schema migrations.
    pub async fn run_migrations(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
