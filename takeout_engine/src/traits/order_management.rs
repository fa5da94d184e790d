use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{Order, OrderDraft, OrderLine, OrderStatus, User},
    order_objects::{OrderQueryFilter, OrderUpdate, Pagination},
};

#[derive(Debug, Clone, Error)]
pub enum OrderRepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Address book entry #{0} does not exist for this user")]
    AddressNotFound(i64),
    #[error("The shopping cart is empty")]
    CartEmpty,
    #[error("Catalog item not found: {0}")]
    CatalogItemNotFound(String),
    #[error("The cart does not contain {0}")]
    CartItemNotFound(String),
    #[error("Order #{0} does not exist")]
    OrderNotFound(i64),
}

impl From<sqlx::Error> for OrderRepositoryError {
    fn from(e: sqlx::Error) -> Self {
        OrderRepositoryError::DatabaseError(e.to_string())
    }
}

/// Storage behaviour for orders and their lines.
///
/// Every order mutation is a compare-and-set on the order's `version`. Implementations must bump the version on every
/// successful update so that two read-modify-write cycles on the same order can never both succeed.
#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    /// In a single atomic transaction:
    /// * resolves the address book entry `draft.address_book_id`, which must belong to `draft.user_id`,
    /// * reads the user's cart, which must not be empty,
    /// * inserts the order with a snapshot of the address, status `PendingPayment` and pay status `Unpaid`,
    /// * copies every cart entry into an order line,
    /// * empties the cart.
    ///
    /// Either all of this happens, or nothing does.
    async fn create_order_from_cart(&self, draft: OrderDraft) -> Result<(Order, Vec<OrderLine>), OrderRepositoryError>;

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, OrderRepositoryError>;

    async fn fetch_order_by_number(&self, number: &str) -> Result<Option<Order>, OrderRepositoryError>;

    async fn fetch_order_lines(&self, order_id: i64) -> Result<Vec<OrderLine>, OrderRepositoryError>;

    /// Returns the total number of matches along with the requested page, newest orders first.
    async fn search_orders(
        &self,
        query: OrderQueryFilter,
        page: Pagination,
    ) -> Result<(i64, Vec<Order>), OrderRepositoryError>;

    async fn count_orders_with_status(&self, status: OrderStatus) -> Result<i64, OrderRepositoryError>;

    /// Applies `update` to order `id` if, and only if, its version is still `expected_version`.
    ///
    /// Returns the updated order, or `None` if the order has been modified (or removed) since it was read.
    async fn update_order(
        &self,
        id: i64,
        expected_version: i64,
        update: OrderUpdate,
    ) -> Result<Option<Order>, OrderRepositoryError>;

    /// Orders in `status` that were placed strictly before `placed_before`, oldest first.
    async fn fetch_stale_orders(
        &self,
        status: OrderStatus,
        placed_before: DateTime<Utc>,
    ) -> Result<Vec<Order>, OrderRepositoryError>;

    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, OrderRepositoryError>;
}
