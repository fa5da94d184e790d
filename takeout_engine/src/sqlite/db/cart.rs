use chrono::{DateTime, Utc};
use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{CartItem, CartItemKey, CatalogItem};

pub async fn fetch_cart(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<CartItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM shopping_cart WHERE user_id = $1 ORDER BY created_at ASC, id ASC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Finds the entry matching the whole of `key`. `IS` is used so that a missing flavor only matches a missing flavor.
pub async fn fetch_entry(
    user_id: i64,
    key: &CartItemKey,
    conn: &mut SqliteConnection,
) -> Result<Option<CartItem>, sqlx::Error> {
    let item = sqlx::query_as(
        r#"
        SELECT * FROM shopping_cart
        WHERE user_id = $1 AND dish_id IS $2 AND setmeal_id IS $3 AND dish_flavor IS $4
        "#,
    )
    .bind(user_id)
    .bind(key.dish_id)
    .bind(key.setmeal_id)
    .bind(&key.dish_flavor)
    .fetch_optional(conn)
    .await?;
    Ok(item)
}

pub async fn insert_entry(
    user_id: i64,
    key: &CartItemKey,
    catalog: &CatalogItem,
    number: i32,
    created_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<CartItem, sqlx::Error> {
    let item: CartItem = sqlx::query_as(
        r#"
            INSERT INTO shopping_cart (user_id, name, image, dish_id, setmeal_id, dish_flavor, number, amount, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(user_id)
    .bind(&catalog.name)
    .bind(&catalog.image)
    .bind(key.dish_id)
    .bind(key.setmeal_id)
    .bind(&key.dish_flavor)
    .bind(number)
    .bind(catalog.price)
    .bind(created_at)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Cart entry {} created for user #{user_id}: {key}", item.id);
    Ok(item)
}

pub async fn set_quantity(id: i64, number: i32, conn: &mut SqliteConnection) -> Result<Option<CartItem>, sqlx::Error> {
    let item = sqlx::query_as("UPDATE shopping_cart SET number = $1 WHERE id = $2 RETURNING *")
        .bind(number)
        .bind(id)
        .fetch_all(conn)
        .await?
        .pop();
    Ok(item)
}

pub async fn delete_entry(id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM shopping_cart WHERE id = $1").bind(id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn clear_cart(user_id: i64, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM shopping_cart WHERE user_id = $1").bind(user_id).execute(conn).await?;
    trace!("🗃️ {} cart entries removed for user #{user_id}", result.rows_affected());
    Ok(result.rows_affected())
}
