use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{CartItem, OrderLine};

/// Copies a cart entry onto order `order_id`. This is not atomic on its own; run it inside the submission transaction.
pub async fn insert_line_from_cart(
    order_id: i64,
    item: &CartItem,
    conn: &mut SqliteConnection,
) -> Result<OrderLine, sqlx::Error> {
    let line: OrderLine = sqlx::query_as(
        r#"
            INSERT INTO order_detail (order_id, name, image, dish_id, setmeal_id, dish_flavor, number, amount)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(&item.name)
    .bind(&item.image)
    .bind(item.dish_id)
    .bind(item.setmeal_id)
    .bind(&item.dish_flavor)
    .bind(item.number)
    .bind(item.amount)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Line {} ({}x {}) added to order #{order_id}", line.id, line.number, line.name);
    Ok(line)
}

pub async fn fetch_lines(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderLine>, sqlx::Error> {
    let lines = sqlx::query_as("SELECT * FROM order_detail WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(lines)
}
