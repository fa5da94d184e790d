use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{AddressBook, Order, OrderDraft, OrderStatus, PayStatus},
    order_objects::{OrderQueryFilter, OrderUpdate, Pagination},
};

/// Inserts a new order using the given connection. This is not atomic. Embed the call inside a transaction and pass
/// `&mut tx` as the connection when the order must appear together with its lines.
///
/// The consignee, phone and address are copied from `address`. The order starts out `PendingPayment` and `Unpaid`.
pub async fn insert_order(
    draft: &OrderDraft,
    address: &AddressBook,
    user_name: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<Order, sqlx::Error> {
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                number,
                status,
                user_id,
                address_book_id,
                order_time,
                pay_method,
                pay_status,
                amount,
                remark,
                phone,
                address,
                user_name,
                consignee,
                estimated_delivery_time,
                delivery_status,
                pack_amount,
                tableware_number,
                tableware_status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING *;
        "#,
    )
    .bind(&draft.number)
    .bind(OrderStatus::PendingPayment)
    .bind(draft.user_id)
    .bind(draft.address_book_id)
    .bind(draft.order_time)
    .bind(draft.pay_method)
    .bind(PayStatus::Unpaid)
    .bind(draft.amount)
    .bind(&draft.remark)
    .bind(&address.phone)
    .bind(address.full_address())
    .bind(user_name)
    .bind(&address.consignee)
    .bind(draft.estimated_delivery_time)
    .bind(draft.delivery_status)
    .bind(draft.pack_amount)
    .bind(draft.tableware_number)
    .bind(draft.tableware_status)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Order [{}] inserted with id {}", order.number, order.id);
    Ok(order)
}

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_by_number(number: &str, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE number = $1").bind(number).fetch_optional(conn).await?;
    Ok(order)
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &OrderQueryFilter) {
    if query.is_empty() {
        return;
    }
    builder.push(" WHERE ");
    let mut where_clause = builder.separated(" AND ");
    if let Some(number) = &query.number {
        where_clause.push("number LIKE ");
        where_clause.push_bind_unseparated(format!("%{number}%"));
    }
    if let Some(phone) = &query.phone {
        where_clause.push("phone LIKE ");
        where_clause.push_bind_unseparated(format!("%{phone}%"));
    }
    if let Some(user_id) = query.user_id {
        where_clause.push("user_id = ");
        where_clause.push_bind_unseparated(user_id);
    }
    if let Some(statuses) = query.status.as_ref().filter(|s| !s.is_empty()) {
        let codes = statuses.iter().map(|s| i32::from(*s).to_string()).collect::<Vec<String>>().join(",");
        where_clause.push(format!("status IN ({codes})"));
    }
    if let Some(since) = query.since {
        where_clause.push("order_time >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("order_time <= ");
        where_clause.push_bind_unseparated(until);
    }
}

/// Fetches one page of the orders matching `query`, newest first, along with the total number of matches.
pub async fn search_orders(
    query: &OrderQueryFilter,
    page: Pagination,
    conn: &mut SqliteConnection,
) -> Result<(i64, Vec<Order>), sqlx::Error> {
    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM orders");
    push_filters(&mut count, query);
    trace!("🗃️ Executing query: {}", count.sql());
    let total = count.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;

    let mut builder = QueryBuilder::new("SELECT * FROM orders");
    push_filters(&mut builder, query);
    builder.push(" ORDER BY order_time DESC, id DESC LIMIT ");
    builder.push_bind(page.limit());
    builder.push(" OFFSET ");
    builder.push_bind(page.offset());
    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("🗃️ search_orders: {} of {total} matches returned", orders.len());
    Ok((total, orders))
}

pub async fn count_with_status(status: OrderStatus, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE status = $1").bind(status).fetch_one(conn).await?;
    Ok(count)
}

/// Applies `update` to order `id` only if the stored version is still `expected_version`, and bumps the version.
///
/// Returns `None` when no row matched, i.e. the order is missing or was modified concurrently.
pub async fn update_order(
    id: i64,
    expected_version: i64,
    update: OrderUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    if update.is_empty() {
        debug!("🗃️ No fields to update for order #{id}. Only the version will change.");
    }
    let mut builder = QueryBuilder::new("UPDATE orders SET version = version + 1");
    if let Some(status) = update.status {
        builder.push(", status = ");
        builder.push_bind(status);
    }
    if let Some(pay_status) = update.pay_status {
        builder.push(", pay_status = ");
        builder.push_bind(pay_status);
    }
    if let Some(checkout_time) = update.checkout_time {
        builder.push(", checkout_time = ");
        builder.push_bind(checkout_time);
    }
    if let Some(reason) = update.cancel_reason {
        builder.push(", cancel_reason = ");
        builder.push_bind(reason);
    }
    if let Some(reason) = update.rejection_reason {
        builder.push(", rejection_reason = ");
        builder.push_bind(reason);
    }
    if let Some(cancel_time) = update.cancel_time {
        builder.push(", cancel_time = ");
        builder.push_bind(cancel_time);
    }
    if let Some(delivery_time) = update.delivery_time {
        builder.push(", delivery_time = ");
        builder.push_bind(delivery_time);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" AND version = ");
    builder.push_bind(expected_version);
    builder.push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    // RETURNING must be stepped to completion or the write stays open on this connection
    let order = builder.build_query_as::<Order>().fetch_all(conn).await?.pop();
    trace!("🗃️ Result of update_order: {order:?}");
    Ok(order)
}

/// Orders in `status` placed strictly before `placed_before`, oldest first.
pub async fn fetch_stale_orders(
    status: OrderStatus,
    placed_before: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE status = $1 AND order_time < $2 ORDER BY order_time, id")
        .bind(status)
        .bind(placed_before)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}
