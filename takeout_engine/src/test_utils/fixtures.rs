use chrono::{DateTime, Utc};

use crate::{db_types::OrderStatus, SqliteDatabase};

/// Has a payment account (openid) and address book entry [`ALICE_ADDRESS`].
pub const ALICE: i64 = 1;
/// Has address book entry [`BOB_ADDRESS`] but no payment account.
pub const BOB: i64 = 2;
pub const ALICE_ADDRESS: i64 = 1;
pub const BOB_ADDRESS: i64 = 2;
pub const ALICE_OPENID: &str = "o-alice-openid";

pub const KUNG_PAO_CHICKEN: i64 = 1;
pub const KUNG_PAO_PRICE: i64 = 3800;
pub const STEAMED_RICE: i64 = 2;
pub const STEAMED_RICE_PRICE: i64 = 200;
pub const LUNCH_SET: i64 = 1;
pub const LUNCH_SET_PRICE: i64 = 4500;

pub async fn seed_fixtures(db: &SqliteDatabase) {
    let pool = db.pool();
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO users (id, openid, name, phone, created_at) VALUES
            (1, 'o-alice-openid', 'Alice', '13800000001', $1),
            (2, NULL, 'Bob', '13900000002', $1)
        "#,
    )
    .bind(now)
    .execute(pool)
    .await
    .expect("Error seeding users");
    sqlx::query(
        r#"
        INSERT INTO address_book (id, user_id, consignee, sex, phone, province_name, city_name, district_name, detail, label, is_default)
        VALUES
            (1, 1, 'Alice', '0', '13800000001', 'Guangdong', 'Shenzhen', 'Nanshan', 'Keyuan Rd 1', 'home', 1),
            (2, 2, 'Bob', '1', '13900000002', NULL, 'Beijing', NULL, 'Chaoyang Rd 88', 'work', 1)
        "#,
    )
    .execute(pool)
    .await
    .expect("Error seeding address book");
    sqlx::query(
        r#"
        INSERT INTO dish (id, name, image, price) VALUES
            (1, 'Kung Pao Chicken', 'kungpao.png', 3800),
            (2, 'Steamed Rice', 'rice.png', 200)
        "#,
    )
    .execute(pool)
    .await
    .expect("Error seeding dishes");
    sqlx::query("INSERT INTO setmeal (id, name, image, price) VALUES (1, 'Lunch Set', 'lunch.png', 4500)")
        .execute(pool)
        .await
        .expect("Error seeding setmeals");
}

/// Rewrites an order's placement time, so that the sweeps see it as old.
pub async fn backdate_order(db: &SqliteDatabase, order_id: i64, order_time: DateTime<Utc>) {
    sqlx::query("UPDATE orders SET order_time = $1 WHERE id = $2")
        .bind(order_time)
        .bind(order_id)
        .execute(db.pool())
        .await
        .expect("Error backdating order");
}

/// Puts an order straight into `status`, bypassing the lifecycle rules.
pub async fn force_status(db: &SqliteDatabase, order_id: i64, status: OrderStatus) {
    sqlx::query("UPDATE orders SET status = $1, version = version + 1 WHERE id = $2")
        .bind(status)
        .bind(order_id)
        .execute(db.pool())
        .await
        .expect("Error forcing order status");
}
