use sqlx::SqliteConnection;

use crate::db_types::AddressBook;

/// Fetches address book entry `id`, but only if it belongs to `user_id`.
pub async fn fetch_address_for_user(
    id: i64,
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<AddressBook>, sqlx::Error> {
    let address = sqlx::query_as(
        r#"
        SELECT id, user_id, consignee, phone, province_name, city_name, district_name, detail, label, is_default
        FROM address_book
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    Ok(address)
}
