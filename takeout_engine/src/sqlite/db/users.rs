use sqlx::SqliteConnection;

use crate::db_types::User;

pub async fn fetch_user(id: i64, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    let user = sqlx::query_as("SELECT id, openid, name, phone, created_at FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(user)
}
