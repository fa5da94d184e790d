use sqlx::SqliteConnection;

use crate::db_types::CatalogItem;

pub async fn fetch_dish(id: i64, conn: &mut SqliteConnection) -> Result<Option<CatalogItem>, sqlx::Error> {
    let dish = sqlx::query_as("SELECT id, name, image, price FROM dish WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(dish)
}

pub async fn fetch_setmeal(id: i64, conn: &mut SqliteConnection) -> Result<Option<CatalogItem>, sqlx::Error> {
    let setmeal = sqlx::query_as("SELECT id, name, image, price FROM setmeal WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(setmeal)
}
