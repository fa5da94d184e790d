use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::{test_utils::fixtures::seed_fixtures, SqliteDatabase};

/// Replaces whatever lives at `url` with a freshly migrated database holding the standard fixtures.
pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    recreate_database(url).await;
    let db = SqliteDatabase::new_with_url(url, 2).await.expect("Could not open the test database");
    db.run_migrations().await.expect("Could not migrate the test database");
    seed_fixtures(&db).await;
    debug!("🗃️ Test database {url} is ready");
    db.close().await;
}

/// A database file under the workspace `data` directory that no other test is using.
pub fn random_db_path() -> String {
    format!("sqlite://../data/test_takeout_{}", rand::random::<u64>())
}

async fn recreate_database(url: &str) {
    if Sqlite::database_exists(url).await.unwrap_or(false) {
        if let Err(e) = Sqlite::drop_database(url).await {
            warn!("🗃️ Could not drop the old test database {url}. {e}");
        }
    }
    Sqlite::create_database(url).await.expect("Could not create the test database");
}
