//! # SQLite database methods
//!
//! This module contains the "low-level" SQLite interactions.
//!
//! Every interaction is a plain function that takes a `&mut SqliteConnection`. Callers can pass a pooled connection,
//! or open a transaction and pass `&mut tx` to run several of these functions atomically.
use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod address_book;
pub mod cart;
pub mod catalog;
pub mod order_lines;
pub mod orders;
pub mod users;

const SQLITE_DB_URL: &str = "sqlite://data/takeout.db";

pub fn db_url() -> String {
    let result = env::var("TKO_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ TKO_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
