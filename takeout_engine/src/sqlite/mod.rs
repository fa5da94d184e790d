//! SQLite backend for the takeout engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
