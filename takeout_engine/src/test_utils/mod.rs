//! Helpers for tests that need a real database: throw-away SQLite files, migrations and a fixed set of fixtures.
pub mod fixtures;
pub mod prepare_env;
