//! SQLite backend for the disaster data mart.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{LocationRow, SqliteWarehouse};

#[cfg(test)]
mod tests;
