//! SQLite backend for the NetPatrol entity store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Each conditional write is a single
//! statement or transaction on that thread, which gives the per-row
//! serializability the engines rely on.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
