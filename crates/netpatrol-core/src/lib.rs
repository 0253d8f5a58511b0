//! Core types, store contract, and state machines for NetPatrol, the
//! ghost-net reporting and salvage tracker.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! engines (`lifecycle`, `negotiation`, `stats`, `accounts`) are plain async
//! functions generic over a [`store::NetStore`]; the acting caller is always
//! passed in explicitly as an [`identity::Caller`].

// Native `async fn` in traits, as in the rest of the workspace.
#![allow(async_fn_in_trait)]

pub mod accounts;
pub mod error;
pub mod guard;
pub mod identity;
pub mod lifecycle;
pub mod model;
pub mod negotiation;
pub mod stats;
pub mod store;

#[cfg(test)]
mod testing;

pub use error::{Error, ErrorKind, Result};
