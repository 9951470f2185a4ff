//! Persistence layer.
//!
//! [`store::Store`] is the single seam handlers use for reads and writes. Each method is one query;
//! nothing here spans several calls in a transaction.

pub mod errors;
pub mod models;
pub mod store;
