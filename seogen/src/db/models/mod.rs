//! Store-level models, shared by the Postgres and in-memory stores.

pub mod articles;
pub mod settings;
pub mod transactions;
pub mod usage;
