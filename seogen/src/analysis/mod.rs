//! Text analysis that runs locally, without a provider call.

pub mod readability;
