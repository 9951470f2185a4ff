//! Authentication against the hosted auth service.
//!
//! - [`supabase`]: client for session lookups and the admin user API
//! - [`current_user`]: extractors resolving the caller on every request

pub mod current_user;
pub mod supabase;
