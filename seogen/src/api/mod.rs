//! HTTP API: route handlers and their request/response models.
//!
//! - **Admin** (`/admin/ai/settings`, `/admin/users`): AI usage dashboard and user management
//! - **Content** (`/articles`, `/articles/publish`, `/generate/image`, `/analyze/readability`)
//! - **Billing** (`/payment/create-link`)
//! - **Settings** (`/settings`, `/settings/test-email`): per-user configuration
//!
//! Every route except `/healthz` and `/docs` requires a session.

pub mod handlers;
pub mod json;
pub mod models;
