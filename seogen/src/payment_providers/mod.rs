//! Payment provider abstraction layer
//!
//! [`PaymentProvider`] creates hosted payment links. Status transitions after the link is created
//! arrive through the provider's webhook, which this service does not handle.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::PaymentConfig;
use crate::providers::ProviderError;
use crate::types::{MAX_ORDER_CODE, OrderCode};

pub mod dummy;
pub mod payos;

/// Longest description PayOS accepts for bank transfers
pub const MAX_DESCRIPTION_CHARS: usize = 25;

/// Create a payment provider from configuration
pub fn create_provider(config: PaymentConfig, http: reqwest::Client) -> Arc<dyn PaymentProvider> {
    match config {
        PaymentConfig::PayOs(payos_config) => Arc::new(payos::PayOsProvider::new(http, payos_config)),
        PaymentConfig::Dummy(dummy_config) => Arc::new(dummy::DummyProvider::from(dummy_config)),
    }
}

/// Result type for payment provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

#[derive(Debug, Clone)]
pub struct PaymentLinkRequest {
    pub order_code: OrderCode,
    /// Amount in the smallest currency unit (VND has no minor unit)
    pub amount: i64,
    pub description: String,
    pub return_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone)]
pub struct PaymentLink {
    pub checkout_url: String,
    pub payment_link_id: Option<String>,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a hosted payment link. Returns the URL the buyer should be redirected to.
    async fn create_payment_link(&self, request: &PaymentLinkRequest) -> Result<PaymentLink>;
}

/// Fresh order code in `1..=MAX_ORDER_CODE`, taken from the random bits of a v4 UUID.
pub fn generate_order_code() -> OrderCode {
    let bits = (Uuid::new_v4().as_u128() & (MAX_ORDER_CODE as u128)) as OrderCode;
    bits.max(1)
}

/// Transfer description for a plan, cut to what the provider accepts.
pub fn describe_plan(plan: &str) -> String {
    format!("SEO {plan}").chars().take(MAX_DESCRIPTION_CHARS).collect()
}
