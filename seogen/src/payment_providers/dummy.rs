//! Dummy payment provider implementation
//!
//! Creates no external link: the checkout URL is the configured one, or the return URL so the
//! buyer lands straight back in the app. Useful for development.

use async_trait::async_trait;
use url::Url;

use crate::config::DummyConfig;
use crate::payment_providers::{PaymentLink, PaymentLinkRequest, PaymentProvider, Result};

pub struct DummyProvider {
    checkout_url: Option<Url>,
}

impl From<DummyConfig> for DummyProvider {
    fn from(config: DummyConfig) -> Self {
        Self {
            checkout_url: config.checkout_url,
        }
    }
}

#[async_trait]
impl PaymentProvider for DummyProvider {
    async fn create_payment_link(&self, request: &PaymentLinkRequest) -> Result<PaymentLink> {
        let checkout_url = match &self.checkout_url {
            Some(url) => {
                let mut url = url.clone();
                url.query_pairs_mut().append_pair("orderCode", &request.order_code.to_string());
                url.to_string()
            }
            None => request.return_url.clone(),
        };

        tracing::info!(order_code = request.order_code, "Dummy provider created payment link");

        Ok(PaymentLink {
            checkout_url,
            payment_link_id: Some(format!("dummy_{}", request.order_code)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PaymentLinkRequest {
        PaymentLinkRequest {
            order_code: 42,
            amount: 100_000,
            description: "SEO pro".to_string(),
            return_url: "https://app.example.com/billing?status=success".to_string(),
            cancel_url: "https://app.example.com/billing?status=cancelled".to_string(),
        }
    }

    #[tokio::test]
    async fn test_defaults_to_return_url() {
        let provider = DummyProvider::from(DummyConfig::default());
        let link = provider.create_payment_link(&request()).await.unwrap();
        assert_eq!(link.checkout_url, "https://app.example.com/billing?status=success");
        assert_eq!(link.payment_link_id.as_deref(), Some("dummy_42"));
    }

    #[tokio::test]
    async fn test_configured_checkout_url_gets_order_code() {
        let provider = DummyProvider::from(DummyConfig {
            checkout_url: Some(Url::parse("https://pay.example.com/checkout").unwrap()),
        });
        let link = provider.create_payment_link(&request()).await.unwrap();
        assert_eq!(link.checkout_url, "https://pay.example.com/checkout?orderCode=42");
    }
}
