//! PayOS payment-link provider.
//!
//! `POST {base}/v2/payment-requests` with `x-client-id` / `x-api-key` headers. The body carries an
//! HMAC-SHA256 signature (hex) of `amount=..&cancelUrl=..&description=..&orderCode=..&returnUrl=..`
//! keyed by the checksum key. PayOS answers HTTP 200 even for rejected requests; `code != "00"`
//! is the failure signal.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, instrument};
use url::Url;

use crate::config::PayOsConfig;
use crate::payment_providers::{PaymentLink, PaymentLinkRequest, PaymentProvider, Result};
use crate::providers::{ProviderError, check_status, join_url, read_json};

type HmacSha256 = Hmac<Sha256>;

const PROVIDER: &str = "payos";
const SUCCESS_CODE: &str = "00";

pub struct PayOsProvider {
    client: Client,
    base_url: Url,
    client_id: String,
    api_key: String,
    checksum_key: String,
}

impl PayOsProvider {
    pub fn new(client: Client, config: PayOsConfig) -> Self {
        Self {
            client,
            base_url: config.base_url,
            client_id: config.client_id,
            api_key: config.api_key,
            checksum_key: config.checksum_key,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentRequest<'a> {
    order_code: i64,
    amount: i64,
    description: &'a str,
    cancel_url: &'a str,
    return_url: &'a str,
    signature: String,
}

#[derive(Debug, Deserialize)]
struct PayOsResponse {
    code: String,
    #[serde(default)]
    desc: String,
    data: Option<PaymentLinkData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentLinkData {
    checkout_url: String,
    payment_link_id: Option<String>,
}

/// Hex HMAC-SHA256 of the sorted `key=value` pairs PayOS signs.
pub fn sign_payment_request(request: &PaymentLinkRequest, checksum_key: &str) -> Result<String> {
    let data = format!(
        "amount={}&cancelUrl={}&description={}&orderCode={}&returnUrl={}",
        request.amount, request.cancel_url, request.description, request.order_code, request.return_url
    );

    let mut mac = HmacSha256::new_from_slice(checksum_key.as_bytes()).map_err(|e| ProviderError::InvalidResponse {
        provider: PROVIDER,
        message: format!("cannot key request signature: {e}"),
    })?;
    mac.update(data.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[async_trait]
impl PaymentProvider for PayOsProvider {
    #[instrument(skip_all, fields(order_code = request.order_code))]
    async fn create_payment_link(&self, request: &PaymentLinkRequest) -> Result<PaymentLink> {
        let url = join_url(PROVIDER, &self.base_url, "v2/payment-requests")?;
        let body = CreatePaymentRequest {
            order_code: request.order_code,
            amount: request.amount,
            description: &request.description,
            cancel_url: &request.cancel_url,
            return_url: &request.return_url,
            signature: sign_payment_request(request, &self.checksum_key)?,
        };

        debug!("Creating PayOS payment link");
        let response = self
            .client
            .post(url)
            .header("x-client-id", &self.client_id)
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;
        let response = check_status(PROVIDER, response).await?;
        let parsed: PayOsResponse = read_json(PROVIDER, response).await?;

        if parsed.code != SUCCESS_CODE {
            return Err(ProviderError::Rejected {
                provider: PROVIDER,
                code: parsed.code,
                message: parsed.desc,
            });
        }

        let data = parsed.data.ok_or_else(|| ProviderError::InvalidResponse {
            provider: PROVIDER,
            message: "success response without data".to_string(),
        })?;

        Ok(PaymentLink {
            checkout_url: data.checkout_url,
            payment_link_id: data.payment_link_id,
        })
    }
}
