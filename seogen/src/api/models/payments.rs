use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::OrderCode;

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CreatePaymentLinkRequest {
    /// Plan tier, e.g. `pro`
    pub plan: Option<String>,
    /// Amount in VND
    pub amount: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLinkResponse {
    pub checkout_url: String,
    pub order_code: OrderCode,
}
