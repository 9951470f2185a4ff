//! Payment link creation.

use crate::{
    AppState,
    api::handlers::required,
    api::json::Json,
    api::models::{
        payments::{CreatePaymentLinkRequest, PaymentLinkResponse},
        users::CurrentUser,
    },
    db::models::transactions::{NewTransaction, TransactionStatus},
    errors::{Error, Result},
    payment_providers::{PaymentLinkRequest, describe_plan, generate_order_code},
    providers::{ProviderError, ensure_slash},
    types::abbrev_uuid,
};
use axum::extract::State;
use tracing::{error, info};
use url::Url;

/// `{app_base_url}/dashboard/billing?status=<status>`
fn billing_url(base: &Url, status: &str) -> Result<String> {
    let mut url = ensure_slash(base)
        .join("dashboard/billing")
        .map_err(|e| anyhow::anyhow!("Cannot build billing URL from '{base}': {e}"))?;
    url.query_pairs_mut().append_pair("status", status);
    Ok(url.into())
}

/// Create a hosted payment link for a plan
#[utoipa::path(
    post,
    path = "/payment/create-link",
    tag = "payments",
    summary = "Create payment link",
    description = "Records a PENDING transaction under a fresh order code, then asks the payment provider for a checkout link. \
                   If the provider fails the transaction is marked FAILED.",
    request_body = CreatePaymentLinkRequest,
    responses(
        (status = 200, description = "Checkout link created", body = PaymentLinkResponse),
        (status = 400, description = "Missing plan or amount, or non-positive amount"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Payment provider error or no provider configured"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %abbrev_uuid(&user.id)))]
pub async fn create_payment_link(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreatePaymentLinkRequest>,
) -> Result<Json<PaymentLinkResponse>> {
    let plan = required("plan", request.plan)?;
    let amount = request.amount.ok_or_else(|| Error::missing_field("amount"))?;
    if amount <= 0 {
        return Err(Error::bad_request("Invalid amount: must be a positive integer"));
    }

    let provider = state
        .payments
        .clone()
        .ok_or_else(|| ProviderError::NotConfigured("Payment provider is not configured".to_string()))?;

    let link_request = PaymentLinkRequest {
        order_code: generate_order_code(),
        amount,
        description: describe_plan(&plan),
        return_url: billing_url(&state.config.app_base_url, "success")?,
        cancel_url: billing_url(&state.config.app_base_url, "cancelled")?,
    };
    let order_code = link_request.order_code;

    state
        .store
        .create_transaction(&NewTransaction {
            order_code,
            user_id: user.id,
            plan: plan.clone(),
            amount,
        })
        .await?;

    let link = match provider.create_payment_link(&link_request).await {
        Ok(link) => link,
        Err(e) => {
            if let Err(mark_err) = state.store.set_transaction_status(order_code, TransactionStatus::Failed).await {
                error!(order_code, "Failed to mark transaction FAILED: {mark_err}");
            }
            return Err(e.into());
        }
    };

    state
        .store
        .attach_checkout(order_code, &link.checkout_url, link.payment_link_id.as_deref())
        .await?;
    info!(order_code, %plan, amount, "Payment link created");

    Ok(Json(PaymentLinkResponse {
        checkout_url: link.checkout_url,
        order_code,
    }))
}
