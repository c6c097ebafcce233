//! Billing status ingest — the webhook relay's write path for subscription
//! state.
//!
//! The wizard only ever reads subscription status; this endpoint is how the
//! row changes when the payment provider's webhook fires. Signature
//! verification belongs to the relay in front of this service.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::put;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::company::model::SubscriptionStatus;
use crate::error::DatabaseError;
use crate::store::CompanyStore;

/// Shared state for billing routes.
#[derive(Clone)]
pub struct BillingRouteState {
    pub companies: Arc<dyn CompanyStore>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionUpdate {
    status: SubscriptionStatus,
}

/// PUT /api/billing/{company_id}/subscription
async fn put_subscription(
    State(state): State<BillingRouteState>,
    Path(company_id): Path<Uuid>,
    Json(update): Json<SubscriptionUpdate>,
) -> impl IntoResponse {
    match state
        .companies
        .set_subscription_status(company_id, update.status)
        .await
    {
        Ok(()) => {
            info!(%company_id, status = %update.status, "Subscription status recorded");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(DatabaseError::NotFound { .. }) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "unknown company" })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// Build the billing REST routes.
pub fn billing_routes(state: BillingRouteState) -> Router {
    Router::new()
        .route("/api/billing/{company_id}/subscription", put(put_subscription))
        .with_state(state)
}
