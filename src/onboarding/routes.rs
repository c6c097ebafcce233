//! REST endpoints for the onboarding wizard.
//!
//! Keeps a registry of mounted controllers, one per user, each behind its own
//! mutex — that lock is what serializes transitions so a second `next()`
//! cannot start while one is in flight. `start` remounts from persisted
//! state (the "page reload" path); every other endpoint mounts on demand.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};

use crate::company::provisioner::CompanyProvisioner;
use crate::error::{Error, OnboardingError};

use super::controller::{StepOutcome, WizardController, WizardDeps};
use super::payment::{PaymentCallbackHandler, PaymentRedirect};
use super::session::SessionData;

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    deps: WizardDeps,
    provisioner: Arc<CompanyProvisioner>,
    payment: Arc<PaymentCallbackHandler>,
    mounted: Arc<RwLock<HashMap<String, Arc<Mutex<WizardController>>>>>,
}

impl OnboardingRouteState {
    pub fn new(
        deps: WizardDeps,
        provisioner: Arc<CompanyProvisioner>,
        payment: Arc<PaymentCallbackHandler>,
    ) -> Self {
        Self {
            deps,
            provisioner,
            payment,
            mounted: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get the mounted wizard for a user, mounting from persisted state if
    /// none is cached.
    async fn wizard_for(
        &self,
        user_id: &str,
    ) -> Result<Arc<Mutex<WizardController>>, Error> {
        if let Some(wizard) = self.mounted.read().await.get(user_id) {
            return Ok(wizard.clone());
        }

        let controller =
            WizardController::mount(self.deps.clone(), &self.provisioner, user_id).await?;
        let mut mounted = self.mounted.write().await;
        // A racing mount may have inserted first; keep whichever won.
        Ok(mounted
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(controller)))
            .clone())
    }

    /// Mount fresh from persisted state, replacing any cached controller.
    async fn remount(&self, user_id: &str) -> Result<Arc<Mutex<WizardController>>, Error> {
        let controller =
            WizardController::mount(self.deps.clone(), &self.provisioner, user_id).await?;
        let wizard = Arc::new(Mutex::new(controller));
        self.mounted
            .write()
            .await
            .insert(user_id.to_string(), wizard.clone());
        Ok(wizard)
    }
}

/// Translate a service error into an HTTP response. This is the single place
/// collaborator failures become user-visible notices.
fn error_response(err: Error) -> (StatusCode, Json<serde_json::Value>) {
    let status = match &err {
        Error::Onboarding(OnboardingError::SessionMissing { .. }) => StatusCode::NOT_FOUND,
        Error::Onboarding(_) => StatusCode::CONFLICT,
        Error::Config(_) | Error::Database(_) | Error::Provision(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(serde_json::json!({ "error": err.to_string() })))
}

/// POST /api/onboarding/{user_id}/start
///
/// The page-load entry point: provisions the company if needed and mounts
/// (or remounts) the wizard from persisted state.
async fn start(
    State(state): State<OnboardingRouteState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    match state.remount(&user_id).await {
        Ok(wizard) => Json(wizard.lock().await.status()).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// GET /api/onboarding/{user_id}/status
async fn status(
    State(state): State<OnboardingRouteState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    match state.wizard_for(&user_id).await {
        Ok(wizard) => Json(wizard.lock().await.status()).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// POST /api/onboarding/{user_id}/form
///
/// Merge step-local form fields into the in-memory form state. Nothing is
/// persisted until the next successful transition.
async fn merge_form(
    State(state): State<OnboardingRouteState>,
    Path(user_id): Path<String>,
    Json(fields): Json<SessionData>,
) -> impl IntoResponse {
    match state.wizard_for(&user_id).await {
        Ok(wizard) => {
            let mut wizard = wizard.lock().await;
            wizard.update_form(fields);
            Json(wizard.status()).into_response()
        }
        Err(e) => error_response(e).into_response(),
    }
}

/// POST /api/onboarding/{user_id}/next
async fn next_step(
    State(state): State<OnboardingRouteState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let wizard = match state.wizard_for(&user_id).await {
        Ok(w) => w,
        Err(e) => return error_response(e).into_response(),
    };
    let mut wizard = wizard.lock().await;
    match wizard.next().await {
        Ok(StepOutcome::Advanced(step)) => Json(serde_json::json!({
            "result": "advanced",
            "step": step.index(),
        }))
        .into_response(),
        // A refusal is the gate's normal "not yet", not an error status.
        Ok(StepOutcome::Refused(refusal)) => Json(serde_json::json!({
            "result": "refused",
            "reason": refusal.code(),
        }))
        .into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// POST /api/onboarding/{user_id}/previous
async fn previous_step(
    State(state): State<OnboardingRouteState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    match state.wizard_for(&user_id).await {
        Ok(wizard) => {
            let mut wizard = wizard.lock().await;
            wizard.previous();
            Json(wizard.status()).into_response()
        }
        Err(e) => error_response(e).into_response(),
    }
}

/// POST /api/onboarding/{user_id}/finish
async fn finish(
    State(state): State<OnboardingRouteState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let wizard = match state.wizard_for(&user_id).await {
        Ok(w) => w,
        Err(e) => return error_response(e).into_response(),
    };
    let mut wizard = wizard.lock().await;
    match wizard.finish().await {
        Ok(()) => Json(wizard.status()).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct PaymentQuery {
    success: Option<String>,
    canceled: Option<String>,
}

/// POST /api/onboarding/{user_id}/payment-callback
///
/// The front-end forwards the redirect-back indicator here once, then strips
/// it from its URL so a refresh does not re-trigger the handler.
async fn payment_callback(
    State(state): State<OnboardingRouteState>,
    Path(user_id): Path<String>,
    Query(query): Query<PaymentQuery>,
) -> impl IntoResponse {
    let Some(redirect) =
        PaymentRedirect::from_query(query.success.as_deref(), query.canceled.as_deref())
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "missing payment indicator" })),
        )
            .into_response();
    };

    let wizard = match state.wizard_for(&user_id).await {
        Ok(w) => w,
        Err(e) => return error_response(e).into_response(),
    };
    let mut wizard = wizard.lock().await;
    match state.payment.handle(&mut wizard, redirect).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/api/onboarding/{user_id}/start", post(start))
        .route("/api/onboarding/{user_id}/status", get(status))
        .route("/api/onboarding/{user_id}/form", post(merge_form))
        .route("/api/onboarding/{user_id}/next", post(next_step))
        .route("/api/onboarding/{user_id}/previous", post(previous_step))
        .route("/api/onboarding/{user_id}/finish", post(finish))
        .route(
            "/api/onboarding/{user_id}/payment-callback",
            post(payment_callback),
        )
        .with_state(state)
}
