use std::sync::Arc;
use std::time::Duration;

use tower_http::cors::CorsLayer;

use tenant_onboarding::billing::{BillingRouteState, billing_routes};
use tenant_onboarding::company::CompanyProvisioner;
use tenant_onboarding::config::OnboardingConfig;
use tenant_onboarding::onboarding::routes::{OnboardingRouteState, onboarding_routes};
use tenant_onboarding::onboarding::{PaymentCallbackHandler, WizardDeps};
use tenant_onboarding::store::{CompanyStore, LibSqlBackend, SessionStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let port: u16 = std::env::var("ONBOARD_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);

    let db_path =
        std::env::var("ONBOARD_DB_PATH").unwrap_or_else(|_| "./data/onboarding.db".to_string());

    let mut config = OnboardingConfig::default();
    if let Ok(attempts) = std::env::var("ONBOARD_PAYMENT_RECHECKS") {
        config.payment_recheck_attempts = attempts.parse().unwrap_or(config.payment_recheck_attempts);
    }
    if let Ok(delay_secs) = std::env::var("ONBOARD_PAYMENT_RECHECK_DELAY_SECS") {
        if let Ok(secs) = delay_secs.parse() {
            config.payment_recheck_delay = Duration::from_secs(secs);
        }
    }

    eprintln!("🏢 Tenant Onboarding v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://0.0.0.0:{}/api/onboarding", port);
    eprintln!("   Database: {}", db_path);

    // ── Database ─────────────────────────────────────────────────────────
    let backend = Arc::new(
        LibSqlBackend::new_local(std::path::Path::new(&db_path))
            .await
            .unwrap_or_else(|e| {
                eprintln!("Error: Failed to open database at {}: {}", db_path, e);
                std::process::exit(1);
            }),
    );
    let sessions: Arc<dyn SessionStore> = backend.clone();
    let companies: Arc<dyn CompanyStore> = backend.clone();

    // ── Wizard wiring ────────────────────────────────────────────────────
    let provisioner = Arc::new(CompanyProvisioner::new(
        companies.clone(),
        config.placeholder_company_name.clone(),
    ));
    let payment = Arc::new(PaymentCallbackHandler::new(&config));
    let deps = WizardDeps {
        sessions,
        companies: companies.clone(),
    };

    let app = onboarding_routes(OnboardingRouteState::new(deps, provisioner, payment))
        .merge(billing_routes(BillingRouteState {
            companies: companies.clone(),
        }))
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "Onboarding service listening");
    axum::serve(listener, app).await?;

    Ok(())
}
