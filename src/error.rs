//! Error types for the onboarding service.

use uuid::Uuid;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Provisioning error: {0}")]
    Provision(#[from] ProvisionError),

    #[error("Onboarding error: {0}")]
    Onboarding(#[from] OnboardingError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Company provisioning errors.
///
/// The atomic create-and-link is terminal on failure: no partial state is
/// retained and no automatic retry happens. Re-entering onboarding is safe
/// because the read path is idempotent.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("Atomic create-and-link failed for user {user_id}: {reason}")]
    CreateAndLinkFailed { user_id: String, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Wizard controller misuse errors.
///
/// Gate refusals are NOT errors — they come back as `StepOutcome::Refused`.
/// These variants cover transitions the public API does not permit at all.
#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    #[error("Session {id} is already completed")]
    AlreadyCompleted { id: Uuid },

    #[error("Already at the final step")]
    AtFinalStep,

    #[error("finish() requires the final step, wizard is at step {step}")]
    NotAtFinalStep { step: u8 },

    #[error("No active onboarding session for user {user_id}")]
    SessionMissing { user_id: String },
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
