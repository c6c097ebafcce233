//! Configuration types.

use std::time::Duration;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct OnboardingConfig {
    /// Name given to a freshly provisioned company before the user supplies one.
    pub placeholder_company_name: String,
    /// Maximum subscription re-checks after a success redirect (webhook lag).
    /// A hard bound — the handler never reschedules past it.
    pub payment_recheck_attempts: u32,
    /// Delay between subscription re-checks.
    pub payment_recheck_delay: Duration,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            placeholder_company_name: "New company".to_string(),
            payment_recheck_attempts: 3,
            payment_recheck_delay: Duration::from_secs(2),
        }
    }
}
