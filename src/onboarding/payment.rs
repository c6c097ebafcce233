//! Payment-redirect callback handling — bounded subscription re-check.
//!
//! The redirect back from the payment provider says "checkout finished", not
//! "the subscription row is updated": the webhook that flips the status can
//! lag. On a success indicator the handler re-drives the paywall transition,
//! re-checking a fixed number of times with a fixed delay, then gives up
//! with a pending outcome. The budget is a hard bound — there is no
//! self-rescheduling beyond it.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::OnboardingConfig;
use crate::error::Result;

use super::controller::{StepOutcome, WizardController};
use super::gate::GateRefusal;
use super::step::OnboardingStep;

/// Indicator parsed from the redirect-back query parameters.
///
/// Consumed once; stripping the parameters from the URL so a refresh does
/// not re-trigger the handler is the front-end's routing concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentRedirect {
    Success,
    Canceled,
}

impl PaymentRedirect {
    /// Parse the `success`/`canceled` query parameters. `success` wins if a
    /// malformed redirect carries both.
    pub fn from_query(success: Option<&str>, canceled: Option<&str>) -> Option<Self> {
        if success == Some("true") {
            Some(Self::Success)
        } else if canceled == Some("true") {
            Some(Self::Canceled)
        } else {
            None
        }
    }
}

/// Outcome of handling a redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum PaymentOutcome {
    /// Subscription verified; the wizard advanced past the paywall.
    Advanced { step: u8 },
    /// Re-check budget exhausted without the subscription turning paid.
    /// Surfaced as a persistent "verification pending" notice.
    VerificationPending,
    /// User canceled checkout; no state transition, dismissible notice.
    Dismissed,
    /// Redirect arrived while the wizard was not at the paywall step
    /// (stale or replayed); nothing to do.
    Ignored,
}

/// Handles redirect-back indicators for a mounted wizard.
pub struct PaymentCallbackHandler {
    recheck_attempts: u32,
    recheck_delay: Duration,
}

impl PaymentCallbackHandler {
    pub fn new(config: &OnboardingConfig) -> Self {
        Self {
            recheck_attempts: config.payment_recheck_attempts,
            recheck_delay: config.payment_recheck_delay,
        }
    }

    /// Handle a redirect indicator.
    ///
    /// Success: drive `next()` across the paywall; each attempt re-reads the
    /// subscription snapshot through the gate. At most
    /// `recheck_attempts` re-checks follow the initial one.
    pub async fn handle(
        &self,
        wizard: &mut WizardController,
        redirect: PaymentRedirect,
    ) -> Result<PaymentOutcome> {
        match redirect {
            PaymentRedirect::Canceled => {
                info!(user_id = %wizard.session().user_id, "Checkout canceled, staying at paywall");
                Ok(PaymentOutcome::Dismissed)
            }
            PaymentRedirect::Success => self.verify_and_advance(wizard).await,
        }
    }

    async fn verify_and_advance(&self, wizard: &mut WizardController) -> Result<PaymentOutcome> {
        if wizard.step() != OnboardingStep::PlanSelection {
            warn!(
                user_id = %wizard.session().user_id,
                step = wizard.step().index(),
                "Success redirect outside the paywall step, ignoring"
            );
            return Ok(PaymentOutcome::Ignored);
        }

        let mut rechecks = 0u32;
        loop {
            match wizard.next().await? {
                StepOutcome::Advanced(step) => {
                    info!(
                        user_id = %wizard.session().user_id,
                        "Subscription verified, advanced past paywall"
                    );
                    return Ok(PaymentOutcome::Advanced { step: step.index() });
                }
                StepOutcome::Refused(GateRefusal::SubscriptionInactive(status)) => {
                    if rechecks >= self.recheck_attempts {
                        warn!(
                            user_id = %wizard.session().user_id,
                            %status,
                            rechecks,
                            "Subscription still inactive after redirect, giving up"
                        );
                        return Ok(PaymentOutcome::VerificationPending);
                    }
                    rechecks += 1;
                    debug!(
                        user_id = %wizard.session().user_id,
                        %status,
                        attempt = rechecks,
                        "Subscription not yet propagated, re-checking"
                    );
                    tokio::time::sleep(self.recheck_delay).await;
                }
                // The paywall gate only refuses on subscription state; any
                // other refusal means the session data regressed underneath
                // us, which polling will not fix.
                StepOutcome::Refused(other) => {
                    warn!(
                        user_id = %wizard.session().user_id,
                        reason = other.code(),
                        "Unexpected gate refusal during payment verification"
                    );
                    return Ok(PaymentOutcome::VerificationPending);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_parsing() {
        assert_eq!(
            PaymentRedirect::from_query(Some("true"), None),
            Some(PaymentRedirect::Success)
        );
        assert_eq!(
            PaymentRedirect::from_query(None, Some("true")),
            Some(PaymentRedirect::Canceled)
        );
        assert_eq!(PaymentRedirect::from_query(None, None), None);
        assert_eq!(PaymentRedirect::from_query(Some("1"), None), None);
        // Success wins over a contradictory cancel flag.
        assert_eq!(
            PaymentRedirect::from_query(Some("true"), Some("true")),
            Some(PaymentRedirect::Success)
        );
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let json = serde_json::to_value(PaymentOutcome::Advanced { step: 4 }).unwrap();
        assert_eq!(json["outcome"], "advanced");
        assert_eq!(json["step"], 4);

        let json = serde_json::to_value(PaymentOutcome::VerificationPending).unwrap();
        assert_eq!(json["outcome"], "verification_pending");
    }
}
