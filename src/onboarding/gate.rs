//! Step gates — pure predicates deciding whether the wizard may enter a
//! target step.
//!
//! The gate never retries, logs, or formats user-facing text; a refusal is an
//! ordinary value the caller surfaces however it wants. The paywall rule
//! consumes whatever subscription snapshot the caller passes in — the caller
//! is responsible for fetching it fresh, immediately before evaluation.

use crate::company::model::SubscriptionStatus;

use super::session::SessionData;
use super::step::OnboardingStep;

/// Why a step transition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRefusal {
    /// Entering step 2 requires a non-empty company name and website.
    IncompleteCompanyProfile,
    /// Entering step 3 requires one of the recognized onboarding paths.
    UnrecognizedPath,
    /// Entering step 4 requires a paid (active or trialing) subscription.
    SubscriptionInactive(SubscriptionStatus),
}

impl GateRefusal {
    /// Stable machine-readable reason code for the API surface.
    pub fn code(&self) -> &'static str {
        match self {
            Self::IncompleteCompanyProfile => "incomplete_company_profile",
            Self::UnrecognizedPath => "unrecognized_path",
            Self::SubscriptionInactive(_) => "subscription_inactive",
        }
    }
}

impl std::fmt::Display for GateRefusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Outcome of a gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Refuse(GateRefusal),
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Decide whether the wizard may enter `target`, given the accumulated form
/// state and (for the paywall transition only) a fresh subscription snapshot.
///
/// A missing snapshot on the paywall transition refuses as if no subscription
/// existed — the gate never assumes payment it cannot see.
pub fn evaluate(
    target: OnboardingStep,
    form: &SessionData,
    subscription: Option<SubscriptionStatus>,
) -> GateDecision {
    use OnboardingStep::*;
    match target {
        // Entering the first step is never gated.
        CompanyProfile => GateDecision::Allow,
        PathSelection => {
            if non_empty(form.company_name()) && non_empty(form.website()) {
                GateDecision::Allow
            } else {
                GateDecision::Refuse(GateRefusal::IncompleteCompanyProfile)
            }
        }
        PlanSelection => {
            if form.onboarding_path().is_some() {
                GateDecision::Allow
            } else {
                GateDecision::Refuse(GateRefusal::UnrecognizedPath)
            }
        }
        BusinessProfile => {
            let status = subscription.unwrap_or(SubscriptionStatus::None);
            if status.is_paid() {
                GateDecision::Allow
            } else {
                GateDecision::Refuse(GateRefusal::SubscriptionInactive(status))
            }
        }
        // Step 5 is always reachable from step 4; the path-specific form
        // validates itself before submitting.
        Review => GateDecision::Allow,
    }
}

fn non_empty(value: Option<&str>) -> bool {
    value.is_some_and(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::session::keys;

    fn form(pairs: &[(&str, &str)]) -> SessionData {
        let mut data = SessionData::new();
        for (k, v) in pairs {
            data.insert_str(k, v);
        }
        data
    }

    #[test]
    fn step_two_requires_name_and_website() {
        let empty = SessionData::new();
        assert_eq!(
            evaluate(OnboardingStep::PathSelection, &empty, None),
            GateDecision::Refuse(GateRefusal::IncompleteCompanyProfile)
        );

        let name_only = form(&[(keys::COMPANY_NAME, "Acme")]);
        assert!(!evaluate(OnboardingStep::PathSelection, &name_only, None).is_allowed());

        let both = form(&[(keys::COMPANY_NAME, "Acme"), (keys::WEBSITE, "acme.com")]);
        assert!(evaluate(OnboardingStep::PathSelection, &both, None).is_allowed());
    }

    #[test]
    fn whitespace_only_fields_do_not_pass() {
        let blank = form(&[(keys::COMPANY_NAME, "   "), (keys::WEBSITE, "acme.com")]);
        assert_eq!(
            evaluate(OnboardingStep::PathSelection, &blank, None),
            GateDecision::Refuse(GateRefusal::IncompleteCompanyProfile)
        );
    }

    #[test]
    fn step_three_requires_recognized_path() {
        let none = SessionData::new();
        assert_eq!(
            evaluate(OnboardingStep::PlanSelection, &none, None),
            GateDecision::Refuse(GateRefusal::UnrecognizedPath)
        );

        let bogus = form(&[(keys::ONBOARDING_PATH, "enterprise")]);
        assert!(!evaluate(OnboardingStep::PlanSelection, &bogus, None).is_allowed());

        for path in ["self_service", "guided"] {
            let chosen = form(&[(keys::ONBOARDING_PATH, path)]);
            assert!(
                evaluate(OnboardingStep::PlanSelection, &chosen, None).is_allowed(),
                "{path} should be accepted"
            );
        }
    }

    #[test]
    fn paywall_requires_paid_subscription() {
        let form = SessionData::new();

        for paid in [SubscriptionStatus::Active, SubscriptionStatus::Trialing] {
            assert!(evaluate(OnboardingStep::BusinessProfile, &form, Some(paid)).is_allowed());
        }

        for blocked in [
            SubscriptionStatus::None,
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Canceled,
            SubscriptionStatus::Incomplete,
            SubscriptionStatus::Unpaid,
        ] {
            assert_eq!(
                evaluate(OnboardingStep::BusinessProfile, &form, Some(blocked)),
                GateDecision::Refuse(GateRefusal::SubscriptionInactive(blocked))
            );
        }
    }

    #[test]
    fn paywall_refuses_without_snapshot() {
        assert_eq!(
            evaluate(OnboardingStep::BusinessProfile, &SessionData::new(), None),
            GateDecision::Refuse(GateRefusal::SubscriptionInactive(SubscriptionStatus::None))
        );
    }

    #[test]
    fn final_step_is_always_allowed() {
        assert!(evaluate(OnboardingStep::Review, &SessionData::new(), None).is_allowed());
    }

    #[test]
    fn refusal_codes_are_stable() {
        assert_eq!(GateRefusal::IncompleteCompanyProfile.code(), "incomplete_company_profile");
        assert_eq!(GateRefusal::UnrecognizedPath.code(), "unrecognized_path");
        assert_eq!(
            GateRefusal::SubscriptionInactive(SubscriptionStatus::None).code(),
            "subscription_inactive"
        );
    }
}
