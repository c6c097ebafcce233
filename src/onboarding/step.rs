//! Wizard steps — the five-position onboarding state machine.

use serde::{Deserialize, Serialize};

/// The steps of the onboarding wizard.
///
/// Progresses linearly: CompanyProfile → PathSelection → PlanSelection →
/// BusinessProfile → Review. Completion is a flag on the session, orthogonal
/// to the step position, reachable only from `Review`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    /// Step 1 — company name and website.
    CompanyProfile,
    /// Step 2 — choice between the two onboarding paths.
    PathSelection,
    /// Step 3 — plan selection; the paywall sits between this step and the next.
    PlanSelection,
    /// Step 4 — path-specific business profile form.
    BusinessProfile,
    /// Step 5 — review and final submission.
    Review,
}

impl OnboardingStep {
    /// The step a fresh session starts at.
    pub const FIRST: OnboardingStep = OnboardingStep::CompanyProfile;

    /// 1-based position, as persisted in the session row.
    pub fn index(&self) -> u8 {
        match self {
            Self::CompanyProfile => 1,
            Self::PathSelection => 2,
            Self::PlanSelection => 3,
            Self::BusinessProfile => 4,
            Self::Review => 5,
        }
    }

    /// Inverse of `index()`.
    pub fn from_index(index: u8) -> Option<OnboardingStep> {
        match index {
            1 => Some(Self::CompanyProfile),
            2 => Some(Self::PathSelection),
            3 => Some(Self::PlanSelection),
            4 => Some(Self::BusinessProfile),
            5 => Some(Self::Review),
            _ => None,
        }
    }

    /// Get the next step in the linear progression, if any.
    pub fn next(&self) -> Option<OnboardingStep> {
        use OnboardingStep::*;
        match self {
            CompanyProfile => Some(PathSelection),
            PathSelection => Some(PlanSelection),
            PlanSelection => Some(BusinessProfile),
            BusinessProfile => Some(Review),
            Review => None,
        }
    }

    /// Get the previous step, if any.
    pub fn previous(&self) -> Option<OnboardingStep> {
        use OnboardingStep::*;
        match self {
            CompanyProfile => None,
            PathSelection => Some(CompanyProfile),
            PlanSelection => Some(PathSelection),
            BusinessProfile => Some(PlanSelection),
            Review => Some(BusinessProfile),
        }
    }

    /// Whether this is the final step (where `finish()` becomes legal).
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Review)
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CompanyProfile => "company_profile",
            Self::PathSelection => "path_selection",
            Self::PlanSelection => "plan_selection",
            Self::BusinessProfile => "business_profile",
            Self::Review => "review",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [OnboardingStep; 5] = [
        OnboardingStep::CompanyProfile,
        OnboardingStep::PathSelection,
        OnboardingStep::PlanSelection,
        OnboardingStep::BusinessProfile,
        OnboardingStep::Review,
    ];

    #[test]
    fn index_roundtrip() {
        for step in ALL {
            assert_eq!(OnboardingStep::from_index(step.index()), Some(step));
        }
        assert_eq!(OnboardingStep::from_index(0), None);
        assert_eq!(OnboardingStep::from_index(6), None);
    }

    #[test]
    fn next_walks_all_steps() {
        let mut current = OnboardingStep::FIRST;
        for expected in &ALL[1..] {
            let next = current.next().unwrap();
            assert_eq!(next, *expected);
            current = next;
        }
        assert!(current.next().is_none());
    }

    #[test]
    fn previous_is_inverse_of_next() {
        for step in ALL {
            if let Some(next) = step.next() {
                assert_eq!(next.previous(), Some(step));
            }
        }
        assert!(OnboardingStep::FIRST.previous().is_none());
    }

    #[test]
    fn only_review_is_final() {
        for step in ALL {
            assert_eq!(step.is_final(), step == OnboardingStep::Review);
        }
    }

    #[test]
    fn display_matches_serde() {
        for step in ALL {
            let display = format!("{step}");
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(format!("\"{display}\""), json);
        }
    }

    #[test]
    fn indices_are_ordered() {
        for pair in ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert_eq!(pair[0].index() + 1, pair[1].index());
        }
    }
}
