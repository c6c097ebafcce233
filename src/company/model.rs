//! Company (tenant) models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Subscription state as reported by the payment provider.
///
/// The onboarding service only ever reads this; writes come from the
/// billing ingest path (webhook relay), never from the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// No subscription on record.
    None,
    Trialing,
    Active,
    PastDue,
    Canceled,
    Incomplete,
    Unpaid,
}

impl SubscriptionStatus {
    /// Whether this status clears the paywall. `Trialing` counts as paid.
    pub fn is_paid(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }
}

impl Default for SubscriptionStatus {
    fn default() -> Self {
        Self::None
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Incomplete => "incomplete",
            Self::Unpaid => "unpaid",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "trialing" => Ok(Self::Trialing),
            "active" => Ok(Self::Active),
            "past_due" => Ok(Self::PastDue),
            "canceled" => Ok(Self::Canceled),
            "incomplete" => Ok(Self::Incomplete),
            "unpaid" => Ok(Self::Unpaid),
            _ => Err(format!("Unknown subscription status: {}", s)),
        }
    }
}

/// Company (tenant) record.
///
/// The wizard reads `subscription_status` for the paywall gate and, at
/// `finish()`, writes the denormalized `name`/`website` display fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub website: Option<String>,
    pub subscription_status: SubscriptionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paid_set_is_active_and_trialing() {
        assert!(SubscriptionStatus::Active.is_paid());
        assert!(SubscriptionStatus::Trialing.is_paid());
        for status in [
            SubscriptionStatus::None,
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Canceled,
            SubscriptionStatus::Incomplete,
            SubscriptionStatus::Unpaid,
        ] {
            assert!(!status.is_paid(), "{status} must not clear the paywall");
        }
    }

    #[test]
    fn display_roundtrips_fromstr() {
        for status in [
            SubscriptionStatus::None,
            SubscriptionStatus::Trialing,
            SubscriptionStatus::Active,
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Canceled,
            SubscriptionStatus::Incomplete,
            SubscriptionStatus::Unpaid,
        ] {
            let parsed: SubscriptionStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("lifetime".parse::<SubscriptionStatus>().is_err());
    }

    #[test]
    fn display_matches_serde() {
        let json = serde_json::to_string(&SubscriptionStatus::PastDue).unwrap();
        assert_eq!(json, "\"past_due\"");
    }
}
