//! Onboarding session and form-data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::step::OnboardingStep;

/// Lifecycle status of an onboarding session.
///
/// This controller never persists a `NotStarted` session — rows are created
/// directly as `InProgress`. The variant exists because the column can hold
/// it (seeded rows, older writers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("Unknown session status: {}", s)),
        }
    }
}

/// The two mutually exclusive onboarding paths a user can choose at the
/// path-selection step. The choice changes which business-profile form the
/// front-end shows at step 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingPath {
    SelfService,
    Guided,
}

impl std::fmt::Display for OnboardingPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelfService => write!(f, "self_service"),
            Self::Guided => write!(f, "guided"),
        }
    }
}

impl std::str::FromStr for OnboardingPath {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "self_service" => Ok(Self::SelfService),
            "guided" => Ok(Self::Guided),
            _ => Err(format!("Unknown onboarding path: {}", s)),
        }
    }
}

/// Well-known `SessionData` keys the gate and controller read.
pub mod keys {
    pub const COMPANY_NAME: &str = "company_name";
    pub const WEBSITE: &str = "website";
    pub const ONBOARDING_PATH: &str = "onboarding_path";
    pub const INDUSTRY: &str = "industry";
    pub const DESCRIPTION: &str = "description";
}

/// Accumulated wizard form state, merged shallowly across steps.
///
/// An open key→value mapping: steps contribute their fields, later writes
/// override earlier ones key-by-key, and keys absent from a write are
/// preserved. Stored as a JSON object in the session row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionData(serde_json::Map<String, serde_json::Value>);

impl SessionData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shallow union-merge: keys from `incoming` override, everything else
    /// is preserved.
    pub fn merge(&mut self, incoming: &SessionData) {
        for (key, value) in &incoming.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn insert(&mut self, key: &str, value: serde_json::Value) {
        self.0.insert(key.to_string(), value);
    }

    /// Convenience for string fields.
    pub fn insert_str(&mut self, key: &str, value: &str) {
        self.insert(key, serde_json::Value::String(value.to_string()));
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn company_name(&self) -> Option<&str> {
        self.get_str(keys::COMPANY_NAME)
    }

    pub fn website(&self) -> Option<&str> {
        self.get_str(keys::WEBSITE)
    }

    /// The chosen onboarding path, if present and recognized.
    pub fn onboarding_path(&self) -> Option<OnboardingPath> {
        self.get_str(keys::ONBOARDING_PATH)?.parse().ok()
    }
}

/// Persisted onboarding session row — at most one per user.
///
/// `user_id` and `company_id` are immutable once set. The company is resolved
/// before the session is created (mount order: provision, then load-or-create),
/// so every session carries its tenant from step 1 onward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingSession {
    pub id: Uuid,
    pub user_id: String,
    pub company_id: Uuid,
    /// The step the user was last persisted at. Backward navigation is a
    /// local affordance and never moves this.
    pub current_step: OnboardingStep,
    pub status: SessionStatus,
    pub session_data: SessionData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set exactly once, at the terminal transition.
    pub completed_at: Option<DateTime<Utc>>,
}

impl OnboardingSession {
    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_is_shallow_union() {
        let mut data = SessionData::new();
        data.insert("a", serde_json::json!(1));
        data.insert("b", serde_json::json!(2));

        let mut incoming = SessionData::new();
        incoming.insert("b", serde_json::json!(3));
        incoming.insert("c", serde_json::json!(4));

        data.merge(&incoming);

        assert_eq!(data.get("a"), Some(&serde_json::json!(1)));
        assert_eq!(data.get("b"), Some(&serde_json::json!(3)));
        assert_eq!(data.get("c"), Some(&serde_json::json!(4)));
        assert_eq!(data.len(), 3);
    }

    #[test]
    fn merge_with_empty_preserves_everything() {
        let mut data = SessionData::new();
        data.insert_str(keys::COMPANY_NAME, "Acme");
        data.merge(&SessionData::new());
        assert_eq!(data.company_name(), Some("Acme"));
    }

    #[test]
    fn typed_accessors() {
        let mut data = SessionData::new();
        data.insert_str(keys::COMPANY_NAME, "Acme");
        data.insert_str(keys::WEBSITE, "acme.com");
        data.insert_str(keys::ONBOARDING_PATH, "self_service");

        assert_eq!(data.company_name(), Some("Acme"));
        assert_eq!(data.website(), Some("acme.com"));
        assert_eq!(data.onboarding_path(), Some(OnboardingPath::SelfService));
    }

    #[test]
    fn unrecognized_path_is_none() {
        let mut data = SessionData::new();
        data.insert_str(keys::ONBOARDING_PATH, "enterprise");
        assert_eq!(data.onboarding_path(), None);

        // Non-string values don't parse either
        data.insert(keys::ONBOARDING_PATH, serde_json::json!(42));
        assert_eq!(data.onboarding_path(), None);
    }

    #[test]
    fn session_data_serde_is_transparent() {
        let mut data = SessionData::new();
        data.insert_str("company_name", "Acme");
        data.insert("extra", serde_json::json!({"nested": true}));

        let json = serde_json::to_string(&data).unwrap();
        let parsed: SessionData = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, data);

        // Transparent: serializes as a bare object, not a wrapper
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.is_object());
        assert_eq!(value["company_name"], "Acme");
    }

    #[test]
    fn status_display_roundtrips_fromstr() {
        for status in [
            SessionStatus::NotStarted,
            SessionStatus::InProgress,
            SessionStatus::Completed,
        ] {
            let parsed: SessionStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("done".parse::<SessionStatus>().is_err());
    }

    #[test]
    fn path_display_roundtrips_fromstr() {
        for path in [OnboardingPath::SelfService, OnboardingPath::Guided] {
            let parsed: OnboardingPath = path.to_string().parse().unwrap();
            assert_eq!(parsed, path);
        }
        assert!("white_glove".parse::<OnboardingPath>().is_err());
    }
}
