//! Store traits — async persistence interfaces for sessions and companies.

use async_trait::async_trait;
use uuid::Uuid;

use crate::company::model::{Company, SubscriptionStatus};
use crate::error::DatabaseError;
use crate::onboarding::session::{OnboardingSession, SessionData};
use crate::onboarding::step::OnboardingStep;

/// A write against an existing onboarding session.
///
/// The tagged-variant contract is deliberate: only `Complete` can set the
/// terminal flag, and no variant can unset it. Stores refuse `Advance`
/// against a completed row, so the one-way completion invariant holds even
/// against a misbehaving caller.
#[derive(Debug, Clone)]
pub enum SessionWrite {
    /// Move the persisted step and merge form data.
    Advance {
        step: OnboardingStep,
        data: SessionData,
    },
    /// Terminal transition: merge final data, set `completed` status and
    /// stamp `completed_at`. The step is left where it is.
    Complete { data: SessionData },
}

/// Persistence for onboarding sessions — one row per user.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the at-most-one session for a user.
    async fn load(&self, user_id: &str) -> Result<Option<OnboardingSession>, DatabaseError>;

    /// Create a fresh session at the first step, `in_progress`, with empty
    /// session data. Fails on the unique user constraint if one exists.
    async fn create(
        &self,
        user_id: &str,
        company_id: Uuid,
    ) -> Result<OnboardingSession, DatabaseError>;

    /// Apply a write to an existing session and return the updated row.
    ///
    /// `session_data` merges as a shallow union (incoming keys win, absent
    /// keys are preserved); `updated_at` is stamped on every write.
    async fn apply(
        &self,
        session_id: Uuid,
        write: SessionWrite,
    ) -> Result<OnboardingSession, DatabaseError>;
}

/// Persistence for companies and the user→company link.
#[async_trait]
pub trait CompanyStore: Send + Sync {
    /// Company linked to a user, if any.
    async fn find_for_user(&self, user_id: &str) -> Result<Option<Uuid>, DatabaseError>;

    /// Create a company and link it to the user in a single transaction.
    ///
    /// Atomicity is the contract: there is never a moment where the company
    /// exists unlinked or the link points at nothing.
    async fn create_and_link(
        &self,
        user_id: &str,
        initial_name: &str,
    ) -> Result<Uuid, DatabaseError>;

    /// Read a company row.
    async fn get(&self, company_id: Uuid) -> Result<Option<Company>, DatabaseError>;

    /// Fresh subscription snapshot for the paywall gate. Never cached.
    async fn subscription_status(
        &self,
        company_id: Uuid,
    ) -> Result<SubscriptionStatus, DatabaseError>;

    /// Record a provider-reported subscription status (billing ingest path).
    async fn set_subscription_status(
        &self,
        company_id: Uuid,
        status: SubscriptionStatus,
    ) -> Result<(), DatabaseError>;

    /// Denormalized display fields written at the end of onboarding.
    async fn update_profile(
        &self,
        company_id: Uuid,
        name: &str,
        website: Option<&str>,
    ) -> Result<(), DatabaseError>;
}
