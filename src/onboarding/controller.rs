//! WizardController — the stateful orchestrator of the onboarding flow.
//!
//! Holds the mounted session: the last persisted row, the in-memory step
//! position, and the live form state. Every dependency is injected and every
//! operation is keyed off the mounted user — there is no ambient auth context.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::company::provisioner::CompanyProvisioner;
use crate::error::{OnboardingError, Result};
use crate::store::{CompanyStore, SessionStore, SessionWrite};

use super::gate::{self, GateDecision, GateRefusal};
use super::session::{OnboardingSession, SessionData, SessionStatus};
use super::step::OnboardingStep;

/// Injected collaborators for the wizard.
#[derive(Clone)]
pub struct WizardDeps {
    pub sessions: Arc<dyn SessionStore>,
    pub companies: Arc<dyn CompanyStore>,
}

/// Outcome of a `next()` call.
///
/// A refusal is the gate's normal "not yet" answer, not an error — the
/// caller surfaces the reason inline and the wizard stays put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Advanced(OnboardingStep),
    Refused(GateRefusal),
}

/// The onboarding wizard for one mounted user.
pub struct WizardController {
    deps: WizardDeps,
    /// Last persisted row.
    session: OnboardingSession,
    /// In-memory position. Trails the persisted step after `previous()`,
    /// which is a local affordance only.
    step: OnboardingStep,
    /// Live form state: persisted data replayed at mount, plus edits since.
    form: SessionData,
}

impl WizardController {
    /// Mount the wizard for a user: resolve the company (creating one if
    /// needed), load or create the session, and replay its accumulated data
    /// into the local form. Resumes at the last persisted step.
    pub async fn mount(
        deps: WizardDeps,
        provisioner: &CompanyProvisioner,
        user_id: &str,
    ) -> Result<Self> {
        let company_id = provisioner.ensure_company(user_id).await?;

        let session = match deps.sessions.load(user_id).await? {
            Some(existing) => {
                debug!(
                    user_id,
                    step = existing.current_step.index(),
                    "Resuming onboarding session"
                );
                existing
            }
            None => deps.sessions.create(user_id, company_id).await?,
        };

        let step = session.current_step;
        let form = session.session_data.clone();
        Ok(Self {
            deps,
            session,
            step,
            form,
        })
    }

    /// Current in-memory step.
    pub fn step(&self) -> OnboardingStep {
        self.step
    }

    /// Last persisted session row.
    pub fn session(&self) -> &OnboardingSession {
        &self.session
    }

    /// Live form state.
    pub fn form(&self) -> &SessionData {
        &self.form
    }

    /// Merge step-local form fields into the in-memory form state. Nothing
    /// is persisted until the next successful transition.
    pub fn update_form(&mut self, fields: SessionData) {
        self.form.merge(&fields);
    }

    /// Attempt to advance one step.
    ///
    /// Evaluates the gate for the target step — fetching a fresh subscription
    /// snapshot for the paywall transition — and persists the new step with
    /// the merged form data only when the gate allows. On refusal nothing is
    /// persisted and the reason comes back as a value.
    pub async fn next(&mut self) -> Result<StepOutcome> {
        if self.session.is_completed() {
            return Err(OnboardingError::AlreadyCompleted {
                id: self.session.id,
            }
            .into());
        }
        let target = self
            .step
            .next()
            .ok_or(OnboardingError::AtFinalStep)?;

        // The paywall cannot be decided from client-held state: payment
        // confirmation lands out-of-band, so the snapshot is re-read on
        // every attempt.
        let subscription = if target == OnboardingStep::BusinessProfile {
            Some(
                self.deps
                    .companies
                    .subscription_status(self.session.company_id)
                    .await?,
            )
        } else {
            None
        };

        match gate::evaluate(target, &self.form, subscription) {
            GateDecision::Refuse(refusal) => {
                debug!(
                    user_id = %self.session.user_id,
                    target = target.index(),
                    reason = refusal.code(),
                    "Step transition refused"
                );
                Ok(StepOutcome::Refused(refusal))
            }
            GateDecision::Allow => {
                let updated = self
                    .deps
                    .sessions
                    .apply(
                        self.session.id,
                        SessionWrite::Advance {
                            step: target,
                            data: self.form.clone(),
                        },
                    )
                    .await?;
                self.session = updated;
                self.step = target;
                Ok(StepOutcome::Advanced(target))
            }
        }
    }

    /// Step back one position, while above the first step.
    ///
    /// Local affordance only: the persisted step is untouched, and a remount
    /// resumes at the last persisted step — possibly ahead of where the user
    /// stepped back to. Inherited source behavior, kept pending product
    /// confirmation; do not "fix" silently.
    pub fn previous(&mut self) -> OnboardingStep {
        if let Some(prev) = self.step.previous() {
            self.step = prev;
        }
        self.step
    }

    /// Terminal transition. Only valid from the final step of a
    /// not-yet-completed session.
    ///
    /// After the session completes, the company display fields are
    /// denormalized from the form as a best-effort secondary write: failure
    /// is logged and swallowed, and the completion stands.
    pub async fn finish(&mut self) -> Result<()> {
        if self.session.is_completed() {
            return Err(OnboardingError::AlreadyCompleted {
                id: self.session.id,
            }
            .into());
        }
        if !self.step.is_final() {
            return Err(OnboardingError::NotAtFinalStep {
                step: self.step.index(),
            }
            .into());
        }

        let updated = self
            .deps
            .sessions
            .apply(
                self.session.id,
                SessionWrite::Complete {
                    data: self.form.clone(),
                },
            )
            .await?;
        self.session = updated;

        if let Some(name) = self.form.company_name() {
            if let Err(e) = self
                .deps
                .companies
                .update_profile(self.session.company_id, name, self.form.website())
                .await
            {
                warn!(
                    company_id = %self.session.company_id,
                    "Company profile denormalization failed (completion stands): {e}"
                );
            }
        }

        Ok(())
    }

    /// Status read model for the REST layer.
    pub fn status(&self) -> WizardStatus {
        WizardStatus {
            session_id: self.session.id,
            company_id: self.session.company_id,
            step: self.step.index(),
            persisted_step: self.session.current_step.index(),
            status: self.session.status,
            completed_at: self.session.completed_at,
            session_data: self.session.session_data.clone(),
        }
    }
}

/// Snapshot of the mounted wizard for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct WizardStatus {
    pub session_id: Uuid,
    pub company_id: Uuid,
    /// In-memory position (may trail `persisted_step` after back-navigation).
    pub step: u8,
    pub persisted_step: u8,
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub session_data: SessionData,
}
