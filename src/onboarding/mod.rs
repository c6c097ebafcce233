//! Onboarding system — the tenant-provisioning wizard.
//!
//! A client-driven, server-persisted wizard that provisions a company for an
//! authenticated user and walks them through profile capture, path choice,
//! the subscription paywall, and final submission. The controller owns the
//! step state machine; persistence and tenant access are injected.

pub mod controller;
pub mod gate;
pub mod payment;
pub mod routes;
pub mod session;
pub mod step;

pub use controller::{StepOutcome, WizardController, WizardDeps, WizardStatus};
pub use gate::{GateDecision, GateRefusal};
pub use payment::{PaymentCallbackHandler, PaymentOutcome, PaymentRedirect};
pub use session::{OnboardingPath, OnboardingSession, SessionData, SessionStatus};
pub use step::OnboardingStep;
