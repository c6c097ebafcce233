//! Company provisioning — every onboarding user gets exactly one tenant.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::error::ProvisionError;
use crate::store::CompanyStore;

/// Resolves (or atomically creates) the company a user belongs to.
pub struct CompanyProvisioner {
    companies: Arc<dyn CompanyStore>,
    placeholder_name: String,
}

impl CompanyProvisioner {
    pub fn new(companies: Arc<dyn CompanyStore>, placeholder_name: impl Into<String>) -> Self {
        Self {
            companies,
            placeholder_name: placeholder_name.into(),
        }
    }

    /// Return the user's company, creating one if none is linked.
    ///
    /// Idempotent: an existing link is returned unchanged with no side
    /// effect. The create path inserts the company row and the user link in
    /// one transaction; its failure is terminal for this attempt — the
    /// caller re-enters onboarding, which is safe because this read path is
    /// a no-op once the link exists.
    pub async fn ensure_company(&self, user_id: &str) -> Result<Uuid, ProvisionError> {
        if let Some(existing) = self.companies.find_for_user(user_id).await? {
            return Ok(existing);
        }

        let company_id = self
            .companies
            .create_and_link(user_id, &self.placeholder_name)
            .await
            .map_err(|e| ProvisionError::CreateAndLinkFailed {
                user_id: user_id.to_string(),
                reason: e.to_string(),
            })?;

        info!(user_id, %company_id, "Provisioned company for user");
        Ok(company_id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::company::model::{Company, SubscriptionStatus};
    use crate::error::DatabaseError;

    /// In-memory company store counting create calls.
    #[derive(Default)]
    struct MemCompanies {
        link: Mutex<Option<(String, Uuid)>>,
        creates: AtomicUsize,
        fail_create: bool,
    }

    #[async_trait]
    impl CompanyStore for MemCompanies {
        async fn find_for_user(&self, user_id: &str) -> Result<Option<Uuid>, DatabaseError> {
            Ok(self
                .link
                .lock()
                .unwrap()
                .as_ref()
                .filter(|(u, _)| u == user_id)
                .map(|(_, c)| *c))
        }

        async fn create_and_link(
            &self,
            user_id: &str,
            _initial_name: &str,
        ) -> Result<Uuid, DatabaseError> {
            if self.fail_create {
                return Err(DatabaseError::Query("connection reset".into()));
            }
            self.creates.fetch_add(1, Ordering::SeqCst);
            let id = Uuid::new_v4();
            *self.link.lock().unwrap() = Some((user_id.to_string(), id));
            Ok(id)
        }

        async fn get(&self, _company_id: Uuid) -> Result<Option<Company>, DatabaseError> {
            Ok(None)
        }

        async fn subscription_status(
            &self,
            _company_id: Uuid,
        ) -> Result<SubscriptionStatus, DatabaseError> {
            Ok(SubscriptionStatus::None)
        }

        async fn set_subscription_status(
            &self,
            _company_id: Uuid,
            _status: SubscriptionStatus,
        ) -> Result<(), DatabaseError> {
            Ok(())
        }

        async fn update_profile(
            &self,
            _company_id: Uuid,
            _name: &str,
            _website: Option<&str>,
        ) -> Result<(), DatabaseError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn ensure_company_is_idempotent() {
        let store = Arc::new(MemCompanies::default());
        let provisioner = CompanyProvisioner::new(store.clone(), "New company");

        let first = provisioner.ensure_company("user-1").await.unwrap();
        let second = provisioner.ensure_company("user-1").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn create_failure_is_terminal() {
        let store = Arc::new(MemCompanies {
            fail_create: true,
            ..Default::default()
        });
        let provisioner = CompanyProvisioner::new(store.clone(), "New company");

        let err = provisioner.ensure_company("user-1").await.unwrap_err();
        assert!(matches!(err, ProvisionError::CreateAndLinkFailed { .. }));
        assert_eq!(store.creates.load(Ordering::SeqCst), 0);
    }
}
