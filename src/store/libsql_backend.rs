//! libSQL backend — async implementation of the store traits.
//!
//! Supports local file and in-memory databases. A single connection is
//! reused for all operations; `libsql::Connection` is `Send + Sync` and safe
//! for concurrent async use.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::info;
use uuid::Uuid;

use crate::company::model::{Company, SubscriptionStatus};
use crate::error::DatabaseError;
use crate::onboarding::session::{OnboardingSession, SessionData, SessionStatus};
use crate::onboarding::step::OnboardingStep;
use crate::store::migrations;
use crate::store::traits::{CompanyStore, SessionStore, SessionWrite};

/// libSQL database backend.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(&backend.conn).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(&backend.conn).await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn get_session(&self, session_id: Uuid) -> Result<Option<OnboardingSession>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {SESSION_COLUMNS} FROM onboarding_sessions WHERE id = ?1"),
                params![session_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to query session: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read session row: {e}")))?
        {
            Some(row) => Ok(Some(row_to_session(&row)?)),
            None => Ok(None),
        }
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn parse_optional_datetime(s: &Option<String>) -> Option<DateTime<Utc>> {
    s.as_ref().map(|s| parse_datetime(s))
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

const SESSION_COLUMNS: &str =
    "id, user_id, company_id, current_step, status, session_data, created_at, updated_at, completed_at";

const COMPANY_COLUMNS: &str = "id, name, website, subscription_status, created_at, updated_at";

/// Map a libsql Row to an OnboardingSession.
///
/// Column order matches SESSION_COLUMNS.
fn row_to_session(row: &libsql::Row) -> Result<OnboardingSession, DatabaseError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("Bad session row: {e}")))?;
    let user_id: String = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("Bad session row: {e}")))?;
    let company_str: String = row
        .get(2)
        .map_err(|e| DatabaseError::Query(format!("Bad session row: {e}")))?;
    let step_idx: i64 = row
        .get(3)
        .map_err(|e| DatabaseError::Query(format!("Bad session row: {e}")))?;
    let status_str: String = row
        .get(4)
        .map_err(|e| DatabaseError::Query(format!("Bad session row: {e}")))?;
    let data_str: String = row
        .get(5)
        .map_err(|e| DatabaseError::Query(format!("Bad session row: {e}")))?;
    let created_str: String = row
        .get(6)
        .map_err(|e| DatabaseError::Query(format!("Bad session row: {e}")))?;
    let updated_str: String = row
        .get(7)
        .map_err(|e| DatabaseError::Query(format!("Bad session row: {e}")))?;
    let completed_str: Option<String> = row.get(8).ok();

    let session_data: SessionData = serde_json::from_str(&data_str)
        .map_err(|e| DatabaseError::Serialization(format!("Bad session_data JSON: {e}")))?;

    Ok(OnboardingSession {
        id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil()),
        user_id,
        company_id: Uuid::parse_str(&company_str).unwrap_or_else(|_| Uuid::nil()),
        current_step: OnboardingStep::from_index(step_idx as u8).unwrap_or(OnboardingStep::FIRST),
        status: status_str.parse().unwrap_or(SessionStatus::InProgress),
        session_data,
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
        completed_at: parse_optional_datetime(&completed_str),
    })
}

/// Map a libsql Row to a Company.
fn row_to_company(row: &libsql::Row) -> Result<Company, DatabaseError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("Bad company row: {e}")))?;
    let name: String = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("Bad company row: {e}")))?;
    let website: Option<String> = row.get(2).ok();
    let status_str: String = row
        .get(3)
        .map_err(|e| DatabaseError::Query(format!("Bad company row: {e}")))?;
    let created_str: String = row
        .get(4)
        .map_err(|e| DatabaseError::Query(format!("Bad company row: {e}")))?;
    let updated_str: String = row
        .get(5)
        .map_err(|e| DatabaseError::Query(format!("Bad company row: {e}")))?;

    Ok(Company {
        id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil()),
        name,
        website,
        subscription_status: status_str.parse().unwrap_or_default(),
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

// ── Trait implementations ───────────────────────────────────────────

#[async_trait]
impl SessionStore for LibSqlBackend {
    async fn load(&self, user_id: &str) -> Result<Option<OnboardingSession>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {SESSION_COLUMNS} FROM onboarding_sessions WHERE user_id = ?1"),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to query session: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read session row: {e}")))?
        {
            Some(row) => Ok(Some(row_to_session(&row)?)),
            None => Ok(None),
        }
    }

    async fn create(
        &self,
        user_id: &str,
        company_id: Uuid,
    ) -> Result<OnboardingSession, DatabaseError> {
        let now = Utc::now();
        let session = OnboardingSession {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            company_id,
            current_step: OnboardingStep::FIRST,
            status: SessionStatus::InProgress,
            session_data: SessionData::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        self.conn()
            .execute(
                "INSERT INTO onboarding_sessions
                    (id, user_id, company_id, current_step, status, session_data, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    session.id.to_string(),
                    user_id,
                    company_id.to_string(),
                    session.current_step.index() as i64,
                    session.status.to_string(),
                    "{}",
                    now.to_rfc3339(),
                    now.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Constraint(format!("Failed to create session: {e}")))?;

        Ok(session)
    }

    async fn apply(
        &self,
        session_id: Uuid,
        write: SessionWrite,
    ) -> Result<OnboardingSession, DatabaseError> {
        let existing = self
            .get_session(session_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "onboarding_session".to_string(),
                id: session_id.to_string(),
            })?;

        let now = Utc::now().to_rfc3339();
        match write {
            SessionWrite::Advance { step, data } => {
                if existing.is_completed() {
                    return Err(DatabaseError::Constraint(format!(
                        "Session {session_id} is completed; advance refused"
                    )));
                }
                let mut merged = existing.session_data;
                merged.merge(&data);
                let data_json = serde_json::to_string(&merged)
                    .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

                self.conn()
                    .execute(
                        "UPDATE onboarding_sessions
                            SET current_step = ?1, session_data = ?2, updated_at = ?3
                          WHERE id = ?4",
                        params![step.index() as i64, data_json, now, session_id.to_string()],
                    )
                    .await
                    .map_err(|e| DatabaseError::Query(format!("Failed to advance session: {e}")))?;
            }
            SessionWrite::Complete { data } => {
                let mut merged = existing.session_data;
                merged.merge(&data);
                let data_json = serde_json::to_string(&merged)
                    .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

                // COALESCE keeps completed_at from ever moving once set.
                self.conn()
                    .execute(
                        "UPDATE onboarding_sessions
                            SET session_data = ?1, status = 'completed',
                                completed_at = COALESCE(completed_at, ?2), updated_at = ?2
                          WHERE id = ?3",
                        params![data_json, now, session_id.to_string()],
                    )
                    .await
                    .map_err(|e| {
                        DatabaseError::Query(format!("Failed to complete session: {e}"))
                    })?;
            }
        }

        self.get_session(session_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "onboarding_session".to_string(),
                id: session_id.to_string(),
            })
    }
}

#[async_trait]
impl CompanyStore for LibSqlBackend {
    async fn find_for_user(&self, user_id: &str) -> Result<Option<Uuid>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT company_id FROM user_companies WHERE user_id = ?1",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to query user link: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read user link: {e}")))?
        {
            Some(row) => {
                let id_str: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("Bad link row: {e}")))?;
                Ok(Some(Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil())))
            }
            None => Ok(None),
        }
    }

    async fn create_and_link(
        &self,
        user_id: &str,
        initial_name: &str,
    ) -> Result<Uuid, DatabaseError> {
        let company_id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();

        // Company row and user link commit together or not at all: a crash
        // between the two would orphan a tenant or strand the user.
        let tx = self
            .conn()
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to begin transaction: {e}")))?;

        tx.execute(
            "INSERT INTO companies (id, name, subscription_status, created_at, updated_at)
             VALUES (?1, ?2, 'none', ?3, ?3)",
            params![company_id.to_string(), initial_name, now.clone()],
        )
        .await
        .map_err(|e| DatabaseError::Constraint(format!("Failed to create company: {e}")))?;

        tx.execute(
            "INSERT INTO user_companies (user_id, company_id) VALUES (?1, ?2)",
            params![user_id, company_id.to_string()],
        )
        .await
        .map_err(|e| DatabaseError::Constraint(format!("Failed to link user: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to commit provisioning: {e}")))?;

        Ok(company_id)
    }

    async fn get(&self, company_id: Uuid) -> Result<Option<Company>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE id = ?1"),
                params![company_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to query company: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read company row: {e}")))?
        {
            Some(row) => Ok(Some(row_to_company(&row)?)),
            None => Ok(None),
        }
    }

    async fn subscription_status(
        &self,
        company_id: Uuid,
    ) -> Result<SubscriptionStatus, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT subscription_status FROM companies WHERE id = ?1",
                params![company_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to query subscription: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read subscription: {e}")))?
        {
            Some(row) => {
                let status_str: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("Bad subscription row: {e}")))?;
                Ok(status_str.parse().unwrap_or_default())
            }
            None => Err(DatabaseError::NotFound {
                entity: "company".to_string(),
                id: company_id.to_string(),
            }),
        }
    }

    async fn set_subscription_status(
        &self,
        company_id: Uuid,
        status: SubscriptionStatus,
    ) -> Result<(), DatabaseError> {
        let affected = self
            .conn()
            .execute(
                "UPDATE companies SET subscription_status = ?1, updated_at = ?2 WHERE id = ?3",
                params![
                    status.to_string(),
                    Utc::now().to_rfc3339(),
                    company_id.to_string()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to update subscription: {e}")))?;

        if affected == 0 {
            return Err(DatabaseError::NotFound {
                entity: "company".to_string(),
                id: company_id.to_string(),
            });
        }
        Ok(())
    }

    async fn update_profile(
        &self,
        company_id: Uuid,
        name: &str,
        website: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let affected = self
            .conn()
            .execute(
                "UPDATE companies SET name = ?1, website = ?2, updated_at = ?3 WHERE id = ?4",
                params![
                    name,
                    opt_text(website),
                    Utc::now().to_rfc3339(),
                    company_id.to_string()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to update company profile: {e}")))?;

        if affected == 0 {
            return Err(DatabaseError::NotFound {
                entity: "company".to_string(),
                id: company_id.to_string(),
            });
        }
        Ok(())
    }
}
