use sqlx::Row;

use tripdesk_core::domain::policy::{PolicyDocument, PolicyId};
use tripdesk_core::domain::OrgId;

use super::{PolicyRepository, RepositoryError};
use crate::DbPool;

/// Policies are stored as their full JSON document; org_id, version and
/// active are mirrored into real columns for lookups and the single-active
/// partial index.
pub struct SqlPolicyRepository {
    pool: DbPool,
}

impl SqlPolicyRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_policy(row: &sqlx::sqlite::SqliteRow) -> Result<PolicyDocument, RepositoryError> {
    let document: String =
        row.try_get("document").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    serde_json::from_str(&document)
        .map_err(|e| RepositoryError::Decode(format!("column document: {e}")))
}

#[async_trait::async_trait]
impl PolicyRepository for SqlPolicyRepository {
    async fn find_by_id(&self, id: &PolicyId) -> Result<Option<PolicyDocument>, RepositoryError> {
        let row = sqlx::query("SELECT document FROM policy_document WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_policy(r)?)),
            None => Ok(None),
        }
    }

    async fn find_active(
        &self,
        org_id: &OrgId,
    ) -> Result<Option<PolicyDocument>, RepositoryError> {
        let row =
            sqlx::query("SELECT document FROM policy_document WHERE org_id = ? AND active = 1")
                .bind(&org_id.0)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_policy(r)?)),
            None => Ok(None),
        }
    }

    /// Saving a second active version for the same org trips the partial
    /// unique index; deactivate the current version first.
    async fn save(&self, policy: PolicyDocument) -> Result<(), RepositoryError> {
        let document = serde_json::to_string(&policy)
            .map_err(|e| RepositoryError::Decode(format!("column document: {e}")))?;

        sqlx::query(
            "INSERT INTO policy_document (id, org_id, version, active, document, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 version = excluded.version,
                 active = excluded.active,
                 document = excluded.document",
        )
        .bind(&policy.id.0)
        .bind(&policy.org_id.0)
        .bind(policy.version as i64)
        .bind(policy.active)
        .bind(&document)
        .bind(policy.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use tripdesk_core::domain::offer::CabinClass;
    use tripdesk_core::domain::policy::{EnforcementMode, PolicyDocument, PolicyId};
    use tripdesk_core::domain::traveler::SeniorityTier;
    use tripdesk_core::domain::OrgId;

    use super::SqlPolicyRepository;
    use crate::repositories::PolicyRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn sample_policy(id: &str, org_id: &str, version: u32, active: bool) -> PolicyDocument {
        PolicyDocument {
            id: PolicyId(id.to_string()),
            org_id: OrgId(org_id.to_string()),
            version,
            active,
            mode: EnforcementMode::Soft,
            default_cabin: CabinClass::Economy,
            cabin_overrides: [(
                SeniorityTier::Director,
                vec![CabinClass::Economy, CabinClass::PremiumEconomy, CabinClass::Business],
            )]
            .into_iter()
            .collect(),
            domestic_fare_ceiling: Decimal::new(15_000_00, 2),
            international_fare_ceiling: Decimal::new(90_000_00, 2),
            per_trip_ceiling: Decimal::new(50_000_00, 2),
            per_trip_overrides: BTreeMap::new(),
            monthly_ceiling: None,
            min_advance_days: 3,
            blocked_carriers: ["ZZ".to_string()].into_iter().collect(),
            max_stops: 1,
            refundable_only: false,
            auto_approve_under: Decimal::new(10_000_00, 2),
            require_approval_over: Decimal::new(25_000_00, 2),
            approval_expiry_hours: 72,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn save_and_find_by_id_round_trips_the_document() {
        let pool = setup().await;
        let repo = SqlPolicyRepository::new(pool);

        let policy = sample_policy("pol-001", "org-1", 1, true);
        repo.save(policy.clone()).await.expect("save");

        let found = repo
            .find_by_id(&PolicyId("pol-001".to_string()))
            .await
            .expect("find")
            .expect("should exist");

        assert_eq!(found.version, 1);
        assert_eq!(found.org_id.0, "org-1");
        assert!(found.allows_cabin(SeniorityTier::Director, CabinClass::Business));
        assert!(!found.allows_cabin(SeniorityTier::Ic, CabinClass::Business));
    }

    #[tokio::test]
    async fn find_active_ignores_inactive_versions() {
        let pool = setup().await;
        let repo = SqlPolicyRepository::new(pool);

        repo.save(sample_policy("pol-old", "org-1", 1, false)).await.expect("save inactive");
        repo.save(sample_policy("pol-live", "org-1", 2, true)).await.expect("save active");
        repo.save(sample_policy("pol-other", "org-2", 1, true)).await.expect("save other org");

        let found = repo
            .find_active(&OrgId("org-1".to_string()))
            .await
            .expect("find active")
            .expect("active policy exists");
        assert_eq!(found.id.0, "pol-live");
        assert_eq!(found.version, 2);
    }

    #[tokio::test]
    async fn activating_a_new_version_requires_deactivating_the_old_one() {
        let pool = setup().await;
        let repo = SqlPolicyRepository::new(pool);

        repo.save(sample_policy("pol-v1", "org-1", 1, true)).await.expect("save v1");

        let clash = repo.save(sample_policy("pol-v2", "org-1", 2, true)).await;
        assert!(clash.is_err(), "two active versions for one org must be rejected");

        repo.save(sample_policy("pol-v1", "org-1", 1, false)).await.expect("deactivate v1");
        repo.save(sample_policy("pol-v2", "org-1", 2, true)).await.expect("activate v2");

        let found = repo
            .find_active(&OrgId("org-1".to_string()))
            .await
            .expect("find active")
            .expect("active policy exists");
        assert_eq!(found.version, 2);
    }
}
