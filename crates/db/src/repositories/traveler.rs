use chrono::{DateTime, Utc};
use sqlx::Row;

use tripdesk_core::domain::traveler::{SeniorityTier, Traveler, TravelerId, TravelerRole};
use tripdesk_core::domain::OrgId;

use super::{RepositoryError, TravelerRepository};
use crate::DbPool;

pub struct SqlTravelerRepository {
    pool: DbPool,
}

impl SqlTravelerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

// Unknown values fall back to the least-privileged tier and role.
fn parse_tier(s: &str) -> SeniorityTier {
    match s {
        "manager" => SeniorityTier::Manager,
        "director" => SeniorityTier::Director,
        "executive" => SeniorityTier::Executive,
        _ => SeniorityTier::Ic,
    }
}

fn parse_role(s: &str) -> TravelerRole {
    match s {
        "manager" => TravelerRole::Manager,
        "travel_admin" => TravelerRole::TravelAdmin,
        _ => TravelerRole::Employee,
    }
}

fn role_as_str(role: &TravelerRole) -> &'static str {
    match role {
        TravelerRole::Employee => "employee",
        TravelerRole::Manager => "manager",
        TravelerRole::TravelAdmin => "travel_admin",
    }
}

fn row_to_traveler(row: &sqlx::sqlite::SqliteRow) -> Result<Traveler, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let org_id: String =
        row.try_get("org_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let full_name: String =
        row.try_get("full_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let email: String =
        row.try_get("email").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let tier_str: String =
        row.try_get("tier").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let role_str: String =
        row.try_get("role").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approver_id: Option<String> =
        row.try_get("approver_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let active: bool =
        row.try_get("active").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(Traveler {
        id: TravelerId(id),
        org_id: OrgId(org_id),
        full_name,
        email,
        tier: parse_tier(&tier_str),
        role: parse_role(&role_str),
        approver_id: approver_id.map(TravelerId),
        active,
        created_at,
    })
}

#[async_trait::async_trait]
impl TravelerRepository for SqlTravelerRepository {
    async fn find_by_id(&self, id: &TravelerId) -> Result<Option<Traveler>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, org_id, full_name, email, tier, role, approver_id, active, created_at
             FROM traveler WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_traveler(r)?)),
            None => Ok(None),
        }
    }

    async fn find_active_with_elevated_role(
        &self,
        org_id: &OrgId,
    ) -> Result<Vec<Traveler>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, org_id, full_name, email, tier, role, approver_id, active, created_at
             FROM traveler
             WHERE org_id = ? AND active = 1 AND role IN ('manager', 'travel_admin')
             ORDER BY full_name ASC",
        )
        .bind(&org_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_traveler).collect::<Result<Vec<_>, _>>()
    }

    async fn save(&self, traveler: Traveler) -> Result<(), RepositoryError> {
        let approver_id = traveler.approver_id.as_ref().map(|id| id.0.clone());

        sqlx::query(
            "INSERT INTO traveler (id, org_id, full_name, email, tier, role, approver_id,
                                   active, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 org_id = excluded.org_id,
                 full_name = excluded.full_name,
                 email = excluded.email,
                 tier = excluded.tier,
                 role = excluded.role,
                 approver_id = excluded.approver_id,
                 active = excluded.active",
        )
        .bind(&traveler.id.0)
        .bind(&traveler.org_id.0)
        .bind(&traveler.full_name)
        .bind(&traveler.email)
        .bind(traveler.tier.as_str())
        .bind(role_as_str(&traveler.role))
        .bind(&approver_id)
        .bind(traveler.active)
        .bind(traveler.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use tripdesk_core::domain::traveler::{SeniorityTier, Traveler, TravelerId, TravelerRole};
    use tripdesk_core::domain::OrgId;

    use super::SqlTravelerRepository;
    use crate::repositories::TravelerRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn sample_traveler(id: &str, name: &str, role: TravelerRole) -> Traveler {
        Traveler {
            id: TravelerId(id.to_string()),
            org_id: OrgId("org-1".to_string()),
            full_name: name.to_string(),
            email: format!("{id}@example.in"),
            tier: SeniorityTier::Manager,
            role,
            approver_id: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn save_and_find_round_trips_profile_fields() {
        let pool = setup().await;
        let repo = SqlTravelerRepository::new(pool);

        let mut traveler = sample_traveler("trv-1", "Asha Rao", TravelerRole::Employee);
        traveler.tier = SeniorityTier::Director;
        traveler.approver_id = Some(TravelerId("trv-boss".to_string()));
        repo.save(traveler).await.expect("save");

        let found = repo
            .find_by_id(&TravelerId("trv-1".to_string()))
            .await
            .expect("find")
            .expect("should exist");

        assert_eq!(found.full_name, "Asha Rao");
        assert_eq!(found.tier, SeniorityTier::Director);
        assert_eq!(found.role, TravelerRole::Employee);
        assert_eq!(found.approver_id, Some(TravelerId("trv-boss".to_string())));
        assert!(found.active);
    }

    #[tokio::test]
    async fn elevated_role_lookup_filters_inactive_and_plain_employees() {
        let pool = setup().await;
        let repo = SqlTravelerRepository::new(pool);

        repo.save(sample_traveler("trv-emp", "Dev Anand", TravelerRole::Employee))
            .await
            .expect("save employee");
        repo.save(sample_traveler("trv-mgr", "Asha Rao", TravelerRole::Manager))
            .await
            .expect("save manager");
        repo.save(sample_traveler("trv-adm", "Meera Pillai", TravelerRole::TravelAdmin))
            .await
            .expect("save admin");

        let mut gone = sample_traveler("trv-gone", "Left Company", TravelerRole::Manager);
        gone.active = false;
        repo.save(gone).await.expect("save inactive manager");

        let mut other = sample_traveler("trv-other", "Other Org", TravelerRole::Manager);
        other.org_id = OrgId("org-2".to_string());
        repo.save(other).await.expect("save other org");

        let elevated = repo
            .find_active_with_elevated_role(&OrgId("org-1".to_string()))
            .await
            .expect("lookup");
        let ids: Vec<&str> = elevated.iter().map(|t| t.id.0.as_str()).collect();
        assert_eq!(ids, vec!["trv-mgr", "trv-adm"]);
    }

    #[tokio::test]
    async fn save_upserts_on_conflict() {
        let pool = setup().await;
        let repo = SqlTravelerRepository::new(pool);

        let traveler = sample_traveler("trv-1", "Asha Rao", TravelerRole::Employee);
        repo.save(traveler.clone()).await.expect("save");

        let mut promoted = traveler;
        promoted.role = TravelerRole::Manager;
        promoted.tier = SeniorityTier::Director;
        repo.save(promoted).await.expect("upsert");

        let found = repo
            .find_by_id(&TravelerId("trv-1".to_string()))
            .await
            .expect("find")
            .expect("should exist");
        assert_eq!(found.role, TravelerRole::Manager);
        assert_eq!(found.tier, SeniorityTier::Director);
    }
}
