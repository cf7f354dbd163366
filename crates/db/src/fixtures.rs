use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use tripdesk_core::domain::offer::CabinClass;
use tripdesk_core::domain::policy::{EnforcementMode, PolicyDocument, PolicyId};
use tripdesk_core::domain::traveler::{
    SeniorityTier, Traveler, TravelerId, TravelerRole,
};
use tripdesk_core::domain::OrgId;

use crate::connection::DbPool;
use crate::repositories::{
    PolicyRepository, RepositoryError, SqlPolicyRepository, SqlTravelerRepository,
    TravelerRepository,
};

pub const SEED_ORG_ID: &str = "org-seed";
pub const SEED_POLICY_ID: &str = "pol-seed-standard";

/// Canonical traveler seeds for local development and end-to-end checks: an
/// IC reporting to a manager, the manager, and a travel admin.
const SEED_TRAVELERS: &[SeedTraveler] = &[
    SeedTraveler {
        id: "trv-seed-rohan",
        full_name: "Rohan Iyer",
        email: "rohan@seed.tripdesk.in",
        tier: SeniorityTier::Ic,
        role: TravelerRole::Employee,
        approver_id: Some("trv-seed-asha"),
        description: "IC employee with a designated approver",
    },
    SeedTraveler {
        id: "trv-seed-asha",
        full_name: "Asha Rao",
        email: "asha@seed.tripdesk.in",
        tier: SeniorityTier::Manager,
        role: TravelerRole::Manager,
        approver_id: None,
        description: "Manager who approves for her reports",
    },
    SeedTraveler {
        id: "trv-seed-meera",
        full_name: "Meera Pillai",
        email: "meera@seed.tripdesk.in",
        tier: SeniorityTier::Director,
        role: TravelerRole::TravelAdmin,
        approver_id: None,
        description: "Travel admin with org-wide cancel rights",
    },
];

#[derive(Debug, Clone, Copy)]
struct SeedTraveler {
    id: &'static str,
    full_name: &'static str,
    email: &'static str,
    tier: SeniorityTier,
    role: TravelerRole,
    approver_id: Option<&'static str>,
    description: &'static str,
}

fn seed_instant() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn seed_policy() -> PolicyDocument {
    PolicyDocument {
        id: PolicyId(SEED_POLICY_ID.to_string()),
        org_id: OrgId(SEED_ORG_ID.to_string()),
        version: 1,
        active: true,
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
        per_trip_overrides: [(SeniorityTier::Director, Decimal::new(150_000_00, 2))]
            .into_iter()
            .collect(),
        monthly_ceiling: None,
        min_advance_days: 3,
        blocked_carriers: ["ZZ".to_string()].into_iter().collect(),
        max_stops: 1,
        refundable_only: false,
        auto_approve_under: Decimal::new(10_000_00, 2),
        require_approval_over: Decimal::new(25_000_00, 2),
        approval_expiry_hours: 72,
        created_at: seed_instant(),
    }
}

/// Deterministic seed dataset for the booking flows: three travelers and one
/// active soft-mode policy. Loading goes through the repositories, so the
/// seeds honor the same constraints as production writes and reloading is
/// idempotent.
pub struct SeedDataset;

impl SeedDataset {
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let travelers = SqlTravelerRepository::new(pool.clone());
        for seed in SEED_TRAVELERS {
            travelers
                .save(Traveler {
                    id: TravelerId(seed.id.to_string()),
                    org_id: OrgId(SEED_ORG_ID.to_string()),
                    full_name: seed.full_name.to_string(),
                    email: seed.email.to_string(),
                    tier: seed.tier,
                    role: seed.role,
                    approver_id: seed.approver_id.map(|id| TravelerId(id.to_string())),
                    active: true,
                    created_at: seed_instant(),
                })
                .await?;
        }

        let policies = SqlPolicyRepository::new(pool.clone());
        policies.save(seed_policy()).await?;

        let travelers_seeded = SEED_TRAVELERS
            .iter()
            .map(|seed| TravelerSeedInfo { id: seed.id, description: seed.description })
            .collect();
        Ok(SeedResult { travelers_seeded, policy_id: SEED_POLICY_ID })
    }

    /// Verify that the seeds exist and still match the contract above.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let travelers = SqlTravelerRepository::new(pool.clone());
        for seed in SEED_TRAVELERS {
            let found = travelers.find_by_id(&TravelerId(seed.id.to_string())).await?;
            let matches = found.as_ref().is_some_and(|t| {
                t.tier == seed.tier
                    && t.role == seed.role
                    && t.active
                    && t.approver_id.as_ref().map(|id| id.0.as_str()) == seed.approver_id
            });
            checks.push((seed.id, matches));
        }

        let elevated = travelers
            .find_active_with_elevated_role(&OrgId(SEED_ORG_ID.to_string()))
            .await?;
        checks.push(("elevated-approvers", elevated.len() == 2));

        let policies = SqlPolicyRepository::new(pool.clone());
        let active = policies.find_active(&OrgId(SEED_ORG_ID.to_string())).await?;
        let policy_matches = active.as_ref().is_some_and(|p| {
            p.id.0 == SEED_POLICY_ID
                && p.version == 1
                && p.mode == EnforcementMode::Soft
                && p.allows_cabin(SeniorityTier::Director, CabinClass::Business)
                && !p.allows_cabin(SeniorityTier::Ic, CabinClass::Business)
                && p.auto_approve_under == Decimal::new(10_000_00, 2)
        });
        checks.push(("active-policy", policy_matches));

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Remove the seeds from a test database. Fails if seeded travelers have
    /// accumulated bookings; those databases should be recreated instead.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM policy_document WHERE id = ?")
            .bind(SEED_POLICY_ID)
            .execute(pool)
            .await?;
        sqlx::query(
            "DELETE FROM traveler
             WHERE id IN ('trv-seed-rohan', 'trv-seed-asha', 'trv-seed-meera')",
        )
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub travelers_seeded: Vec<TravelerSeedInfo>,
    pub policy_id: &'static str,
}

#[derive(Debug)]
pub struct TravelerSeedInfo {
    pub id: &'static str,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use tripdesk_core::compliance::evaluate_policy;
    use tripdesk_core::domain::offer::{CabinClass, DataSource, Offer, OfferId};
    use tripdesk_core::domain::traveler::TravelerId;
    use tripdesk_core::domain::OrgId;

    use super::{SeedDataset, SEED_ORG_ID};
    use crate::repositories::{
        PolicyRepository, SqlPolicyRepository, SqlTravelerRepository, TravelerRepository,
    };
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn load_verify_reload_is_idempotent() {
        let pool = setup().await;

        let first = SeedDataset::load(&pool).await.expect("load seeds");
        assert_eq!(first.travelers_seeded.len(), 3);

        let verification = SeedDataset::verify(&pool).await.expect("verify seeds");
        assert!(verification.all_present, "failed checks: {:?}", verification.checks);

        SeedDataset::load(&pool).await.expect("reload seeds");
        let second = SeedDataset::verify(&pool).await.expect("re-verify seeds");
        assert!(second.all_present);
        assert_eq!(verification.checks, second.checks);
    }

    #[tokio::test]
    async fn seeded_policy_evaluates_like_the_contract_says() {
        let pool = setup().await;
        SeedDataset::load(&pool).await.expect("load seeds");

        let traveler = SqlTravelerRepository::new(pool.clone())
            .find_by_id(&TravelerId("trv-seed-rohan".to_string()))
            .await
            .expect("find traveler")
            .expect("seeded traveler exists");
        let policy = SqlPolicyRepository::new(pool.clone())
            .find_active(&OrgId(SEED_ORG_ID.to_string()))
            .await
            .expect("find policy")
            .expect("seeded policy exists");

        let now = Utc::now();
        let offer = Offer {
            id: OfferId("sbx:OF-SEED".to_string()),
            carrier: "6E".to_string(),
            origin: "BLR".to_string(),
            destination: "DEL".to_string(),
            departs_at: now + Duration::days(10),
            cabin: CabinClass::Economy,
            stops: 0,
            refundable: true,
            price: Decimal::new(6_000_00, 2),
            currency: "INR".to_string(),
            expires_at: now + Duration::minutes(30),
            data_source: DataSource::Sample,
        };

        let verdict = evaluate_policy(&offer, &traveler, &policy, now);
        assert!(verdict.compliant);
        assert!(!verdict.needs_approval, "a cheap economy fare auto-approves for the seeded IC");
    }

    #[tokio::test]
    async fn clean_removes_the_seeds() {
        let pool = setup().await;
        SeedDataset::load(&pool).await.expect("load seeds");
        SeedDataset::clean(&pool).await.expect("clean seeds");

        let verification = SeedDataset::verify(&pool).await.expect("verify after clean");
        assert!(!verification.all_present);
        assert!(verification.checks.iter().all(|(_, ok)| !ok));
    }
}
