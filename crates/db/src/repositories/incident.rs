use chrono::{DateTime, Utc};
use sqlx::Row;

use tripdesk_core::domain::booking::BookingId;
use tripdesk_core::domain::incident::{Incident, IncidentId, IncidentKind};

use super::{IncidentRepository, RepositoryError};
use crate::DbPool;

pub struct SqlIncidentRepository {
    pool: DbPool,
}

impl SqlIncidentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_kind(s: &str) -> Result<IncidentKind, RepositoryError> {
    match s {
        "payment_booking_mismatch" => Ok(IncidentKind::PaymentBookingMismatch),
        "refund_failed" => Ok(IncidentKind::RefundFailed),
        "db_save_failed" => Ok(IncidentKind::DbSaveFailed),
        "manual_confirmation_issued" => Ok(IncidentKind::ManualConfirmationIssued),
        other => Err(RepositoryError::Decode(format!("unknown incident kind `{other}`"))),
    }
}

fn row_to_incident(row: &sqlx::sqlite::SqliteRow) -> Result<Incident, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let booking_id: Option<String> =
        row.try_get("booking_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let kind_str: String =
        row.try_get("kind").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let detail: String =
        row.try_get("detail").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let context_json: String =
        row.try_get("context").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let context = serde_json::from_str(&context_json)
        .map_err(|e| RepositoryError::Decode(format!("column context: {e}")))?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(Incident {
        id: IncidentId(id),
        booking_id: booking_id.map(BookingId),
        kind: parse_kind(&kind_str)?,
        detail,
        context,
        created_at,
    })
}

#[async_trait::async_trait]
impl IncidentRepository for SqlIncidentRepository {
    /// Plain insert. Incident rows are never updated or deleted.
    async fn append(&self, incident: Incident) -> Result<(), RepositoryError> {
        let context = serde_json::to_string(&incident.context)
            .map_err(|e| RepositoryError::Decode(format!("column context: {e}")))?;
        let booking_id = incident.booking_id.as_ref().map(|id| id.0.clone());

        sqlx::query(
            "INSERT INTO incident (id, booking_id, kind, detail, context, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&incident.id.0)
        .bind(&booking_id)
        .bind(incident.kind.as_str())
        .bind(&incident.detail)
        .bind(&context)
        .bind(incident.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_booking(
        &self,
        booking_id: &BookingId,
    ) -> Result<Vec<Incident>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, booking_id, kind, detail, context, created_at
             FROM incident WHERE booking_id = ? ORDER BY created_at ASC",
        )
        .bind(&booking_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_incident).collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use serde_json::json;

    use tripdesk_core::compliance::PolicyVerdict;
    use tripdesk_core::domain::booking::{Booking, BookingId};
    use tripdesk_core::domain::incident::{Incident, IncidentKind};
    use tripdesk_core::domain::offer::{CabinClass, DataSource, Offer, OfferId};
    use tripdesk_core::domain::policy::EnforcementMode;
    use tripdesk_core::domain::traveler::{SeniorityTier, Traveler, TravelerId, TravelerRole};
    use tripdesk_core::domain::OrgId;

    use super::SqlIncidentRepository;
    use crate::repositories::{
        BookingRepository, IncidentRepository, SqlBookingRepository, SqlTravelerRepository,
        TravelerRepository,
    };
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    /// Insert parent traveler and booking rows so FK constraints are satisfied.
    async fn insert_booking(pool: &sqlx::SqlitePool, booking_id: &str) {
        let now = Utc::now();

        SqlTravelerRepository::new(pool.clone())
            .save(Traveler {
                id: TravelerId("trv-1".to_string()),
                org_id: OrgId("org-1".to_string()),
                full_name: "Asha Rao".to_string(),
                email: "asha@example.in".to_string(),
                tier: SeniorityTier::Ic,
                role: TravelerRole::Employee,
                approver_id: None,
                active: true,
                created_at: now,
            })
            .await
            .expect("insert parent traveler");

        let offer = Offer {
            id: OfferId("ah:OF-3".to_string()),
            carrier: "6E".to_string(),
            origin: "BLR".to_string(),
            destination: "MAA".to_string(),
            departs_at: now + Duration::days(6),
            cabin: CabinClass::Economy,
            stops: 0,
            refundable: true,
            price: Decimal::new(4_900_00, 2),
            currency: "INR".to_string(),
            expires_at: now + Duration::minutes(20),
            data_source: DataSource::Api,
        };
        let verdict = PolicyVerdict {
            compliant: true,
            violations: Vec::new(),
            needs_approval: false,
            mode: EnforcementMode::Soft,
            policy_version: 1,
            evaluated_at: now,
        };
        let mut booking = Booking::draft(
            OrgId("org-1".to_string()),
            TravelerId("trv-1".to_string()),
            offer,
            verdict,
            Vec::new(),
            None,
            now,
        );
        booking.id = BookingId(booking_id.to_string());

        SqlBookingRepository::new(pool.clone()).save(booking).await.expect("insert parent booking");
    }

    #[tokio::test]
    async fn append_and_list_preserves_order_and_context() {
        let pool = setup().await;
        insert_booking(&pool, "bkg-1").await;

        let repo = SqlIncidentRepository::new(pool);
        let booking_id = BookingId("bkg-1".to_string());
        let base = Utc::now();

        repo.append(Incident::new(
            IncidentKind::PaymentBookingMismatch,
            Some(booking_id.clone()),
            "payment captured but supplier order failed",
            json!({"payment_id": "pay_N1", "supplier_status": 502}),
            base,
        ))
        .await
        .expect("append first");

        repo.append(Incident::new(
            IncidentKind::RefundFailed,
            Some(booking_id.clone()),
            "compensating refund was rejected",
            json!({"payment_id": "pay_N1"}),
            base + Duration::seconds(5),
        ))
        .await
        .expect("append second");

        let incidents = repo.list_for_booking(&booking_id).await.expect("list");
        assert_eq!(incidents.len(), 2);
        assert_eq!(incidents[0].kind, IncidentKind::PaymentBookingMismatch);
        assert_eq!(incidents[1].kind, IncidentKind::RefundFailed);
        assert_eq!(incidents[0].context["supplier_status"], json!(502));
    }

    #[tokio::test]
    async fn incidents_without_a_booking_are_allowed_but_not_listed_per_booking() {
        let pool = setup().await;
        insert_booking(&pool, "bkg-1").await;

        let repo = SqlIncidentRepository::new(pool);

        repo.append(Incident::new(
            IncidentKind::DbSaveFailed,
            None,
            "booking row could not be written",
            json!({"confirmation_code": "Q7WXM2"}),
            Utc::now(),
        ))
        .await
        .expect("append global incident");

        let incidents =
            repo.list_for_booking(&BookingId("bkg-1".to_string())).await.expect("list");
        assert!(incidents.is_empty());
    }
}
