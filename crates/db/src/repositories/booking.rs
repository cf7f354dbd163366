use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use tripdesk_core::compliance::PolicyVerdict;
use tripdesk_core::domain::booking::{Booking, BookingId, BookingStatus, PaymentRef};
use tripdesk_core::domain::offer::Offer;
use tripdesk_core::domain::traveler::{Passenger, TravelerId};
use tripdesk_core::domain::OrgId;

use super::{BookingRepository, RepositoryError};
use crate::DbPool;

pub struct SqlBookingRepository {
    pool: DbPool,
}

impl SqlBookingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Strict on purpose. A status column this store did not write signals a
/// corrupted row, and decoding it as anything else could revive a terminal
/// booking.
fn parse_status(s: &str) -> Result<BookingStatus, RepositoryError> {
    match s {
        "draft" => Ok(BookingStatus::Draft),
        "pending_approval" => Ok(BookingStatus::PendingApproval),
        "auto_approved" => Ok(BookingStatus::AutoApproved),
        "booked" => Ok(BookingStatus::Booked),
        "pending" => Ok(BookingStatus::Pending),
        "rejected" => Ok(BookingStatus::Rejected),
        "cancelled" => Ok(BookingStatus::Cancelled),
        other => Err(RepositoryError::Decode(format!("unknown booking status `{other}`"))),
    }
}

fn parse_decimal(column: &str, s: &str) -> Result<Decimal, RepositoryError> {
    s.parse::<Decimal>()
        .map_err(|e| RepositoryError::Decode(format!("column {column}: {e}")))
}

fn row_to_booking(row: &sqlx::sqlite::SqliteRow) -> Result<Booking, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let org_id: String =
        row.try_get("org_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let traveler_id: String =
        row.try_get("traveler_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let offer_json: String =
        row.try_get("offer").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let verdict_json: String =
        row.try_get("verdict").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let passengers_json: String =
        row.try_get("passengers").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let amount_str: String =
        row.try_get("amount").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let currency: String =
        row.try_get("currency").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let supplier_order_ref: Option<String> =
        row.try_get("supplier_order_ref").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let confirmation_code: Option<String> =
        row.try_get("confirmation_code").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let manually_confirmed: bool =
        row.try_get("manually_confirmed").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let needs_reconciliation: bool =
        row.try_get("needs_reconciliation").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let payment_order_id: Option<String> =
        row.try_get("payment_order_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let payment_payment_id: Option<String> =
        row.try_get("payment_payment_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let offer: Offer = serde_json::from_str(&offer_json)
        .map_err(|e| RepositoryError::Decode(format!("column offer: {e}")))?;
    let verdict: PolicyVerdict = serde_json::from_str(&verdict_json)
        .map_err(|e| RepositoryError::Decode(format!("column verdict: {e}")))?;
    let passengers: Vec<Passenger> = serde_json::from_str(&passengers_json)
        .map_err(|e| RepositoryError::Decode(format!("column passengers: {e}")))?;

    let payment = match (payment_order_id, payment_payment_id) {
        (Some(order_id), Some(payment_id)) => Some(PaymentRef { order_id, payment_id }),
        _ => None,
    };

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(Booking {
        id: BookingId(id),
        org_id: OrgId(org_id),
        traveler_id: TravelerId(traveler_id),
        status: parse_status(&status_str)?,
        offer,
        verdict,
        passengers,
        amount: parse_decimal("amount", &amount_str)?,
        currency,
        supplier_order_ref,
        confirmation_code,
        manually_confirmed,
        needs_reconciliation,
        payment,
        created_at,
        updated_at,
    })
}

const SELECT_COLUMNS: &str = "id, org_id, traveler_id, status, offer, verdict, passengers,
                    amount, currency, supplier_order_ref, confirmation_code,
                    manually_confirmed, needs_reconciliation,
                    payment_order_id, payment_payment_id, created_at, updated_at";

#[async_trait::async_trait]
impl BookingRepository for SqlBookingRepository {
    async fn find_by_id(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM booking WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_booking(r)?)),
            None => Ok(None),
        }
    }

    async fn list_for_traveler(
        &self,
        traveler_id: &TravelerId,
    ) -> Result<Vec<Booking>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM booking
             WHERE traveler_id = ? ORDER BY created_at DESC"
        ))
        .bind(&traveler_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_booking).collect::<Result<Vec<_>, _>>()
    }

    async fn save(&self, booking: Booking) -> Result<(), RepositoryError> {
        let offer_json = serde_json::to_string(&booking.offer)
            .map_err(|e| RepositoryError::Decode(format!("column offer: {e}")))?;
        let verdict_json = serde_json::to_string(&booking.verdict)
            .map_err(|e| RepositoryError::Decode(format!("column verdict: {e}")))?;
        let passengers_json = serde_json::to_string(&booking.passengers)
            .map_err(|e| RepositoryError::Decode(format!("column passengers: {e}")))?;
        let payment_order_id = booking.payment.as_ref().map(|p| p.order_id.clone());
        let payment_payment_id = booking.payment.as_ref().map(|p| p.payment_id.clone());

        // The conflict arm deliberately leaves the creation-time snapshot
        // (offer, verdict, passengers, amount, currency) untouched.
        sqlx::query(
            "INSERT INTO booking (id, org_id, traveler_id, status, offer, verdict, passengers,
                                  amount, currency, supplier_order_ref, confirmation_code,
                                  manually_confirmed, needs_reconciliation,
                                  payment_order_id, payment_payment_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 status = excluded.status,
                 supplier_order_ref = excluded.supplier_order_ref,
                 confirmation_code = excluded.confirmation_code,
                 manually_confirmed = excluded.manually_confirmed,
                 needs_reconciliation = excluded.needs_reconciliation,
                 payment_order_id = excluded.payment_order_id,
                 payment_payment_id = excluded.payment_payment_id,
                 updated_at = excluded.updated_at",
        )
        .bind(&booking.id.0)
        .bind(&booking.org_id.0)
        .bind(&booking.traveler_id.0)
        .bind(booking.status.as_str())
        .bind(&offer_json)
        .bind(&verdict_json)
        .bind(&passengers_json)
        .bind(booking.amount.to_string())
        .bind(&booking.currency)
        .bind(&booking.supplier_order_ref)
        .bind(&booking.confirmation_code)
        .bind(booking.manually_confirmed)
        .bind(booking.needs_reconciliation)
        .bind(&payment_order_id)
        .bind(&payment_payment_id)
        .bind(booking.created_at.to_rfc3339())
        .bind(booking.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
