use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use tripdesk_core::domain::booking::BookingId;
use tripdesk_core::domain::invoice::{InvoiceId, TaxInvoice};

use super::{InvoiceRepository, RepositoryError};
use crate::DbPool;

pub struct SqlInvoiceRepository {
    pool: DbPool,
}

impl SqlInvoiceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_decimal(column: &str, s: &str) -> Result<Decimal, RepositoryError> {
    s.parse::<Decimal>()
        .map_err(|e| RepositoryError::Decode(format!("column {column}: {e}")))
}

fn row_to_invoice(row: &sqlx::sqlite::SqliteRow) -> Result<TaxInvoice, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let booking_id: String =
        row.try_get("booking_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let base_amount: String =
        row.try_get("base_amount").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let cgst: String = row.try_get("cgst").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let sgst: String = row.try_get("sgst").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let igst: String = row.try_get("igst").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let total_gst: String =
        row.try_get("total_gst").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let total_amount: String =
        row.try_get("total_amount").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let gst_rate: String =
        row.try_get("gst_rate").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let interstate: bool =
        row.try_get("interstate").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let place_of_supply: String =
        row.try_get("place_of_supply").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let registered_state: String =
        row.try_get("registered_state").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(TaxInvoice {
        id: InvoiceId(id),
        booking_id: BookingId(booking_id),
        base_amount: parse_decimal("base_amount", &base_amount)?,
        cgst: parse_decimal("cgst", &cgst)?,
        sgst: parse_decimal("sgst", &sgst)?,
        igst: parse_decimal("igst", &igst)?,
        total_gst: parse_decimal("total_gst", &total_gst)?,
        total_amount: parse_decimal("total_amount", &total_amount)?,
        gst_rate: parse_decimal("gst_rate", &gst_rate)?,
        interstate,
        place_of_supply,
        registered_state,
        created_at,
    })
}

#[async_trait::async_trait]
impl InvoiceRepository for SqlInvoiceRepository {
    async fn find_by_booking(
        &self,
        booking_id: &BookingId,
    ) -> Result<Option<TaxInvoice>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, booking_id, base_amount, cgst, sgst, igst, total_gst, total_amount,
                    gst_rate, interstate, place_of_supply, registered_state, created_at
             FROM tax_invoice WHERE booking_id = ?",
        )
        .bind(&booking_id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_invoice(r)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, invoice: TaxInvoice) -> Result<bool, RepositoryError> {
        // Insert-once per booking; a conflict means an invoice already exists
        // and the stored row wins.
        let result = sqlx::query(
            "INSERT INTO tax_invoice (id, booking_id, base_amount, cgst, sgst, igst, total_gst,
                                      total_amount, gst_rate, interstate, place_of_supply,
                                      registered_state, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(booking_id) DO NOTHING",
        )
        .bind(&invoice.id.0)
        .bind(&invoice.booking_id.0)
        .bind(invoice.base_amount.to_string())
        .bind(invoice.cgst.to_string())
        .bind(invoice.sgst.to_string())
        .bind(invoice.igst.to_string())
        .bind(invoice.total_gst.to_string())
        .bind(invoice.total_amount.to_string())
        .bind(invoice.gst_rate.to_string())
        .bind(invoice.interstate)
        .bind(&invoice.place_of_supply)
        .bind(&invoice.registered_state)
        .bind(invoice.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
