use chrono::{DateTime, Utc};
use sqlx::Row;

use tripdesk_core::domain::approval::{ApprovalId, ApprovalRequest, ApprovalStatus};
use tripdesk_core::domain::booking::BookingId;
use tripdesk_core::domain::traveler::TravelerId;

use super::{ApprovalRepository, RepositoryError};
use crate::DbPool;

pub struct SqlApprovalRepository {
    pool: DbPool,
}

impl SqlApprovalRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_status(s: &str) -> ApprovalStatus {
    match s {
        "approved" => ApprovalStatus::Approved,
        "rejected" => ApprovalStatus::Rejected,
        "expired" => ApprovalStatus::Expired,
        _ => ApprovalStatus::Pending,
    }
}

fn row_to_approval(row: &sqlx::sqlite::SqliteRow) -> Result<ApprovalRequest, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let booking_id: String =
        row.try_get("booking_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let requester_id: String =
        row.try_get("requester_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approver_id: String =
        row.try_get("approver_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let reason: String =
        row.try_get("reason").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let decision_reason: Option<String> =
        row.try_get("decision_reason").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let decided_by: Option<String> =
        row.try_get("decided_by").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let decided_at_str: Option<String> =
        row.try_get("decided_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let expires_at_str: String =
        row.try_get("expires_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let decided_at = decided_at_str
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc));
    let expires_at = DateTime::parse_from_rfc3339(&expires_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(ApprovalRequest {
        id: ApprovalId(id),
        booking_id: BookingId(booking_id),
        requester_id: TravelerId(requester_id),
        approver_id: TravelerId(approver_id),
        status: parse_status(&status_str),
        reason,
        decision_reason,
        decided_by: decided_by.map(TravelerId),
        decided_at,
        expires_at,
        created_at,
        updated_at,
    })
}

#[async_trait::async_trait]
impl ApprovalRepository for SqlApprovalRepository {
    async fn find_by_id(
        &self,
        id: &ApprovalId,
    ) -> Result<Option<ApprovalRequest>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, booking_id, requester_id, approver_id, status, reason,
                    decision_reason, decided_by, decided_at, expires_at, created_at, updated_at
             FROM approval_request WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_approval(r)?)),
            None => Ok(None),
        }
    }

    async fn find_pending_for_booking(
        &self,
        booking_id: &BookingId,
    ) -> Result<Option<ApprovalRequest>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, booking_id, requester_id, approver_id, status, reason,
                    decision_reason, decided_by, decided_at, expires_at, created_at, updated_at
             FROM approval_request WHERE booking_id = ? AND status = 'pending'",
        )
        .bind(&booking_id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_approval(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, approval: ApprovalRequest) -> Result<(), RepositoryError> {
        let decided_at_str = approval.decided_at.map(|dt| dt.to_rfc3339());
        let decided_by_str = approval.decided_by.as_ref().map(|id| id.0.clone());

        sqlx::query(
            "INSERT INTO approval_request (id, booking_id, requester_id, approver_id, status,
                                           reason, decision_reason, decided_by, decided_at,
                                           expires_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 approver_id = excluded.approver_id,
                 status = excluded.status,
                 reason = excluded.reason,
                 decision_reason = excluded.decision_reason,
                 decided_by = excluded.decided_by,
                 decided_at = excluded.decided_at,
                 expires_at = excluded.expires_at,
                 updated_at = excluded.updated_at",
        )
        .bind(&approval.id.0)
        .bind(&approval.booking_id.0)
        .bind(&approval.requester_id.0)
        .bind(&approval.approver_id.0)
        .bind(approval.status.as_str())
        .bind(&approval.reason)
        .bind(&approval.decision_reason)
        .bind(&decided_by_str)
        .bind(&decided_at_str)
        .bind(approval.expires_at.to_rfc3339())
        .bind(approval.created_at.to_rfc3339())
        .bind(approval.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn decide_if_pending(
        &self,
        id: &ApprovalId,
        decision: ApprovalStatus,
        decided_by: &TravelerId,
        decision_reason: Option<String>,
        decided_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE approval_request
             SET status = ?, decided_by = ?, decision_reason = ?, decided_at = ?, updated_at = ?
             WHERE id = ? AND status = 'pending'",
        )
        .bind(decision.as_str())
        .bind(&decided_by.0)
        .bind(&decision_reason)
        .bind(decided_at.to_rfc3339())
        .bind(decided_at.to_rfc3339())
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn expire_if_pending(
        &self,
        id: &ApprovalId,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE approval_request
             SET status = 'expired', updated_at = ?
             WHERE id = ? AND status = 'pending'",
        )
        .bind(at.to_rfc3339())
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        // datetime() normalizes RFC3339 text so mixed offsets compare correctly.
        let result = sqlx::query(
            "UPDATE approval_request
             SET status = 'expired', updated_at = ?
             WHERE status = 'pending' AND datetime(expires_at) <= datetime(?)",
        )
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
