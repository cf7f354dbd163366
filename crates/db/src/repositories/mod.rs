use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use tripdesk_core::domain::approval::{ApprovalId, ApprovalRequest, ApprovalStatus};
use tripdesk_core::domain::booking::{Booking, BookingId};
use tripdesk_core::domain::incident::Incident;
use tripdesk_core::domain::invoice::TaxInvoice;
use tripdesk_core::domain::policy::{PolicyDocument, PolicyId};
use tripdesk_core::domain::traveler::{Traveler, TravelerId};
use tripdesk_core::domain::OrgId;

pub mod approval;
pub mod booking;
pub mod incident;
pub mod invoice;
pub mod memory;
pub mod policy;
pub mod traveler;

pub use approval::SqlApprovalRepository;
pub use booking::SqlBookingRepository;
pub use incident::SqlIncidentRepository;
pub use invoice::SqlInvoiceRepository;
pub use memory::{
    InMemoryApprovalRepository, InMemoryBookingRepository, InMemoryIncidentRepository,
    InMemoryInvoiceRepository, InMemoryPolicyRepository, InMemoryTravelerRepository,
};
pub use policy::SqlPolicyRepository;
pub use traveler::SqlTravelerRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("constraint violation: {0}")]
    Conflict(String),
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn find_by_id(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError>;

    async fn list_for_traveler(
        &self,
        traveler_id: &TravelerId,
    ) -> Result<Vec<Booking>, RepositoryError>;

    /// Upsert. The creation-time snapshot columns (offer, verdict, passengers,
    /// amount, currency) are written once and never updated afterwards.
    async fn save(&self, booking: Booking) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ApprovalRepository: Send + Sync {
    async fn find_by_id(&self, id: &ApprovalId)
        -> Result<Option<ApprovalRequest>, RepositoryError>;

    async fn find_pending_for_booking(
        &self,
        booking_id: &BookingId,
    ) -> Result<Option<ApprovalRequest>, RepositoryError>;

    async fn save(&self, approval: ApprovalRequest) -> Result<(), RepositoryError>;

    /// Compare-and-set decision. Returns false when the request was no longer
    /// pending, which is how racing approvers lose.
    async fn decide_if_pending(
        &self,
        id: &ApprovalId,
        decision: ApprovalStatus,
        decided_by: &TravelerId,
        decision_reason: Option<String>,
        decided_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    async fn expire_if_pending(
        &self,
        id: &ApprovalId,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    /// Expire every pending request whose deadline has passed. Returns the
    /// number of rows flipped.
    async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait PolicyRepository: Send + Sync {
    async fn find_by_id(&self, id: &PolicyId) -> Result<Option<PolicyDocument>, RepositoryError>;

    async fn find_active(&self, org_id: &OrgId)
        -> Result<Option<PolicyDocument>, RepositoryError>;

    async fn save(&self, policy: PolicyDocument) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait TravelerRepository: Send + Sync {
    async fn find_by_id(&self, id: &TravelerId) -> Result<Option<Traveler>, RepositoryError>;

    async fn find_active_with_elevated_role(
        &self,
        org_id: &OrgId,
    ) -> Result<Vec<Traveler>, RepositoryError>;

    async fn save(&self, traveler: Traveler) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    async fn find_by_booking(
        &self,
        booking_id: &BookingId,
    ) -> Result<Option<TaxInvoice>, RepositoryError>;

    /// Insert-once. Returns false when an invoice already exists for the
    /// booking, leaving the stored row untouched.
    async fn create(&self, invoice: TaxInvoice) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait IncidentRepository: Send + Sync {
    async fn append(&self, incident: Incident) -> Result<(), RepositoryError>;

    async fn list_for_booking(
        &self,
        booking_id: &BookingId,
    ) -> Result<Vec<Incident>, RepositoryError>;
}
