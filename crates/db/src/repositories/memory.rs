use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use tripdesk_core::domain::approval::{ApprovalId, ApprovalRequest, ApprovalStatus};
use tripdesk_core::domain::booking::{Booking, BookingId};
use tripdesk_core::domain::incident::Incident;
use tripdesk_core::domain::invoice::TaxInvoice;
use tripdesk_core::domain::policy::{PolicyDocument, PolicyId};
use tripdesk_core::domain::traveler::{Traveler, TravelerId};
use tripdesk_core::domain::OrgId;

use super::{
    ApprovalRepository, BookingRepository, IncidentRepository, InvoiceRepository,
    PolicyRepository, RepositoryError, TravelerRepository,
};

/// The in-memory repositories mirror the SQL constraints (snapshot
/// immutability, single pending approval, single active policy, one invoice
/// per booking) so orchestration tests exercise the same semantics.
#[derive(Default)]
pub struct InMemoryBookingRepository {
    bookings: RwLock<HashMap<String, Booking>>,
}

#[async_trait::async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn find_by_id(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError> {
        let bookings = self.bookings.read().await;
        Ok(bookings.get(&id.0).cloned())
    }

    async fn list_for_traveler(
        &self,
        traveler_id: &TravelerId,
    ) -> Result<Vec<Booking>, RepositoryError> {
        let bookings = self.bookings.read().await;
        let mut matches: Vec<Booking> =
            bookings.values().filter(|b| &b.traveler_id == traveler_id).cloned().collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches)
    }

    async fn save(&self, mut booking: Booking) -> Result<(), RepositoryError> {
        let mut bookings = self.bookings.write().await;
        if let Some(existing) = bookings.get(&booking.id.0) {
            booking.offer = existing.offer.clone();
            booking.verdict = existing.verdict.clone();
            booking.passengers = existing.passengers.clone();
            booking.amount = existing.amount;
            booking.currency = existing.currency.clone();
            booking.org_id = existing.org_id.clone();
            booking.traveler_id = existing.traveler_id.clone();
            booking.created_at = existing.created_at;
        }
        bookings.insert(booking.id.0.clone(), booking);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryApprovalRepository {
    approvals: RwLock<HashMap<String, ApprovalRequest>>,
}

#[async_trait::async_trait]
impl ApprovalRepository for InMemoryApprovalRepository {
    async fn find_by_id(
        &self,
        id: &ApprovalId,
    ) -> Result<Option<ApprovalRequest>, RepositoryError> {
        let approvals = self.approvals.read().await;
        Ok(approvals.get(&id.0).cloned())
    }

    async fn find_pending_for_booking(
        &self,
        booking_id: &BookingId,
    ) -> Result<Option<ApprovalRequest>, RepositoryError> {
        let approvals = self.approvals.read().await;
        Ok(approvals
            .values()
            .find(|a| &a.booking_id == booking_id && a.status == ApprovalStatus::Pending)
            .cloned())
    }

    async fn save(&self, approval: ApprovalRequest) -> Result<(), RepositoryError> {
        let mut approvals = self.approvals.write().await;
        if approval.status == ApprovalStatus::Pending {
            let clash = approvals.values().any(|a| {
                a.booking_id == approval.booking_id
                    && a.status == ApprovalStatus::Pending
                    && a.id != approval.id
            });
            if clash {
                return Err(RepositoryError::Conflict(format!(
                    "booking {} already has a pending approval request",
                    approval.booking_id.0
                )));
            }
        }
        approvals.insert(approval.id.0.clone(), approval);
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
        let mut approvals = self.approvals.write().await;
        match approvals.get_mut(&id.0) {
            Some(approval) if approval.status == ApprovalStatus::Pending => {
                approval.status = decision;
                approval.decided_by = Some(decided_by.clone());
                approval.decision_reason = decision_reason;
                approval.decided_at = Some(decided_at);
                approval.updated_at = decided_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn expire_if_pending(
        &self,
        id: &ApprovalId,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut approvals = self.approvals.write().await;
        match approvals.get_mut(&id.0) {
            Some(approval) if approval.status == ApprovalStatus::Pending => {
                approval.status = ApprovalStatus::Expired;
                approval.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut approvals = self.approvals.write().await;
        let mut flipped = 0;
        for approval in approvals.values_mut() {
            if approval.status == ApprovalStatus::Pending && approval.is_overdue(now) {
                approval.status = ApprovalStatus::Expired;
                approval.updated_at = now;
                flipped += 1;
            }
        }
        Ok(flipped)
    }
}

#[derive(Default)]
pub struct InMemoryPolicyRepository {
    policies: RwLock<HashMap<String, PolicyDocument>>,
}

#[async_trait::async_trait]
impl PolicyRepository for InMemoryPolicyRepository {
    async fn find_by_id(&self, id: &PolicyId) -> Result<Option<PolicyDocument>, RepositoryError> {
        let policies = self.policies.read().await;
        Ok(policies.get(&id.0).cloned())
    }

    async fn find_active(
        &self,
        org_id: &OrgId,
    ) -> Result<Option<PolicyDocument>, RepositoryError> {
        let policies = self.policies.read().await;
        Ok(policies.values().find(|p| &p.org_id == org_id && p.active).cloned())
    }

    async fn save(&self, policy: PolicyDocument) -> Result<(), RepositoryError> {
        let mut policies = self.policies.write().await;
        if policy.active {
            let clash = policies
                .values()
                .any(|p| p.org_id == policy.org_id && p.active && p.id != policy.id);
            if clash {
                return Err(RepositoryError::Conflict(format!(
                    "org {} already has an active policy",
                    policy.org_id.0
                )));
            }
        }
        policies.insert(policy.id.0.clone(), policy);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryTravelerRepository {
    travelers: RwLock<HashMap<String, Traveler>>,
}

#[async_trait::async_trait]
impl TravelerRepository for InMemoryTravelerRepository {
    async fn find_by_id(&self, id: &TravelerId) -> Result<Option<Traveler>, RepositoryError> {
        let travelers = self.travelers.read().await;
        Ok(travelers.get(&id.0).cloned())
    }

    async fn find_active_with_elevated_role(
        &self,
        org_id: &OrgId,
    ) -> Result<Vec<Traveler>, RepositoryError> {
        let travelers = self.travelers.read().await;
        let mut matches: Vec<Traveler> = travelers
            .values()
            .filter(|t| &t.org_id == org_id && t.active && t.role.is_elevated())
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(matches)
    }

    async fn save(&self, traveler: Traveler) -> Result<(), RepositoryError> {
        let mut travelers = self.travelers.write().await;
        travelers.insert(traveler.id.0.clone(), traveler);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryInvoiceRepository {
    // Keyed by booking id, which carries the one-invoice-per-booking rule.
    invoices: RwLock<HashMap<String, TaxInvoice>>,
}

#[async_trait::async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
    async fn find_by_booking(
        &self,
        booking_id: &BookingId,
    ) -> Result<Option<TaxInvoice>, RepositoryError> {
        let invoices = self.invoices.read().await;
        Ok(invoices.get(&booking_id.0).cloned())
    }

    async fn create(&self, invoice: TaxInvoice) -> Result<bool, RepositoryError> {
        let mut invoices = self.invoices.write().await;
        if invoices.contains_key(&invoice.booking_id.0) {
            return Ok(false);
        }
        invoices.insert(invoice.booking_id.0.clone(), invoice);
        Ok(true)
    }
}

#[derive(Default)]
pub struct InMemoryIncidentRepository {
    incidents: RwLock<Vec<Incident>>,
}

#[async_trait::async_trait]
impl IncidentRepository for InMemoryIncidentRepository {
    async fn append(&self, incident: Incident) -> Result<(), RepositoryError> {
        let mut incidents = self.incidents.write().await;
        incidents.push(incident);
        Ok(())
    }

    async fn list_for_booking(
        &self,
        booking_id: &BookingId,
    ) -> Result<Vec<Incident>, RepositoryError> {
        let incidents = self.incidents.read().await;
        let mut matches: Vec<Incident> = incidents
            .iter()
            .filter(|i| i.booking_id.as_ref() == Some(booking_id))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matches)
    }
}
