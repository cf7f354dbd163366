//! Booking Orchestrator - the transactional heart of tripdesk
//!
//! This crate drives a booking through its whole life: policy check,
//! payment verification, supplier confirmation, approval workflow,
//! cancellation and GST invoicing. It owns the saga-style compensation
//! rules that keep money and inventory consistent when a step fails
//! partway through.
//!
//! # Operations
//!
//! - `create_booking` - validate, verify payment, evaluate policy, then
//!   either book against the supplier or park the trip for approval
//! - `respond_to_approval` - approve or reject a pending request with a
//!   compare-and-set decision; approval re-books from the stored snapshot
//! - `cancel_booking` - best-effort supplier cancellation plus the local
//!   terminal transition
//! - `compute_tax_invoice` - idempotent GST invoice issuance
//!
//! # Money Principle
//!
//! A captured payment is never left ambiguous. Every failure path either
//! refunds it, or records an incident and says so in the error the caller
//! sees. Compensation failures degrade to reconciliation flags rather
//! than silent loss.

pub mod approval;
pub mod cancel;
pub mod create;
pub mod effects;
pub mod error;
pub mod invoice;
pub mod outcome;
pub mod service;

pub use approval::ApprovalDecision;
pub use create::{CreateBookingRequest, PaymentCapture};
pub use effects::{
    BookingSignal, DetachedNotifier, LogDelivery, LoggedPreferences, Notification,
    NotificationDelivery, Notifier, PreferenceSink,
};
pub use error::{BookingError, RefundStatus};
pub use outcome::{BookingOutcome, CancellationOutcome};
pub use service::{BookingOrchestrator, OrchestratorSettings, Repositories};
