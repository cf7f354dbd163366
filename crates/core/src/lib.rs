//! Domain model and pure business rules for the tripdesk booking platform.
//!
//! Everything in this crate is synchronous and side-effect free: policy
//! evaluation, pricing, GST computation, and the booking/approval state
//! machines all operate on plain values so they can be exercised without a
//! database or network.

pub mod airports;
pub mod compliance;
pub mod config;
pub mod domain;
pub mod errors;
pub mod gst;
pub mod pricing;

pub use airports::{classify_lane, is_domestic, tax_state, TradeLane};
pub use compliance::{evaluate_policy, PolicyVerdict, PolicyViolation, ViolationRule};
pub use config::{
    AppConfig, ApprovalsConfig, ConfigError, ConfigOverrides, DatabaseConfig, FeeMode,
    LoadOptions, LogFormat, LoggingConfig, PaymentConfig, PricingConfig, ServerConfig,
    SupplierConfig, SupplierMode, TaxConfig,
};
pub use domain::approval::{ApprovalId, ApprovalRequest, ApprovalStatus};
pub use domain::booking::{Booking, BookingId, BookingStatus, PaymentRef};
pub use domain::incident::{Incident, IncidentId, IncidentKind};
pub use domain::invoice::{InvoiceId, TaxInvoice};
pub use domain::offer::{CabinClass, DataSource, Offer, OfferId, DEFAULT_CURRENCY};
pub use domain::policy::{EnforcementMode, PolicyDocument, PolicyId};
pub use domain::traveler::{Passenger, SeniorityTier, Traveler, TravelerId, TravelerRole};
pub use domain::OrgId;
pub use errors::DomainError;
pub use gst::{compute_gst, GstBreakdown};
pub use pricing::{calculate_price, round2, FeeComponent, PriceBreakdown, PricingRule};
