//! Fire-and-forget side channels: traveler/approver notifications and the
//! preference-learning feed. Nothing here may block or fail a booking
//! operation, so the traits are synchronous and infallible at the call site.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use tripdesk_core::{Booking, BookingId, CabinClass, TravelerId};

use crate::error::RefundStatus;

#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    ApprovalRequested {
        approver_id: TravelerId,
        requester_id: TravelerId,
        booking_id: BookingId,
        reason: String,
        expires_at: DateTime<Utc>,
    },
    BookingConfirmed {
        traveler_id: TravelerId,
        booking_id: BookingId,
        confirmation_code: String,
        manually_confirmed: bool,
    },
    BookingRejected {
        traveler_id: TravelerId,
        booking_id: BookingId,
        reason: String,
        refund: RefundStatus,
    },
    BookingCancelled {
        traveler_id: TravelerId,
        booking_id: BookingId,
        refund_amount: Option<Decimal>,
    },
}

impl Notification {
    /// Who should receive this. Approval prompts go to the approver and the
    /// requester; everything else goes to the traveler alone.
    pub fn recipients(&self) -> Vec<&TravelerId> {
        match self {
            Self::ApprovalRequested { approver_id, requester_id, .. } => {
                vec![approver_id, requester_id]
            }
            Self::BookingConfirmed { traveler_id, .. }
            | Self::BookingRejected { traveler_id, .. }
            | Self::BookingCancelled { traveler_id, .. } => vec![traveler_id],
        }
    }

    /// One-line human rendering used by log-backed delivery.
    pub fn render(&self) -> String {
        match self {
            Self::ApprovalRequested { booking_id, reason, expires_at, .. } => {
                format!(
                    "approval needed for booking {}: {reason} (respond by {expires_at})",
                    booking_id.0
                )
            }
            Self::BookingConfirmed {
                booking_id,
                confirmation_code,
                manually_confirmed: true,
                ..
            } => format!(
                "booking {} confirmed with code {confirmation_code} (manual confirmation, \
                 reconciliation pending)",
                booking_id.0
            ),
            Self::BookingConfirmed { booking_id, confirmation_code, .. } => {
                format!("booking {} confirmed with code {confirmation_code}", booking_id.0)
            }
            Self::BookingRejected { booking_id, reason, refund, .. } => {
                format!("booking {} was rejected: {reason}; payment status: {refund}", booking_id.0)
            }
            Self::BookingCancelled { booking_id, refund_amount: Some(amount), .. } => {
                format!("booking {} cancelled; supplier refund of {amount}", booking_id.0)
            }
            Self::BookingCancelled { booking_id, .. } => {
                format!("booking {} cancelled", booking_id.0)
            }
        }
    }
}

/// The seam booking operations fire notifications through. Implementations
/// must return immediately.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Actual delivery of a notification to its recipients.
#[async_trait]
pub trait NotificationDelivery: Send + Sync {
    async fn deliver(&self, notification: Notification) -> Result<(), String>;
}

/// Delivery that writes into the service log. Stands in until a real
/// channel (mail, chat) is wired behind the same trait.
pub struct LogDelivery;

#[async_trait]
impl NotificationDelivery for LogDelivery {
    async fn deliver(&self, notification: Notification) -> Result<(), String> {
        for recipient in notification.recipients() {
            info!(
                event_name = "notification.delivered",
                recipient = %recipient.0,
                message = %notification.render(),
            );
        }
        Ok(())
    }
}

/// Production notifier: detaches delivery onto the ambient tokio runtime and
/// logs failures at `warn`. The booking operation has already returned by
/// the time delivery runs.
pub struct DetachedNotifier {
    delivery: Arc<dyn NotificationDelivery>,
}

impl DetachedNotifier {
    pub fn new(delivery: Arc<dyn NotificationDelivery>) -> Self {
        Self { delivery }
    }
}

impl Notifier for DetachedNotifier {
    fn notify(&self, notification: Notification) {
        let delivery = Arc::clone(&self.delivery);
        tokio::spawn(async move {
            if let Err(error) = delivery.deliver(notification).await {
                warn!(error = %error, "notification delivery failed");
            }
        });
    }
}

/// A booked trip reduced to the fields preference learning cares about.
#[derive(Clone, Debug, PartialEq)]
pub struct BookingSignal {
    pub traveler_id: TravelerId,
    pub carrier: String,
    pub cabin: CabinClass,
    pub origin: String,
    pub destination: String,
}

impl BookingSignal {
    pub fn from_booking(booking: &Booking) -> Self {
        Self {
            traveler_id: booking.traveler_id.clone(),
            carrier: booking.offer.carrier.clone(),
            cabin: booking.offer.cabin,
            origin: booking.offer.origin.clone(),
            destination: booking.offer.destination.clone(),
        }
    }
}

/// Feed of booked trips for preference learning.
pub trait PreferenceSink: Send + Sync {
    fn record(&self, signal: BookingSignal);
}

/// Emits preference signals as structured log events for an out-of-process
/// learner to consume.
pub struct LoggedPreferences;

impl PreferenceSink for LoggedPreferences {
    fn record(&self, signal: BookingSignal) {
        info!(
            event_name = "preference.trip_booked",
            traveler_id = %signal.traveler_id.0,
            carrier = %signal.carrier,
            cabin = %signal.cabin,
            origin = %signal.origin,
            destination = %signal.destination,
        );
    }
}
