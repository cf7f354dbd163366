use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::airports::{classify_lane, TradeLane};

pub const DEFAULT_CURRENCY: &str = "INR";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OfferId(pub String);

impl OfferId {
    pub fn generate(namespace: &str) -> Self {
        Self(format!("{namespace}:{}", Uuid::new_v4()))
    }

    /// Backend namespace of this offer, i.e. everything before the first `:`.
    pub fn namespace(&self) -> Option<&str> {
        self.0.split_once(':').map(|(prefix, _)| prefix)
    }
}

/// Cabin classes ordered by comfort; the derived `Ord` is the allowance
/// hierarchy (a traveler allowed `Business` may also book anything below it).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CabinClass {
    Economy,
    PremiumEconomy,
    Business,
    First,
}

impl CabinClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Economy => "economy",
            Self::PremiumEconomy => "premium_economy",
            Self::Business => "business",
            Self::First => "first",
        }
    }
}

impl std::fmt::Display for CabinClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance of an offer. `Sample` rows come from seeded/degraded data and
/// must never be treated as real supplier inventory downstream (no live
/// booking call, no tax invoice).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Api,
    Sample,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Sample => "sample",
        }
    }
}

/// An immutable priced itinerary returned by a supplier search. Offers expire
/// on the supplier side; an expired offer can never be booked.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub carrier: String,
    pub origin: String,
    pub destination: String,
    pub departs_at: DateTime<Utc>,
    pub cabin: CabinClass,
    pub stops: u32,
    pub refundable: bool,
    pub price: Decimal,
    pub currency: String,
    pub expires_at: DateTime<Utc>,
    pub data_source: DataSource,
}

impl Offer {
    pub fn is_expired(&self, at: DateTime<Utc>) -> bool {
        at >= self.expires_at
    }

    pub fn lane(&self) -> TradeLane {
        classify_lane(&self.origin, &self.destination)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use crate::airports::TradeLane;

    use super::{CabinClass, DataSource, Offer, OfferId};

    fn offer(origin: &str, destination: &str) -> Offer {
        Offer {
            id: OfferId("ah:OF-1001".to_string()),
            carrier: "6E".to_string(),
            origin: origin.to_string(),
            destination: destination.to_string(),
            departs_at: Utc::now() + Duration::days(14),
            cabin: CabinClass::Economy,
            stops: 0,
            refundable: true,
            price: Decimal::new(4_500_00, 2),
            currency: "INR".to_string(),
            expires_at: Utc::now() + Duration::minutes(20),
            data_source: DataSource::Api,
        }
    }

    #[test]
    fn cabin_hierarchy_orders_by_comfort() {
        assert!(CabinClass::Economy < CabinClass::PremiumEconomy);
        assert!(CabinClass::PremiumEconomy < CabinClass::Business);
        assert!(CabinClass::Business < CabinClass::First);
    }

    #[test]
    fn offer_id_exposes_backend_namespace() {
        assert_eq!(offer("DEL", "BOM").id.namespace(), Some("ah"));
        assert_eq!(OfferId("no-namespace".to_string()).namespace(), None);
    }

    #[test]
    fn expiry_is_inclusive_of_the_deadline() {
        let subject = offer("DEL", "BOM");
        assert!(!subject.is_expired(subject.expires_at - Duration::seconds(1)));
        assert!(subject.is_expired(subject.expires_at));
    }

    #[test]
    fn lane_follows_the_airport_table() {
        assert_eq!(offer("DEL", "BOM").lane(), TradeLane::Domestic);
        assert_eq!(offer("DEL", "SIN").lane(), TradeLane::International);
    }
}
