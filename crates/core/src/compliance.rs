use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::airports::TradeLane;
use crate::domain::offer::Offer;
use crate::domain::policy::{EnforcementMode, PolicyDocument};
use crate::domain::traveler::Traveler;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationRule {
    CabinClass,
    FareCeiling,
    TripSpend,
    AdvancePurchase,
    BlockedCarrier,
    MaxStops,
    NonRefundable,
}

impl ViolationRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CabinClass => "cabin_class",
            Self::FareCeiling => "fare_ceiling",
            Self::TripSpend => "trip_spend",
            Self::AdvancePurchase => "advance_purchase",
            Self::BlockedCarrier => "blocked_carrier",
            Self::MaxStops => "max_stops",
            Self::NonRefundable => "non_refundable",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyViolation {
    pub rule: ViolationRule,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyVerdict {
    pub compliant: bool,
    pub violations: Vec<PolicyViolation>,
    pub needs_approval: bool,
    pub mode: EnforcementMode,
    pub policy_version: u32,
    pub evaluated_at: DateTime<Utc>,
}

impl PolicyVerdict {
    /// Hard-mode non-compliance gates the automated booking path entirely.
    pub fn hard_blocked(&self) -> bool {
        !self.compliant && self.mode == EnforcementMode::Hard
    }

    /// One-line reason string used on approval requests and notifications.
    pub fn summary(&self) -> String {
        if self.violations.is_empty() {
            return "requires approval by spend threshold".to_string();
        }
        self.violations.iter().map(|v| v.message.as_str()).collect::<Vec<_>>().join("; ")
    }
}

/// Evaluates every rule and collects every violation; no short-circuiting.
/// Pure: the evaluation instant is an argument, never read from a clock, so
/// identical inputs always produce an identical verdict.
pub fn evaluate_policy(
    offer: &Offer,
    traveler: &Traveler,
    policy: &PolicyDocument,
    at: DateTime<Utc>,
) -> PolicyVerdict {
    let mut violations = Vec::new();

    if !policy.allows_cabin(traveler.tier, offer.cabin) {
        violations.push(PolicyViolation {
            rule: ViolationRule::CabinClass,
            message: format!(
                "{} class is not allowed for {} tier travelers",
                offer.cabin,
                traveler.tier.as_str()
            ),
        });
    }

    let lane = offer.lane();
    let fare_ceiling = match lane {
        TradeLane::Domestic => policy.domestic_fare_ceiling,
        TradeLane::International => policy.international_fare_ceiling,
    };
    if offer.price > fare_ceiling {
        violations.push(PolicyViolation {
            rule: ViolationRule::FareCeiling,
            message: format!(
                "fare {} {} exceeds the {lane} ceiling of {} {}",
                offer.price, offer.currency, fare_ceiling, offer.currency
            ),
        });
    }

    let trip_ceiling = policy.trip_ceiling_for(traveler.tier);
    if offer.price > trip_ceiling {
        violations.push(PolicyViolation {
            rule: ViolationRule::TripSpend,
            message: format!(
                "fare {} {} exceeds the per-trip ceiling of {} {} for {} tier",
                offer.price,
                offer.currency,
                trip_ceiling,
                offer.currency,
                traveler.tier.as_str()
            ),
        });
    }

    let advance_days = (offer.departs_at.date_naive() - at.date_naive()).num_days();
    if advance_days < i64::from(policy.min_advance_days) {
        violations.push(PolicyViolation {
            rule: ViolationRule::AdvancePurchase,
            message: format!(
                "departure is {advance_days} day(s) away; policy requires {} day(s) advance purchase",
                policy.min_advance_days
            ),
        });
    }

    if policy.blocked_carriers.contains(&offer.carrier) {
        violations.push(PolicyViolation {
            rule: ViolationRule::BlockedCarrier,
            message: format!("carrier {} is blocked by travel policy", offer.carrier),
        });
    }

    if offer.stops > policy.max_stops {
        violations.push(PolicyViolation {
            rule: ViolationRule::MaxStops,
            message: format!(
                "itinerary has {} stop(s); policy allows at most {}",
                offer.stops, policy.max_stops
            ),
        });
    }

    if policy.refundable_only && !offer.refundable {
        violations.push(PolicyViolation {
            rule: ViolationRule::NonRefundable,
            message: "policy requires refundable fares".to_string(),
        });
    }

    let needs_approval = !violations.is_empty() || offer.price > policy.require_approval_over;

    PolicyVerdict {
        compliant: violations.is_empty(),
        violations,
        needs_approval,
        mode: policy.mode,
        policy_version: policy.version,
        evaluated_at: at,
    }
}
