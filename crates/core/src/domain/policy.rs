use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::offer::CabinClass;
use crate::domain::traveler::SeniorityTier;
use crate::domain::OrgId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyId(pub String);

impl PolicyId {
    pub fn generate() -> Self {
        Self(format!("pol-{}", Uuid::new_v4()))
    }
}

/// Soft policies record violations and route to approval; hard policies
/// additionally gate the automated booking path for non-compliant offers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementMode {
    Soft,
    Hard,
}

impl EnforcementMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Soft => "soft",
            Self::Hard => "hard",
        }
    }
}

/// A versioned travel policy. Exactly one version per org is active at a
/// time; evaluation always binds to the active version at decision time.
/// Monthly ceilings are carried for the reporting job and are not part of
/// per-booking evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    pub id: PolicyId,
    pub org_id: OrgId,
    pub version: u32,
    pub active: bool,
    pub mode: EnforcementMode,
    pub default_cabin: CabinClass,
    pub cabin_overrides: BTreeMap<SeniorityTier, Vec<CabinClass>>,
    pub domestic_fare_ceiling: Decimal,
    pub international_fare_ceiling: Decimal,
    pub per_trip_ceiling: Decimal,
    pub per_trip_overrides: BTreeMap<SeniorityTier, Decimal>,
    pub monthly_ceiling: Option<Decimal>,
    pub min_advance_days: u32,
    pub blocked_carriers: BTreeSet<String>,
    pub max_stops: u32,
    pub refundable_only: bool,
    pub auto_approve_under: Decimal,
    pub require_approval_over: Decimal,
    pub approval_expiry_hours: u32,
    pub created_at: DateTime<Utc>,
}

impl PolicyDocument {
    /// True when `cabin` is bookable for `tier`: an explicit override list
    /// wins, otherwise the default cabin is expanded through the hierarchy.
    pub fn allows_cabin(&self, tier: SeniorityTier, cabin: CabinClass) -> bool {
        match self.cabin_overrides.get(&tier) {
            Some(allowed) => allowed.contains(&cabin),
            None => cabin <= self.default_cabin,
        }
    }

    pub fn trip_ceiling_for(&self, tier: SeniorityTier) -> Decimal {
        self.per_trip_overrides.get(&tier).copied().unwrap_or(self.per_trip_ceiling)
    }
}
