use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::OrgId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TravelerId(pub String);

impl TravelerId {
    pub fn generate() -> Self {
        Self(format!("trv-{}", Uuid::new_v4()))
    }
}

/// Seniority tiers referenced by policy allowance tables, lowest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeniorityTier {
    Ic,
    Manager,
    Director,
    Executive,
}

impl SeniorityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ic => "ic",
            Self::Manager => "manager",
            Self::Director => "director",
            Self::Executive => "executive",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelerRole {
    Employee,
    Manager,
    TravelAdmin,
}

impl TravelerRole {
    /// Elevated roles may approve bookings and cancel on behalf of others.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Self::Manager | Self::TravelAdmin)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Traveler {
    pub id: TravelerId,
    pub org_id: OrgId,
    pub full_name: String,
    pub email: String,
    pub tier: SeniorityTier,
    pub role: TravelerRole,
    pub approver_id: Option<TravelerId>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Traveler {
    pub fn as_passenger(&self) -> Passenger {
        let mut parts = self.full_name.splitn(2, ' ');
        let first_name = parts.next().unwrap_or_default().to_string();
        let last_name = parts.next().unwrap_or_default().to_string();
        Passenger { first_name, last_name, email: self.email.clone() }
    }
}

/// Passenger details snapshotted onto a booking so an approval-time re-book
/// never re-reads mutable traveler state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passenger {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}
