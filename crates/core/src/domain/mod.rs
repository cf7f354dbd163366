pub mod approval;
pub mod booking;
pub mod incident;
pub mod invoice;
pub mod offer;
pub mod policy;
pub mod traveler;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrgId(pub String);
