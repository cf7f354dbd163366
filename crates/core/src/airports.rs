use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeLane {
    Domestic,
    International,
}

impl TradeLane {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Domestic => "domestic",
            Self::International => "international",
        }
    }
}

impl std::fmt::Display for TradeLane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// IATA code to GST state for the domestic airports we ticket. Sorted by
/// code; `tax_state` relies on the ordering.
const AIRPORT_TAX_STATES: &[(&str, &str)] = &[
    ("AMD", "Gujarat"),
    ("ATQ", "Punjab"),
    ("BBI", "Odisha"),
    ("BLR", "Karnataka"),
    ("BOM", "Maharashtra"),
    ("CCU", "West Bengal"),
    ("COK", "Kerala"),
    ("DEL", "Delhi"),
    ("GAU", "Assam"),
    ("GOI", "Goa"),
    ("HYD", "Telangana"),
    ("IDR", "Madhya Pradesh"),
    ("IXC", "Chandigarh"),
    ("JAI", "Rajasthan"),
    ("LKO", "Uttar Pradesh"),
    ("MAA", "Tamil Nadu"),
    ("NAG", "Maharashtra"),
    ("PAT", "Bihar"),
    ("PNQ", "Maharashtra"),
    ("SXR", "Jammu and Kashmir"),
    ("TRV", "Kerala"),
    ("VNS", "Uttar Pradesh"),
];

/// GST state for a domestic airport, `None` for anything outside the table
/// (international airports included).
pub fn tax_state(airport: &str) -> Option<&'static str> {
    let code = airport.trim().to_ascii_uppercase();
    AIRPORT_TAX_STATES
        .binary_search_by_key(&code.as_str(), |(iata, _)| iata)
        .ok()
        .map(|index| AIRPORT_TAX_STATES[index].1)
}

pub fn is_domestic(airport: &str) -> bool {
    tax_state(airport).is_some()
}

/// Both endpoints inside the domestic table make a domestic lane; anything
/// else is international.
pub fn classify_lane(origin: &str, destination: &str) -> TradeLane {
    if is_domestic(origin) && is_domestic(destination) {
        TradeLane::Domestic
    } else {
        TradeLane::International
    }
}
