use async_trait::async_trait;
use chrono::{NaiveTime, Utc};
use rust_decimal::Decimal;

use tripdesk_core::{
    classify_lane, round2, CabinClass, DataSource, Offer, OfferId, TradeLane, DEFAULT_CURRENCY,
};

use crate::codes::derive_confirmation_code;
use crate::error::SupplierError;
use crate::gateway::{
    BookingRequest, CancelOutcome, ConfirmationSource, SearchCriteria, SupplierBackend,
    SupplierConfirmation, SANDBOX_PREFIX,
};

/// In-process supply backend for development seeds and tests.
///
/// Fully deterministic: the same criteria produce the same offer ids and
/// prices, and the same booking request produces the same 6-character
/// confirmation code. Offers are tagged [`DataSource::Sample`] so they can
/// never feed a tax invoice. An offer token ending in `-GONE` simulates
/// inventory that disappeared between search and book.
#[derive(Debug, Default)]
pub struct SandboxBackend;

impl SandboxBackend {
    pub fn new() -> Self {
        Self
    }
}

const OFFER_VALIDITY_MINUTES: i64 = 30;

#[async_trait]
impl SupplierBackend for SandboxBackend {
    fn prefix(&self) -> &'static str {
        SANDBOX_PREFIX
    }

    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Offer>, SupplierError> {
        let base = base_fare(&criteria.origin, &criteria.destination);
        let boarding = criteria
            .depart_date
            .and_time(NaiveTime::from_hms_opt(9, 30, 0).unwrap_or_default())
            .and_utc();

        let variants = [
            (CabinClass::Economy, 0_u32, false, base),
            (CabinClass::Economy, 1, false, round2(base * Decimal::new(85, 2))),
            (CabinClass::Business, 0, true, round2(base * Decimal::new(260, 2))),
        ];

        let offers = variants
            .into_iter()
            .enumerate()
            .filter(|(_, (cabin, _, _, _))| {
                criteria.cabin.map(|wanted| wanted == *cabin).unwrap_or(true)
            })
            .map(|(index, (cabin, stops, refundable, price))| {
                let seed = format!(
                    "{}-{}-{}-{index}",
                    criteria.origin, criteria.destination, criteria.depart_date
                );
                Offer {
                    id: OfferId(format!(
                        "{SANDBOX_PREFIX}:OF-{}",
                        derive_confirmation_code(&seed)
                    )),
                    carrier: carrier_for(index),
                    origin: criteria.origin.clone(),
                    destination: criteria.destination.clone(),
                    departs_at: boarding + chrono::Duration::hours(3 * index as i64),
                    cabin,
                    stops,
                    refundable,
                    price,
                    currency: DEFAULT_CURRENCY.to_string(),
                    expires_at: Utc::now() + chrono::Duration::minutes(OFFER_VALIDITY_MINUTES),
                    data_source: DataSource::Sample,
                }
            })
            .collect();

        Ok(offers)
    }

    async fn book(&self, request: &BookingRequest) -> Result<SupplierConfirmation, SupplierError> {
        if request.passengers.is_empty() {
            return Err(SupplierError::Rejected {
                status: 422,
                detail: "at least one passenger is required".to_string(),
            });
        }

        if request.offer_id.0.ends_with("-GONE") {
            return Err(SupplierError::OfferGone {
                detail: "sandbox inventory released this offer".to_string(),
            });
        }

        let mut emails: Vec<&str> =
            request.passengers.iter().map(|passenger| passenger.email.as_str()).collect();
        emails.sort_unstable();

        let confirmation_code =
            derive_confirmation_code(&format!("{}|{}", request.offer_id.0, emails.join(",")));

        Ok(SupplierConfirmation {
            supplier_order_ref: Some(format!("SBX-{confirmation_code}")),
            confirmation_code,
            source: ConfirmationSource::Supplier,
        })
    }

    async fn cancel(
        &self,
        _offer_id: &OfferId,
        _supplier_order_ref: &str,
    ) -> Result<CancelOutcome, SupplierError> {
        Ok(CancelOutcome { cancelled: true, refund_amount: None })
    }
}

fn base_fare(origin: &str, destination: &str) -> Decimal {
    match classify_lane(origin, destination) {
        TradeLane::Domestic => Decimal::new(4_200_00, 2),
        TradeLane::International => Decimal::new(28_500_00, 2),
    }
}

fn carrier_for(index: usize) -> String {
    const CARRIERS: [&str; 3] = ["6E", "AI", "UK"];
    CARRIERS[index % CARRIERS.len()].to_string()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use tripdesk_core::{CabinClass, DataSource, OfferId, Passenger};

    use super::SandboxBackend;
    use crate::error::SupplierError;
    use crate::gateway::{BookingRequest, SearchCriteria, SupplierBackend};

    fn criteria(cabin: Option<CabinClass>) -> SearchCriteria {
        SearchCriteria {
            origin: "DEL".to_string(),
            destination: "BLR".to_string(),
            depart_date: NaiveDate::from_ymd_opt(2025, 4, 18).expect("valid date"),
            cabin,
            passengers: 1,
        }
    }

    fn passenger(email: &str) -> Passenger {
        Passenger {
            first_name: "Asha".to_string(),
            last_name: "Iyer".to_string(),
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn search_is_deterministic_for_the_same_criteria() {
        let backend = SandboxBackend::new();

        let first = backend.search(&criteria(None)).await.expect("first search");
        let second = backend.search(&criteria(None)).await.expect("second search");

        assert_eq!(first.len(), 3);
        let first_ids: Vec<_> = first.iter().map(|offer| offer.id.0.clone()).collect();
        let second_ids: Vec<_> = second.iter().map(|offer| offer.id.0.clone()).collect();
        assert_eq!(first_ids, second_ids);
        assert!(first_ids.iter().all(|id| id.starts_with("sbx:OF-")));
        assert!(first.iter().all(|offer| offer.data_source == DataSource::Sample));
        assert_eq!(first[0].price, second[0].price);
    }

    #[tokio::test]
    async fn search_respects_the_cabin_filter() {
        let backend = SandboxBackend::new();

        let offers =
            backend.search(&criteria(Some(CabinClass::Business))).await.expect("search");

        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].cabin, CabinClass::Business);
        assert!(offers[0].refundable);
    }

    #[tokio::test]
    async fn booking_codes_are_stable_for_the_same_request() {
        let backend = SandboxBackend::new();
        let request = BookingRequest {
            offer_id: OfferId("sbx:OF-ABC234".to_string()),
            passengers: vec![passenger("asha@example.com")],
            contact_email: "asha@example.com".to_string(),
        };

        let first = backend.book(&request).await.expect("first booking");
        let second = backend.book(&request).await.expect("second booking");

        assert_eq!(first.confirmation_code, second.confirmation_code);
        assert_eq!(first.confirmation_code.len(), 6);
        assert_eq!(
            first.supplier_order_ref.as_deref(),
            Some(format!("SBX-{}", first.confirmation_code).as_str())
        );
    }

    #[tokio::test]
    async fn gone_marker_simulates_released_inventory() {
        let backend = SandboxBackend::new();
        let request = BookingRequest {
            offer_id: OfferId("sbx:OF-GONE".to_string()),
            passengers: vec![passenger("asha@example.com")],
            contact_email: "asha@example.com".to_string(),
        };

        let error = backend.book(&request).await.expect_err("gone marker should fail");
        assert!(matches!(error, SupplierError::OfferGone { .. }));
        assert_eq!(error.status(), 410);
    }

    #[tokio::test]
    async fn booking_requires_at_least_one_passenger() {
        let backend = SandboxBackend::new();
        let request = BookingRequest {
            offer_id: OfferId("sbx:OF-ABC234".to_string()),
            passengers: Vec::new(),
            contact_email: "asha@example.com".to_string(),
        };

        let error = backend.book(&request).await.expect_err("empty passengers should fail");
        assert!(matches!(error, SupplierError::Rejected { status: 422, .. }));
    }
}
