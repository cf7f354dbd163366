use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use tripdesk_core::{calculate_price, CabinClass, Offer, OfferId, Passenger, PricingRule};

use crate::codes::generate_confirmation_code;
use crate::error::SupplierError;

/// Offer id prefix of the live Aerohub backend.
pub const AEROHUB_PREFIX: &str = "ah";
/// Offer id prefix of the deterministic in-process sandbox backend.
pub const SANDBOX_PREFIX: &str = "sbx";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub origin: String,
    pub destination: String,
    pub depart_date: NaiveDate,
    pub cabin: Option<CabinClass>,
    pub passengers: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BookingRequest {
    pub offer_id: OfferId,
    pub passengers: Vec<Passenger>,
    pub contact_email: String,
}

/// Where a confirmation code came from. Manual confirmations carry no
/// supplier order reference and must stay recognizable downstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationSource {
    Supplier,
    Manual,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierConfirmation {
    pub confirmation_code: String,
    pub supplier_order_ref: Option<String>,
    pub source: ConfirmationSource,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CancelOutcome {
    pub cancelled: bool,
    pub refund_amount: Option<Decimal>,
}

/// A single flight-supply backend behind the router.
#[async_trait]
pub trait SupplierBackend: Send + Sync {
    /// The offer id namespace this backend serves.
    fn prefix(&self) -> &'static str;

    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Offer>, SupplierError>;

    async fn book(&self, request: &BookingRequest) -> Result<SupplierConfirmation, SupplierError>;

    async fn cancel(
        &self,
        offer_id: &OfferId,
        supplier_order_ref: &str,
    ) -> Result<CancelOutcome, SupplierError>;
}

/// The gateway seam the orchestrator talks through. Production wiring uses
/// [`SupplierRouter`]; tests script this trait directly.
#[async_trait]
pub trait SupplierGateway: Send + Sync {
    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Offer>, SupplierError>;

    async fn book(&self, request: &BookingRequest) -> Result<SupplierConfirmation, SupplierError>;

    async fn cancel(
        &self,
        offer_id: &OfferId,
        supplier_order_ref: &str,
    ) -> Result<CancelOutcome, SupplierError>;
}

/// Routes by offer id prefix to a fixed allow-list of backends. Any other
/// prefix (or none at all) falls through to a manual confirmation: a
/// synthetically generated code, no supplier call, no order reference.
///
/// Search results come back customer-priced: the configured pricing rule is
/// applied to each backend's raw supplier cost before offers leave the
/// router.
pub struct SupplierRouter {
    aerohub: Option<Arc<dyn SupplierBackend>>,
    sandbox: Option<Arc<dyn SupplierBackend>>,
    pricing: PricingRule,
}

impl SupplierRouter {
    pub fn new(pricing: PricingRule) -> Self {
        Self { aerohub: None, sandbox: None, pricing }
    }

    pub fn with_backend(mut self, backend: Arc<dyn SupplierBackend>) -> Self {
        match backend.prefix() {
            AEROHUB_PREFIX => self.aerohub = Some(backend),
            SANDBOX_PREFIX => self.sandbox = Some(backend),
            other => warn!(prefix = other, "ignoring backend with unrecognized prefix"),
        }
        self
    }

    fn backend_for(&self, offer_id: &OfferId) -> Option<&Arc<dyn SupplierBackend>> {
        match offer_id.namespace() {
            Some(AEROHUB_PREFIX) => self.aerohub.as_ref(),
            Some(SANDBOX_PREFIX) => self.sandbox.as_ref(),
            _ => None,
        }
    }

    fn price_offer(&self, mut offer: Offer) -> Offer {
        let breakdown = calculate_price(offer.price, &self.pricing);
        offer.price = breakdown.customer_total;
        offer
    }
}

#[async_trait]
impl SupplierGateway for SupplierRouter {
    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Offer>, SupplierError> {
        let mut offers = Vec::new();
        let mut last_error = None;

        for backend in [self.aerohub.as_ref(), self.sandbox.as_ref()].into_iter().flatten() {
            match backend.search(criteria).await {
                Ok(found) => {
                    offers.extend(found.into_iter().map(|offer| self.price_offer(offer)));
                }
                Err(error) => {
                    warn!(
                        prefix = backend.prefix(),
                        error = %error,
                        "backend search failed; continuing with remaining backends"
                    );
                    last_error = Some(error);
                }
            }
        }

        if offers.is_empty() {
            if let Some(error) = last_error {
                return Err(error);
            }
        }

        Ok(offers)
    }

    async fn book(&self, request: &BookingRequest) -> Result<SupplierConfirmation, SupplierError> {
        match self.backend_for(&request.offer_id) {
            Some(backend) => backend.book(request).await,
            None => {
                let confirmation_code = generate_confirmation_code();
                warn!(
                    event_name = "supplier.manual_confirmation",
                    offer_id = %request.offer_id.0,
                    confirmation_code = %confirmation_code,
                    "no backend serves this offer prefix; issuing manual confirmation"
                );
                Ok(SupplierConfirmation {
                    confirmation_code,
                    supplier_order_ref: None,
                    source: ConfirmationSource::Manual,
                })
            }
        }
    }

    async fn cancel(
        &self,
        offer_id: &OfferId,
        supplier_order_ref: &str,
    ) -> Result<CancelOutcome, SupplierError> {
        match self.backend_for(offer_id) {
            Some(backend) => backend.cancel(offer_id, supplier_order_ref).await,
            None => {
                info!(
                    offer_id = %offer_id.0,
                    "no backend serves this offer prefix; nothing to cancel upstream"
                );
                Ok(CancelOutcome { cancelled: true, refund_amount: None })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use tokio::sync::Mutex;

    use tripdesk_core::{CabinClass, DataSource, Offer, OfferId, PricingRule, DEFAULT_CURRENCY};

    use super::{
        BookingRequest, CancelOutcome, ConfirmationSource, SearchCriteria, SupplierBackend,
        SupplierConfirmation, SupplierGateway, SupplierRouter, AEROHUB_PREFIX,
    };
    use crate::error::SupplierError;

    struct ScriptedBackend {
        prefix: &'static str,
        state: Mutex<ScriptedState>,
    }

    #[derive(Default)]
    struct ScriptedState {
        search_results: VecDeque<Result<Vec<Offer>, SupplierError>>,
        book_results: VecDeque<Result<SupplierConfirmation, SupplierError>>,
        book_calls: usize,
    }

    impl ScriptedBackend {
        fn new(prefix: &'static str) -> Self {
            Self { prefix, state: Mutex::new(ScriptedState::default()) }
        }

        async fn push_search(&self, result: Result<Vec<Offer>, SupplierError>) {
            self.state.lock().await.search_results.push_back(result);
        }

        async fn push_book(&self, result: Result<SupplierConfirmation, SupplierError>) {
            self.state.lock().await.book_results.push_back(result);
        }

        async fn book_calls(&self) -> usize {
            self.state.lock().await.book_calls
        }
    }

    #[async_trait]
    impl SupplierBackend for ScriptedBackend {
        fn prefix(&self) -> &'static str {
            self.prefix
        }

        async fn search(&self, _criteria: &SearchCriteria) -> Result<Vec<Offer>, SupplierError> {
            self.state.lock().await.search_results.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn book(
            &self,
            _request: &BookingRequest,
        ) -> Result<SupplierConfirmation, SupplierError> {
            let mut state = self.state.lock().await;
            state.book_calls += 1;
            state.book_results.pop_front().unwrap_or_else(|| {
                Err(SupplierError::Upstream { status: 500, detail: "script exhausted".into() })
            })
        }

        async fn cancel(
            &self,
            _offer_id: &OfferId,
            _supplier_order_ref: &str,
        ) -> Result<CancelOutcome, SupplierError> {
            Ok(CancelOutcome { cancelled: true, refund_amount: Some(Decimal::new(1_000_00, 2)) })
        }
    }

    fn raw_offer(id: &str, supplier_cost: Decimal) -> Offer {
        Offer {
            id: OfferId(id.to_string()),
            carrier: "6E".to_string(),
            origin: "DEL".to_string(),
            destination: "BLR".to_string(),
            departs_at: Utc::now() + Duration::days(14),
            cabin: CabinClass::Economy,
            stops: 0,
            refundable: true,
            price: supplier_cost,
            currency: DEFAULT_CURRENCY.to_string(),
            expires_at: Utc::now() + Duration::minutes(30),
            data_source: DataSource::Api,
        }
    }

    fn criteria() -> SearchCriteria {
        SearchCriteria {
            origin: "DEL".to_string(),
            destination: "BLR".to_string(),
            depart_date: (Utc::now() + Duration::days(14)).date_naive(),
            cabin: None,
            passengers: 1,
        }
    }

    fn booking_request(offer_id: &str) -> BookingRequest {
        BookingRequest {
            offer_id: OfferId(offer_id.to_string()),
            passengers: vec![tripdesk_core::Passenger {
                first_name: "Asha".to_string(),
                last_name: "Iyer".to_string(),
                email: "asha@example.com".to_string(),
            }],
            contact_email: "asha@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn book_routes_by_offer_prefix_to_the_matching_backend() {
        let backend = Arc::new(ScriptedBackend::new(AEROHUB_PREFIX));
        backend
            .push_book(Ok(SupplierConfirmation {
                confirmation_code: "X1Y2Z3".to_string(),
                supplier_order_ref: Some("ORD-77".to_string()),
                source: ConfirmationSource::Supplier,
            }))
            .await;

        let router = SupplierRouter::new(PricingRule::default()).with_backend(backend.clone());
        let confirmation =
            router.book(&booking_request("ah:OF-31877")).await.expect("booking should route");

        assert_eq!(confirmation.supplier_order_ref.as_deref(), Some("ORD-77"));
        assert_eq!(confirmation.source, ConfirmationSource::Supplier);
        assert_eq!(backend.book_calls().await, 1);
    }

    #[tokio::test]
    async fn unmapped_prefix_takes_the_manual_path_without_a_supplier_call() {
        let backend = Arc::new(ScriptedBackend::new(AEROHUB_PREFIX));
        let router = SupplierRouter::new(PricingRule::default()).with_backend(backend.clone());

        let confirmation = router
            .book(&booking_request("legacy:OF-9"))
            .await
            .expect("manual path should succeed");

        assert_eq!(confirmation.source, ConfirmationSource::Manual);
        assert!(confirmation.supplier_order_ref.is_none());
        assert_eq!(confirmation.confirmation_code.len(), 6);
        assert_eq!(backend.book_calls().await, 0);
    }

    #[tokio::test]
    async fn search_returns_customer_priced_offers() {
        let backend = Arc::new(ScriptedBackend::new(AEROHUB_PREFIX));
        backend
            .push_search(Ok(vec![raw_offer("ah:OF-31877", Decimal::new(4_501_11, 2))]))
            .await;

        let router = SupplierRouter::new(PricingRule::default()).with_backend(backend);
        let offers = router.search(&criteria()).await.expect("search should succeed");

        // 4,501.11 + 157.54 markup + 67.52 service fee under the default rule.
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].price, Decimal::new(4_726_17, 2));
    }

    #[tokio::test]
    async fn search_failure_with_no_offers_surfaces_the_backend_error() {
        let backend = Arc::new(ScriptedBackend::new(AEROHUB_PREFIX));
        backend.push_search(Err(SupplierError::RateLimited)).await;

        let router = SupplierRouter::new(PricingRule::default()).with_backend(backend);
        let error = router.search(&criteria()).await.expect_err("search should fail");

        assert_eq!(error, SupplierError::RateLimited);
    }

    #[tokio::test]
    async fn cancel_for_unmapped_prefix_succeeds_locally() {
        let router = SupplierRouter::new(PricingRule::default());
        let outcome = router
            .cancel(&OfferId("legacy:OF-9".to_string()), "ORD-NONE")
            .await
            .expect("cancel should succeed");

        assert!(outcome.cancelled);
        assert!(outcome.refund_amount.is_none());
    }
}
