//! Supplier gateway - uniform access to flight-supply backends
//!
//! This crate fronts every external source of bookable flight inventory:
//! - **Routing** (`gateway`) - offer id prefixes (`ah:`, `sbx:`) map to a
//!   fixed allow-list of backends; anything else takes a manual
//!   confirmation path with no supplier call
//! - **Live backend** (`http`) - the Aerohub REST API with a shared token
//!   cache, bounded retries and error normalization
//! - **Sandbox backend** (`sandbox`) - deterministic in-process inventory
//!   for seeds and tests
//! - **Tokens** (`token`) - process-wide cached access token, refreshed 60
//!   seconds before expiry, force-invalidated once on a 401
//!
//! # Key Types
//!
//! - `SupplierGateway` - the seam the orchestrator books through
//! - `SupplierRouter` - production gateway over the backend allow-list
//! - `SupplierError` - normalized failure with an HTTP-like status view

pub mod codes;
pub mod error;
pub mod gateway;
pub mod http;
pub mod sandbox;
pub mod token;

pub use codes::{derive_confirmation_code, generate_confirmation_code};
pub use error::SupplierError;
pub use gateway::{
    BookingRequest, CancelOutcome, ConfirmationSource, SearchCriteria, SupplierBackend,
    SupplierConfirmation, SupplierGateway, SupplierRouter, AEROHUB_PREFIX, SANDBOX_PREFIX,
};
pub use http::{AerohubBackend, RetryPolicy};
pub use sandbox::SandboxBackend;
pub use token::{AccessToken, TokenCache, TokenSource};
