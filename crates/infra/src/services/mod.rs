//! Application services (the managers).
//!
//! A service owns one consistency boundary: it validates drafts against the
//! stored state, decides, and persists through the store traits. Domain rules
//! live in the pure crates; this layer only sequences reads, checks and writes.
//!
//! ```text
//! wire input
//!   ↓  coercion + draft validation (pure)
//! service
//!   ↓  existence / linkage / uniqueness checks (store reads)
//!   ↓  single write (or one store-level atomic unit)
//! store
//! ```
//!
//! Services are generic over `S: ?Sized` so they can run over a concrete
//! store in tests and over `dyn Store` in the API.

use thiserror::Error;

use tutorhub_core::DomainError;

use crate::store::StoreError;

pub mod catalog;
pub mod classifications;
pub mod contracts;
pub mod roster;
pub mod uniqueness;

pub use catalog::{AttributeService, BrandService};
pub use classifications::ClassificationService;
pub use contracts::ContractService;
pub use roster::RosterService;
pub use uniqueness::is_name_unique;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Deterministic rule failure; safe to report to the caller.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The store failed while `context` was running. Never retried here.
    #[error("{context} failed: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Attach the running operation to a store failure.
pub(crate) trait StoreContext<T> {
    fn context(self, context: &'static str) -> ServiceResult<T>;
}

impl<T> StoreContext<T> for Result<T, StoreError> {
    fn context(self, context: &'static str) -> ServiceResult<T> {
        self.map_err(|source| ServiceError::Store { context, source })
    }
}
