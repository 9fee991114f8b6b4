//! Catalog domain module (classifications, brands, attributes).
//!
//! This crate contains the business rules of the product catalog, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage). Checks
//! that need stored state take that state as arguments.

pub mod attribute;
pub mod brand;
pub mod classification;
pub mod status;

pub use attribute::{normalize_values, Attribute, AttributeDraft};
pub use brand::{Brand, BrandDraft};
pub use classification::{
    Classification, ClassificationDraft, ClassificationLevel, ClassificationScope,
};
pub use status::RecordStatus;
