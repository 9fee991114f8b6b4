//! `tutorhub-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model, aggregate/entity traits and the
//! boundary coercion of loosely-typed numerics.

pub mod aggregate;
pub mod coerce;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{
    AttributeId, BrandId, ClassificationId, CoachId, ContractId, StudentId, UserId,
};
pub use value_object::ValueObject;
