//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects carry no identity and are compared by their attribute values:
/// a classification scope or a student/coach pair is defined entirely by what
/// it contains.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Pair { left: i64, right: i64 }
///
/// impl ValueObject for Pair {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
