//! Entities: stored records with a stable numeric identity.

use crate::error::DomainError;

/// A record identified by a typed id that survives every update.
pub trait Entity {
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Lower-case name used in not-found errors and logs.
    const KIND: &'static str;

    fn id(&self) -> Self::Id;

    /// The error reported when no record of this kind exists.
    fn missing() -> DomainError {
        DomainError::not_found(Self::KIND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::StudentId;

    struct Probe(StudentId);

    impl Entity for Probe {
        type Id = StudentId;
        const KIND: &'static str = "probe";

        fn id(&self) -> StudentId {
            self.0
        }
    }

    #[test]
    fn missing_names_the_kind() {
        assert_eq!(Probe::missing(), DomainError::NotFound("probe"));
        assert_eq!(Probe(StudentId::new(3)).id(), StudentId::new(3));
    }
}
