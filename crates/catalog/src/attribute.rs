//! Product attributes and their value sets.
//!
//! The value set is a child collection that is only ever replaced as a whole.

use std::collections::HashSet;

use tutorhub_core::{coerce, AttributeId, DomainError, DomainResult, Entity};

use crate::status::RecordStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub id: AttributeId,
    pub name: String,
    pub status: RecordStatus,
    /// Ordered, duplicate-free values.
    pub values: Vec<String>,
}

impl Entity for Attribute {
    type Id = AttributeId;
    const KIND: &'static str = "attribute";

    fn id(&self) -> AttributeId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDraft {
    pub name: String,
    pub values: Vec<String>,
}

impl AttributeDraft {
    pub fn new<S: AsRef<str>>(name: &str, values: &[S]) -> DomainResult<Self> {
        Ok(Self {
            name: coerce::required_text("name", name)?,
            values: normalize_values(values)?,
        })
    }
}

/// Trim every value, reject blanks, collapse duplicates keeping the first.
pub fn normalize_values<S: AsRef<str>>(values: &[S]) -> DomainResult<Vec<String>> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(values.len());
    for (idx, raw) in values.iter().enumerate() {
        let value = raw.as_ref().trim();
        if value.is_empty() {
            return Err(DomainError::validation(format!(
                "attribute value at position {idx} is empty"
            )));
        }
        if seen.insert(value.to_string()) {
            out.push(value.to_string());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_trimmed_and_deduplicated_in_order() {
        let values = normalize_values(&[" Beginner", "Advanced ", "Beginner", "Intermediate"]).unwrap();
        assert_eq!(values, vec!["Beginner", "Advanced", "Intermediate"]);
    }

    #[test]
    fn blank_value_rejects_the_whole_set() {
        let err = normalize_values(&["Beginner", "  "]).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn empty_set_is_allowed() {
        let draft = AttributeDraft::new::<&str>("Level", &[]).unwrap();
        assert!(draft.values.is_empty());
    }
}
