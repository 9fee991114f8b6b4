//! Strongly-typed identifiers used across the domain.
//!
//! Identifiers are store-assigned positive integers.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of an authenticated user (actor identity).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(i64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoachId(i64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrandId(i64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassificationId(i64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeId(i64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractId(i64);

macro_rules! impl_int_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            pub const fn get(&self) -> i64 {
                self.0
            }

            /// Accept only store-assignable (positive) identifiers.
            pub fn positive(raw: i64) -> Option<Self> {
                (raw > 0).then_some(Self(raw))
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<i64>()
                    .ok()
                    .and_then(Self::positive)
                    .ok_or_else(|| DomainError::uncoercible($name, format!("'{s}' is not a valid id")))
            }
        }
    };
}

impl_int_newtype!(UserId, "user_id");
impl_int_newtype!(StudentId, "student_id");
impl_int_newtype!(CoachId, "coach_id");
impl_int_newtype!(BrandId, "brand_id");
impl_int_newtype!(ClassificationId, "classification_id");
impl_int_newtype!(AttributeId, "attribute_id");
impl_int_newtype!(ContractId, "contract_id");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_ids_only() {
        assert_eq!("42".parse::<StudentId>().unwrap(), StudentId::new(42));
        assert_eq!(" 7 ".parse::<CoachId>().unwrap().get(), 7);
        assert!("0".parse::<StudentId>().is_err());
        assert!("-3".parse::<ContractId>().is_err());
        assert!("abc".parse::<ClassificationId>().is_err());
    }

    #[test]
    fn serializes_transparently() {
        let json = serde_json::to_string(&ClassificationId::new(5)).unwrap();
        assert_eq!(json, "5");
    }
}
