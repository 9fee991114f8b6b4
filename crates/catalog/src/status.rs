use serde::{Deserialize, Serialize};

use tutorhub_core::{DomainError, DomainResult};

/// Active/disabled switch shared by catalog records.
///
/// Wire and storage code: `0 = active`, `1 = disabled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Active,
    Disabled,
}

impl RecordStatus {
    pub fn code(self) -> i16 {
        match self {
            RecordStatus::Active => 0,
            RecordStatus::Disabled => 1,
        }
    }

    pub fn from_code(code: i64) -> DomainResult<Self> {
        match code {
            0 => Ok(RecordStatus::Active),
            1 => Ok(RecordStatus::Disabled),
            other => Err(DomainError::validation(format!(
                "status must be 0 (active) or 1 (disabled), got {other}"
            ))),
        }
    }

    pub fn is_active(self) -> bool {
        self == RecordStatus::Active
    }
}
