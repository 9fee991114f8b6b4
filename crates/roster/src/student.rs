use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tutorhub_core::{coerce, DomainResult, Entity, StudentId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Student {
    type Id = StudentId;
    const KIND: &'static str = "student";

    fn id(&self) -> StudentId {
        self.id
    }
}

/// Validated student create/update input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentDraft {
    pub name: String,
    pub phone: Option<String>,
}

impl StudentDraft {
    pub fn new(name: &str, phone: Option<&str>) -> DomainResult<Self> {
        Ok(Self {
            name: coerce::required_text("name", name)?,
            phone: coerce::optional_text(phone),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn student_draft_trims_fields() {
        let draft = StudentDraft::new(" Mia ", Some("  ")).unwrap();
        assert_eq!(draft.name, "Mia");
        assert_eq!(draft.phone, None);
        assert!(StudentDraft::new("", None).is_err());
    }
}
