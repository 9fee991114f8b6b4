use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tutorhub_core::{coerce, CoachId, DomainResult, Entity};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coach {
    pub id: CoachId,
    pub name: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Coach {
    type Id = CoachId;
    const KIND: &'static str = "coach";

    fn id(&self) -> CoachId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoachDraft {
    pub name: String,
    pub phone: Option<String>,
}

impl CoachDraft {
    pub fn new(name: &str, phone: Option<&str>) -> DomainResult<Self> {
        Ok(Self {
            name: coerce::required_text("name", name)?,
            phone: coerce::optional_text(phone),
        })
    }
}
