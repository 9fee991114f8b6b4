use tutorhub_core::{coerce, BrandId, DomainResult, Entity};

use crate::status::RecordStatus;

/// Brand under which courses are sold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    pub status: RecordStatus,
}

impl Entity for Brand {
    type Id = BrandId;
    const KIND: &'static str = "brand";

    fn id(&self) -> BrandId {
        self.id
    }
}

/// Validated brand input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandDraft {
    pub name: String,
}

impl BrandDraft {
    pub fn new(name: &str) -> DomainResult<Self> {
        Ok(Self {
            name: coerce::required_text("name", name)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brand_name_is_trimmed_and_required() {
        assert_eq!(BrandDraft::new(" Bright Minds ").unwrap().name, "Bright Minds");
        assert!(BrandDraft::new("").is_err());
    }
}
