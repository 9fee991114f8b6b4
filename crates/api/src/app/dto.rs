use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tutorhub_catalog::{Attribute, Brand, Classification, RecordStatus};
use tutorhub_contracts::{Contract, NewContract};
use tutorhub_core::{coerce, DomainResult};
use tutorhub_roster::{Coach, LinkOwner, LinkPlan, Student};

// -------------------------
// Request DTOs
//
// Numeric fields that clients send loosely (number, numeric string, null or
// absent) are kept as raw JSON here and coerced in one place. Text fields are
// optional so that `null` and absence both reach domain validation.
// -------------------------

#[derive(Debug, Deserialize)]
pub struct ClassificationRequest {
    pub name: Option<String>,
    #[serde(default)]
    pub level: Value,
    #[serde(default)]
    pub parent_id: Value,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    #[serde(default)]
    pub status: Value,
}

impl ClassificationRequest {
    pub fn name(&self) -> &str {
        text(&self.name)
    }
}

impl StatusRequest {
    pub fn status(&self) -> DomainResult<RecordStatus> {
        RecordStatus::from_code(coerce::required_int("status", &self.status)?)
    }
}

/// Query string of the classification name probe. `exclude_id=0` means none.
#[derive(Debug, Deserialize)]
pub struct NameCheckQuery {
    #[serde(default)]
    pub name: String,
    pub level: Option<String>,
    pub parent_id: Option<String>,
    pub exclude_id: Option<String>,
}

impl NameCheckQuery {
    pub fn level(&self) -> Value {
        query_value(&self.level)
    }

    pub fn parent_id(&self) -> Value {
        query_value(&self.parent_id)
    }

    pub fn exclude_id(&self) -> DomainResult<Option<i64>> {
        Ok(coerce::optional_int("exclude_id", &query_value(&self.exclude_id))?.filter(|id| *id > 0))
    }
}

fn query_value(raw: &Option<String>) -> Value {
    raw.clone().map(Value::String).unwrap_or(Value::Null)
}

fn text(raw: &Option<String>) -> &str {
    raw.as_deref().unwrap_or_default()
}

#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: Option<String>,
}

impl NameRequest {
    pub fn name(&self) -> &str {
        text(&self.name)
    }
}

#[derive(Debug, Deserialize)]
pub struct AttributeRequest {
    pub name: Option<String>,
    #[serde(default)]
    pub values: Vec<String>,
}

impl AttributeRequest {
    pub fn name(&self) -> &str {
        text(&self.name)
    }
}

#[derive(Debug, Deserialize)]
pub struct ValuesRequest {
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct PersonRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
}

impl PersonRequest {
    pub fn name(&self) -> &str {
        text(&self.name)
    }
}

#[derive(Debug, Deserialize)]
pub struct LinkRequest {
    #[serde(default)]
    pub ids: Value,
}

impl LinkRequest {
    pub fn ids(&self) -> DomainResult<Vec<i64>> {
        coerce::int_list("ids", &self.ids)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateContractRequest {
    pub name: Option<String>,
    #[serde(default)]
    pub student_id: Value,
    #[serde(default, rename = "type")]
    pub contract_type: Value,
    #[serde(default)]
    pub signature_form: Value,
    #[serde(default)]
    pub amount: Value,
    pub signatory: Option<String>,
    pub initiating_party: Option<String>,
}

impl CreateContractRequest {
    pub fn into_new_contract(self) -> DomainResult<NewContract> {
        Ok(NewContract {
            student_id: coerce::optional_int("student_id", &self.student_id)?,
            contract_type: coerce::optional_int("type", &self.contract_type)?,
            signature_form: coerce::optional_int("signature_form", &self.signature_form)?,
            amount: coerce::optional_int("amount", &self.amount)?,
            name: self.name.unwrap_or_default(),
            signatory: self.signatory,
            initiating_party: self.initiating_party,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct TerminateContractRequest {
    pub termination_agreement: Option<String>,
}

impl TerminateContractRequest {
    pub fn termination_agreement(&self) -> &str {
        text(&self.termination_agreement)
    }
}

#[derive(Debug, Deserialize)]
pub struct ContractListQuery {
    pub student_id: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct ClassificationResponse {
    pub id: i64,
    pub name: String,
    pub level: i16,
    pub parent_id: Option<i64>,
    pub status: i16,
}

impl From<Classification> for ClassificationResponse {
    fn from(c: Classification) -> Self {
        Self {
            id: c.id.get(),
            level: c.level().code(),
            parent_id: c.parent_id().map(|p| p.get()),
            status: c.status.code(),
            name: c.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BrandResponse {
    pub id: i64,
    pub name: String,
    pub status: i16,
}

impl From<Brand> for BrandResponse {
    fn from(b: Brand) -> Self {
        Self {
            id: b.id.get(),
            name: b.name,
            status: b.status.code(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AttributeResponse {
    pub id: i64,
    pub name: String,
    pub status: i16,
    pub values: Vec<String>,
}

impl From<Attribute> for AttributeResponse {
    fn from(a: Attribute) -> Self {
        Self {
            id: a.id.get(),
            name: a.name,
            status: a.status.code(),
            values: a.values,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PersonResponse {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Student> for PersonResponse {
    fn from(s: Student) -> Self {
        Self {
            id: s.id.get(),
            name: s.name,
            phone: s.phone,
            created_at: s.created_at,
        }
    }
}

impl From<Coach> for PersonResponse {
    fn from(c: Coach) -> Self {
        Self {
            id: c.id.get(),
            name: c.name,
            phone: c.phone,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub linked: Vec<i64>,
    pub already_linked: Vec<i64>,
    pub missing: Vec<i64>,
}

impl LinkResponse {
    pub fn from_plan(owner: LinkOwner, plan: LinkPlan) -> Self {
        Self {
            linked: plan.to_insert.iter().map(|l| owner.counterpart_of(l)).collect(),
            already_linked: plan.already_linked,
            missing: plan.missing,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub removed: u64,
}

#[derive(Debug, Serialize)]
pub struct NameCheckResponse {
    pub unique: bool,
}

#[derive(Debug, Serialize)]
pub struct ContractResponse {
    pub id: i64,
    pub name: String,
    pub student_id: i64,
    #[serde(rename = "type")]
    pub contract_type: i16,
    pub signature_form: i16,
    pub amount: i64,
    pub signatory: Option<String>,
    pub initiating_party: Option<String>,
    pub initiator: i64,
    pub status: i16,
    pub payment_status: i16,
    pub termination_agreement: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Contract> for ContractResponse {
    fn from(c: Contract) -> Self {
        Self {
            id: c.id.get(),
            name: c.name,
            student_id: c.student_id.get(),
            contract_type: c.contract_type.code(),
            signature_form: c.signature_form.code(),
            amount: c.amount,
            signatory: c.signatory,
            initiating_party: c.initiating_party,
            initiator: c.initiator.get(),
            status: c.status.code(),
            payment_status: c.payment_status,
            termination_agreement: c.termination_agreement,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Items<T> {
    pub items: Vec<T>,
}

impl<T> Items<T> {
    pub fn of<U: Into<T>>(rows: impl IntoIterator<Item = U>) -> Self {
        Self {
            items: rows.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tutorhub_core::DomainError;

    #[test]
    fn contract_request_accepts_loose_numbers() {
        let req: CreateContractRequest = serde_json::from_value(json!({
            "name": "Term",
            "student_id": "12",
            "type": 1,
            "signature_form": "0",
            "amount": 5000.0
        }))
        .unwrap();
        let input = req.into_new_contract().unwrap();
        assert_eq!(input.student_id, Some(12));
        assert_eq!(input.contract_type, Some(1));
        assert_eq!(input.signature_form, Some(0));
        assert_eq!(input.amount, Some(5000));
    }

    #[test]
    fn uncoercible_fields_are_named() {
        let req: CreateContractRequest =
            serde_json::from_value(json!({ "name": "Term", "student_id": [1] })).unwrap();
        let err = req.into_new_contract().unwrap_err();
        assert!(matches!(err, DomainError::Uncoercible { field: "student_id", .. }));
    }

    #[test]
    fn name_check_treats_zero_exclude_as_none() {
        let q = NameCheckQuery {
            name: "Language".into(),
            level: Some("0".into()),
            parent_id: None,
            exclude_id: Some("0".into()),
        };
        assert_eq!(q.exclude_id().unwrap(), None);
        assert_eq!(q.level(), json!("0"));
        assert_eq!(q.parent_id(), Value::Null);
    }

    #[test]
    fn null_text_reads_as_blank() {
        let req: TerminateContractRequest =
            serde_json::from_value(json!({ "termination_agreement": null })).unwrap();
        assert_eq!(req.termination_agreement(), "");

        let req: PersonRequest = serde_json::from_value(json!({ "phone": "555" })).unwrap();
        assert_eq!(req.name(), "");
    }

    #[test]
    fn link_ids_accept_mixed_numbers() {
        let req: LinkRequest = serde_json::from_value(json!({ "ids": [1, "2", 3.0] })).unwrap();
        assert_eq!(req.ids().unwrap(), vec![1, 2, 3]);
    }
}
