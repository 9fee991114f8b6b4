use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tutorhub_core::{
    coerce, Aggregate, AggregateRoot, ContractId, DomainError, DomainResult, Entity, StudentId,
    UserId,
};

/// Contract status lifecycle.
///
/// `Approved` is reached through an approval process outside this module;
/// `Revoked` and `Terminated` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    PendingReview,
    Approved,
    Revoked,
    Terminated,
}

impl ContractStatus {
    pub const ALL: [ContractStatus; 4] = [
        ContractStatus::PendingReview,
        ContractStatus::Approved,
        ContractStatus::Revoked,
        ContractStatus::Terminated,
    ];

    pub fn code(self) -> i16 {
        match self {
            ContractStatus::PendingReview => 0,
            ContractStatus::Approved => 50,
            ContractStatus::Revoked => 98,
            ContractStatus::Terminated => 99,
        }
    }

    pub fn from_code(code: i64) -> DomainResult<Self> {
        Self::ALL
            .into_iter()
            .find(|s| i64::from(s.code()) == code)
            .ok_or_else(|| DomainError::validation(format!("unknown contract status {code}")))
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ContractStatus::Revoked | ContractStatus::Terminated)
    }
}

/// Whether the contract is a first sale or a renewal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractType {
    Initial,
    Renewal,
}

impl ContractType {
    pub fn code(self) -> i16 {
        match self {
            ContractType::Initial => 0,
            ContractType::Renewal => 1,
        }
    }

    pub fn from_code(code: i64) -> DomainResult<Self> {
        match code {
            0 => Ok(ContractType::Initial),
            1 => Ok(ContractType::Renewal),
            other => Err(DomainError::validation(format!(
                "type must be 0 (initial) or 1 (renewal), got {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureForm {
    Online,
    Offline,
}

impl SignatureForm {
    pub fn code(self) -> i16 {
        match self {
            SignatureForm::Online => 0,
            SignatureForm::Offline => 1,
        }
    }

    pub fn from_code(code: i64) -> DomainResult<Self> {
        match code {
            0 => Ok(SignatureForm::Online),
            1 => Ok(SignatureForm::Offline),
            other => Err(DomainError::validation(format!(
                "signature_form must be 0 (online) or 1 (offline), got {other}"
            ))),
        }
    }
}

/// Aggregate root: Contract.
///
/// Rehydrated from its stored record; transitions are decided by `handle` and
/// applied by `apply`, after which the caller persists the evolved record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub name: String,
    pub student_id: StudentId,
    pub contract_type: ContractType,
    pub signature_form: SignatureForm,
    /// Amount in minor currency units.
    pub amount: i64,
    pub signatory: Option<String>,
    pub initiating_party: Option<String>,
    pub initiator: UserId,
    pub status: ContractStatus,
    /// Owned by billing; starts at 0 and is never changed here.
    pub payment_status: i16,
    pub termination_agreement: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    /// Materialize a freshly inserted draft under its store-assigned id.
    pub fn from_draft(id: ContractId, draft: ContractDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name,
            student_id: draft.student_id,
            contract_type: draft.contract_type,
            signature_form: draft.signature_form,
            amount: draft.amount,
            signatory: draft.signatory,
            initiating_party: draft.initiating_party,
            initiator: draft.initiator,
            status: ContractStatus::PendingReview,
            payment_status: 0,
            termination_agreement: None,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn status(&self) -> ContractStatus {
        self.status
    }
}

impl Entity for Contract {
    type Id = ContractId;
    const KIND: &'static str = "contract";

    fn id(&self) -> ContractId {
        self.id
    }
}

impl AggregateRoot for Contract {}

/// Raw creation input, already numerically coerced at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewContract {
    pub name: String,
    pub student_id: Option<i64>,
    pub contract_type: Option<i64>,
    pub signature_form: Option<i64>,
    pub amount: Option<i64>,
    pub signatory: Option<String>,
    pub initiating_party: Option<String>,
}

/// Validated contract awaiting insertion (status is implicitly pending review).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractDraft {
    pub name: String,
    pub student_id: StudentId,
    pub contract_type: ContractType,
    pub signature_form: SignatureForm,
    pub amount: i64,
    pub signatory: Option<String>,
    pub initiating_party: Option<String>,
    pub initiator: UserId,
}

impl ContractDraft {
    /// Validate creation input. The initiator comes from the authenticated
    /// caller, never from the payload.
    pub fn new(input: NewContract, initiator: UserId) -> DomainResult<Self> {
        let name = coerce::required_text("name", &input.name)?;
        let student_id = input
            .student_id
            .and_then(StudentId::positive)
            .ok_or_else(|| DomainError::validation("student_id is required"))?;
        let contract_type = ContractType::from_code(
            input
                .contract_type
                .ok_or_else(|| DomainError::validation("type is required"))?,
        )?;
        let signature_form = SignatureForm::from_code(
            input
                .signature_form
                .ok_or_else(|| DomainError::validation("signature_form is required"))?,
        )?;
        let amount = match input.amount {
            Some(amount) if amount != 0 => amount,
            _ => return Err(DomainError::validation("amount must be non-zero")),
        };

        Ok(Self {
            name,
            student_id,
            contract_type,
            signature_form,
            amount,
            signatory: coerce::optional_text(input.signatory.as_deref()),
            initiating_party: coerce::optional_text(input.initiating_party.as_deref()),
            initiator,
        })
    }
}

/// Command: RevokeContract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokeContract {
    pub contract_id: ContractId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: TerminateContract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminateContract {
    pub contract_id: ContractId,
    /// Reference to the signed termination agreement (document id/URL).
    pub termination_agreement: String,
    pub occurred_at: DateTime<Utc>,
}

impl TerminateContract {
    /// Input check that needs no contract state; runs before any lookup.
    pub fn check_reference(&self) -> DomainResult<&str> {
        let agreement = self.termination_agreement.trim();
        if agreement.is_empty() {
            return Err(DomainError::validation(
                "termination_agreement is required to terminate a contract",
            ));
        }
        Ok(agreement)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractCommand {
    Revoke(RevokeContract),
    Terminate(TerminateContract),
}

/// Event: ContractRevoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRevoked {
    pub contract_id: ContractId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ContractTerminated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractTerminated {
    pub contract_id: ContractId,
    pub termination_agreement: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractEvent {
    Revoked(ContractRevoked),
    Terminated(ContractTerminated),
}

impl ContractEvent {
    /// Status the contract must hold for this event to be persisted.
    pub fn expected_status(&self) -> ContractStatus {
        match self {
            ContractEvent::Revoked(_) => ContractStatus::PendingReview,
            ContractEvent::Terminated(_) => ContractStatus::Approved,
        }
    }
}

impl Aggregate for Contract {
    type Command = ContractCommand;
    type Event = ContractEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ContractEvent::Revoked(e) => {
                self.status = ContractStatus::Revoked;
                self.updated_at = e.occurred_at;
            }
            ContractEvent::Terminated(e) => {
                self.status = ContractStatus::Terminated;
                self.termination_agreement = Some(e.termination_agreement.clone());
                self.updated_at = e.occurred_at;
            }
        }
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ContractCommand::Revoke(cmd) => self.handle_revoke(cmd),
            ContractCommand::Terminate(cmd) => self.handle_terminate(cmd),
        }
    }
}

impl Contract {
    fn ensure_contract_id(&self, contract_id: ContractId) -> Result<(), DomainError> {
        if self.id != contract_id {
            return Err(DomainError::constraint("contract_id mismatch"));
        }
        Ok(())
    }

    fn handle_revoke(&self, cmd: &RevokeContract) -> Result<Vec<ContractEvent>, DomainError> {
        self.ensure_contract_id(cmd.contract_id)?;

        if self.status != ContractStatus::PendingReview {
            return Err(not_pending(self.status));
        }

        Ok(vec![ContractEvent::Revoked(ContractRevoked {
            contract_id: cmd.contract_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_terminate(&self, cmd: &TerminateContract) -> Result<Vec<ContractEvent>, DomainError> {
        self.ensure_contract_id(cmd.contract_id)?;

        let agreement = cmd.check_reference()?;

        if self.status != ContractStatus::Approved {
            return Err(not_approved(self.status));
        }

        Ok(vec![ContractEvent::Terminated(ContractTerminated {
            contract_id: cmd.contract_id,
            termination_agreement: agreement.to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

/// Precondition failure for `Revoke`.
pub fn not_pending(current: ContractStatus) -> DomainError {
    DomainError::constraint(format!(
        "contract is not pending review (current status: {})",
        current.code()
    ))
}

/// Precondition failure for `Terminate`.
pub fn not_approved(current: ContractStatus) -> DomainError {
    DomainError::constraint(format!(
        "contract is not approved (current status: {})",
        current.code()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn valid_input() -> NewContract {
        NewContract {
            name: "Spring term".to_string(),
            student_id: Some(7),
            contract_type: Some(0),
            signature_form: Some(1),
            amount: Some(120_000),
            signatory: Some("  Parent  ".to_string()),
            initiating_party: None,
        }
    }

    fn contract_in(status: ContractStatus) -> Contract {
        let draft = ContractDraft::new(valid_input(), UserId::new(1)).unwrap();
        let mut contract = Contract::from_draft(ContractId::new(10), draft, test_time());
        contract.status = status;
        contract
    }

    fn revoke(id: i64) -> ContractCommand {
        ContractCommand::Revoke(RevokeContract {
            contract_id: ContractId::new(id),
            occurred_at: test_time(),
        })
    }

    fn terminate(id: i64, agreement: &str) -> ContractCommand {
        ContractCommand::Terminate(TerminateContract {
            contract_id: ContractId::new(id),
            termination_agreement: agreement.to_string(),
            occurred_at: test_time(),
        })
    }

    #[test]
    fn status_codes_match_storage_values() {
        assert_eq!(ContractStatus::PendingReview.code(), 0);
        assert_eq!(ContractStatus::Approved.code(), 50);
        assert_eq!(ContractStatus::Revoked.code(), 98);
        assert_eq!(ContractStatus::Terminated.code(), 99);
        assert_eq!(ContractStatus::from_code(50).unwrap(), ContractStatus::Approved);
        assert!(ContractStatus::from_code(1).is_err());
    }

    #[test]
    fn new_contract_starts_pending_and_unpaid() {
        let draft = ContractDraft::new(valid_input(), UserId::new(3)).unwrap();
        assert_eq!(draft.signatory.as_deref(), Some("Parent"));
        assert_eq!(draft.initiator, UserId::new(3));

        let contract = Contract::from_draft(ContractId::new(1), draft, test_time());
        assert_eq!(contract.status(), ContractStatus::PendingReview);
        assert_eq!(contract.payment_status, 0);
        assert_eq!(contract.termination_agreement, None);
    }

    #[test]
    fn draft_rejects_missing_or_invalid_fields() {
        let cases: Vec<Box<dyn Fn(&mut NewContract)>> = vec![
            Box::new(|c| c.name = " ".to_string()),
            Box::new(|c| c.student_id = None),
            Box::new(|c| c.student_id = Some(0)),
            Box::new(|c| c.contract_type = Some(2)),
            Box::new(|c| c.contract_type = None),
            Box::new(|c| c.signature_form = Some(5)),
            Box::new(|c| c.amount = Some(0)),
            Box::new(|c| c.amount = None),
        ];
        for mutate in cases {
            let mut input = valid_input();
            mutate(&mut input);
            let err = ContractDraft::new(input, UserId::new(1)).unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)), "got {err:?}");
        }
    }

    #[test]
    fn revoke_from_pending_emits_revoked_and_changes_only_status() {
        let mut contract = contract_in(ContractStatus::PendingReview);
        let before = contract.clone();

        let events = contract.execute(&revoke(10)).unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ContractEvent::Revoked(_)));
        assert_eq!(contract.status(), ContractStatus::Revoked);
        assert_eq!(contract.termination_agreement, before.termination_agreement);
        assert_eq!(contract.amount, before.amount);
        assert_eq!(contract.name, before.name);
    }

    #[test]
    fn second_revoke_fails_not_pending() {
        let mut contract = contract_in(ContractStatus::PendingReview);
        contract.execute(&revoke(10)).unwrap();

        let err = contract.handle(&revoke(10)).unwrap_err();
        assert_eq!(err, not_pending(ContractStatus::Revoked));
    }

    #[test]
    fn terminate_requires_agreement_before_status_check() {
        let pending = contract_in(ContractStatus::PendingReview);
        let err = pending.handle(&terminate(10, "   ")).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let approved = contract_in(ContractStatus::Approved);
        let err = approved.handle(&terminate(10, "")).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn terminate_from_approved_stores_agreement() {
        let mut contract = contract_in(ContractStatus::Approved);
        let events = contract.execute(&terminate(10, " doc-2024-001 ")).unwrap();

        match &events[0] {
            ContractEvent::Terminated(e) => assert_eq!(e.termination_agreement, "doc-2024-001"),
            other => panic!("Expected Terminated event, got {other:?}"),
        }
        assert_eq!(contract.status(), ContractStatus::Terminated);
        assert_eq!(contract.termination_agreement.as_deref(), Some("doc-2024-001"));

        let err = contract.handle(&terminate(10, "doc-2024-001")).unwrap_err();
        assert_eq!(err, not_approved(ContractStatus::Terminated));
    }

    #[test]
    fn mismatched_contract_id_is_rejected() {
        let contract = contract_in(ContractStatus::PendingReview);
        assert!(contract.handle(&revoke(11)).is_err());
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let contract = contract_in(ContractStatus::PendingReview);
        let before = contract.clone();
        let events1 = contract.handle(&revoke(10)).unwrap();
        let events2 = contract.handle(&revoke(10)).unwrap();
        assert_eq!(contract, before);
        assert_eq!(events1.len(), events2.len());
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn any_status() -> impl Strategy<Value = ContractStatus> {
            proptest::sample::select(ContractStatus::ALL.to_vec())
        }

        proptest! {
            /// Property: Revoke succeeds iff the contract is pending review.
            #[test]
            fn revoke_guarded_by_pending(status in any_status()) {
                let contract = contract_in(status);
                let result = contract.handle(&revoke(10));
                prop_assert_eq!(result.is_ok(), status == ContractStatus::PendingReview);
            }

            /// Property: Terminate succeeds iff approved and a reference is given.
            #[test]
            fn terminate_guarded_by_approved_and_reference(
                status in any_status(),
                agreement in prop_oneof![Just(String::new()), Just("  ".to_string()), "[a-z0-9-]{1,20}"]
            ) {
                let contract = contract_in(status);
                let result = contract.handle(&terminate(10, &agreement));
                let expected = status == ContractStatus::Approved && !agreement.trim().is_empty();
                prop_assert_eq!(result.is_ok(), expected);
            }

            /// Property: terminal states accept no further transition.
            #[test]
            fn terminal_states_are_final(status in any_status(), agreement in "[a-z]{1,10}") {
                prop_assume!(status.is_terminal());
                let contract = contract_in(status);
                prop_assert!(contract.handle(&revoke(10)).is_err());
                prop_assert!(contract.handle(&terminate(10, &agreement)).is_err());
            }
        }
    }
}
