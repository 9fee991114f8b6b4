use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use tutorhub_contracts::{
    Contract, ContractCommand, ContractDraft, ContractEvent, NewContract, RevokeContract,
    TerminateContract,
};
use tutorhub_core::{Aggregate, ContractId, DomainError, Entity, StudentId, UserId};
use tutorhub_roster::Student;

use super::{ServiceResult, StoreContext};
use crate::store::{ContractStore, RosterStore};

/// Contract lifecycle manager.
///
/// ```text
/// load contract → handle(command) → apply(events) → compare-and-set save
/// ```
///
/// The save only succeeds if the stored status is still the one the decision
/// was made against. A lost race is re-decided against the fresh row so the
/// caller sees the same precondition error a sequential call would produce.
pub struct ContractService<S: ?Sized> {
    store: Arc<S>,
}

impl<S> ContractService<S>
where
    S: ContractStore + RosterStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, input), fields(initiator = %initiator), err)]
    pub async fn create(&self, input: NewContract, initiator: UserId) -> ServiceResult<Contract> {
        let draft = ContractDraft::new(input, initiator)?;

        if self
            .store
            .get_student(draft.student_id)
            .await
            .context("create contract")?
            .is_none()
        {
            return Err(Student::missing().into());
        }

        let created_at = Utc::now();
        let id = self
            .store
            .insert_contract(&draft, created_at)
            .await
            .context("create contract")?;

        info!(contract_id = %id, student_id = %draft.student_id, "contract created");
        Ok(Contract::from_draft(id, draft, created_at))
    }

    #[instrument(skip(self), fields(contract_id = %id), err)]
    pub async fn revoke(&self, id: ContractId) -> ServiceResult<Contract> {
        let command = ContractCommand::Revoke(RevokeContract {
            contract_id: id,
            occurred_at: Utc::now(),
        });
        self.transition(id, command, "revoke contract").await
    }

    #[instrument(skip(self, termination_agreement), fields(contract_id = %id), err)]
    pub async fn terminate(&self, id: ContractId, termination_agreement: &str) -> ServiceResult<Contract> {
        let command = TerminateContract {
            contract_id: id,
            termination_agreement: termination_agreement.to_string(),
            occurred_at: Utc::now(),
        };
        // The agreement reference is checked before the contract is looked up.
        command.check_reference()?;
        self.transition(id, ContractCommand::Terminate(command), "terminate contract")
            .await
    }

    pub async fn get(&self, id: ContractId) -> ServiceResult<Contract> {
        self.load(id, "get contract").await
    }

    pub async fn list(&self, student: Option<StudentId>) -> ServiceResult<Vec<Contract>> {
        self.store.list_contracts(student).await.context("list contracts")
    }

    async fn load(&self, id: ContractId, context: &'static str) -> ServiceResult<Contract> {
        self.store
            .get_contract(id)
            .await
            .context(context)?
            .ok_or_else(|| Contract::missing().into())
    }

    async fn transition(
        &self,
        id: ContractId,
        command: ContractCommand,
        context: &'static str,
    ) -> ServiceResult<Contract> {
        let mut contract = self.load(id, context).await?;

        let events = contract.execute(&command).inspect_err(|e| {
            warn!(contract_id = %id, status = ?contract.status(), error = %e, "contract transition refused");
        })?;
        // The save is conditional on the status the events were decided from.
        let Some(expected) = events.first().map(ContractEvent::expected_status) else {
            return Ok(contract);
        };

        if self
            .store
            .save_transition(&contract, expected)
            .await
            .context(context)?
        {
            info!(contract_id = %id, from = ?expected, to = ?contract.status(), "contract transitioned");
            return Ok(contract);
        }

        // Someone else moved the contract first; report against what they left.
        let fresh = self.load(id, context).await?;
        warn!(contract_id = %id, status = ?fresh.status(), "contract changed during transition");
        fresh.handle(&command)?;
        Err(DomainError::constraint(format!("contract {id} was modified concurrently")).into())
    }
}
