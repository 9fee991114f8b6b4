//! Contracts domain module (commercial contracts with students).
//!
//! This crate contains the contract lifecycle state machine, implemented purely
//! as deterministic domain logic (no IO, no HTTP, no storage).

pub mod contract;

pub use contract::{
    Contract, ContractCommand, ContractDraft, ContractEvent, ContractRevoked, ContractStatus,
    ContractTerminated, ContractType, NewContract, RevokeContract, SignatureForm,
    TerminateContract, not_approved, not_pending,
};
