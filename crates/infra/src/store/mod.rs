//! Entity store abstractions.
//!
//! The store is the only place rows are read or written. Traits are split by
//! aggregate so each service asks for exactly what it touches; [`Store`] bundles
//! them for wiring. Two implementations exist: [`InMemoryStore`] (tests/dev)
//! and [`PostgresStore`].
//!
//! Multi-step writes that must be atomic (value-set replacement, cascade
//! delete, batch linking) are single trait methods so each backend can commit
//! them as one unit.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use thiserror::Error;

use tutorhub_catalog::{
    Attribute, AttributeDraft, Brand, Classification, ClassificationScope, RecordStatus,
};
use tutorhub_contracts::{Contract, ContractDraft, ContractStatus};
use tutorhub_core::{AttributeId, BrandId, ClassificationId, CoachId, ContractId, StudentId};
use tutorhub_roster::{Coach, CoachDraft, LinkOwner, Student, StudentCoachLink, StudentDraft};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Store operation error (infrastructure failure, never a domain rule).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    #[error("connection pool closed in {0}")]
    PoolClosed(&'static str),

    #[error("unreadable row in {operation}: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },
}

impl StoreError {
    pub fn database(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Database {
            operation,
            message: message.into(),
        }
    }

    pub fn decode(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Decode {
            operation,
            message: message.into(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read projections over classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationFilter {
    All,
    TopLevel,
    Active,
    ChildrenOf(ClassificationId),
}

impl ClassificationFilter {
    pub fn matches(&self, c: &Classification) -> bool {
        match self {
            ClassificationFilter::All => true,
            ClassificationFilter::TopLevel => c.is_top_level(),
            ClassificationFilter::Active => c.status.is_active(),
            ClassificationFilter::ChildrenOf(parent) => c.parent_id() == Some(*parent),
        }
    }
}

#[async_trait::async_trait]
pub trait ClassificationStore: Send + Sync {
    async fn insert_classification(
        &self,
        name: &str,
        scope: ClassificationScope,
        status: RecordStatus,
    ) -> StoreResult<ClassificationId>;

    async fn get_classification(&self, id: ClassificationId) -> StoreResult<Option<Classification>>;

    /// Overwrite name, level and parent. Returns `false` if the row is gone.
    async fn update_classification(
        &self,
        id: ClassificationId,
        name: &str,
        scope: ClassificationScope,
    ) -> StoreResult<bool>;

    async fn set_classification_status(
        &self,
        id: ClassificationId,
        status: RecordStatus,
    ) -> StoreResult<bool>;

    /// Count rows named `name` within `scope`, ignoring `exclude`.
    async fn count_named_in_scope(
        &self,
        name: &str,
        scope: ClassificationScope,
        exclude: Option<ClassificationId>,
    ) -> StoreResult<u64>;

    async fn count_children(&self, parent: ClassificationId) -> StoreResult<u64>;

    async fn list_classifications(
        &self,
        filter: ClassificationFilter,
    ) -> StoreResult<Vec<Classification>>;
}

#[async_trait::async_trait]
pub trait BrandStore: Send + Sync {
    async fn insert_brand(&self, name: &str) -> StoreResult<BrandId>;
    async fn get_brand(&self, id: BrandId) -> StoreResult<Option<Brand>>;
    async fn list_brands(&self) -> StoreResult<Vec<Brand>>;
    async fn set_brand_status(&self, id: BrandId, status: RecordStatus) -> StoreResult<bool>;
}

#[async_trait::async_trait]
pub trait AttributeStore: Send + Sync {
    /// Insert the attribute together with its initial value set.
    async fn insert_attribute(&self, draft: &AttributeDraft) -> StoreResult<AttributeId>;
    async fn get_attribute(&self, id: AttributeId) -> StoreResult<Option<Attribute>>;
    async fn list_attributes(&self) -> StoreResult<Vec<Attribute>>;
    async fn rename_attribute(&self, id: AttributeId, name: &str) -> StoreResult<bool>;

    /// Delete every value of the attribute and insert `values`, atomically.
    async fn replace_attribute_values(&self, id: AttributeId, values: &[String]) -> StoreResult<()>;
}

#[async_trait::async_trait]
pub trait ContractStore: Send + Sync {
    async fn insert_contract(
        &self,
        draft: &ContractDraft,
        created_at: DateTime<Utc>,
    ) -> StoreResult<ContractId>;

    async fn get_contract(&self, id: ContractId) -> StoreResult<Option<Contract>>;

    async fn list_contracts(&self, student: Option<StudentId>) -> StoreResult<Vec<Contract>>;

    /// Persist status, agreement reference and `updated_at` of `contract`, but
    /// only if the stored status is still `expected`. Returns whether it wrote.
    async fn save_transition(
        &self,
        contract: &Contract,
        expected: ContractStatus,
    ) -> StoreResult<bool>;
}

#[async_trait::async_trait]
pub trait RosterStore: Send + Sync {
    async fn insert_student(&self, draft: &StudentDraft, created_at: DateTime<Utc>) -> StoreResult<StudentId>;
    async fn get_student(&self, id: StudentId) -> StoreResult<Option<Student>>;
    async fn list_students(&self) -> StoreResult<Vec<Student>>;
    async fn update_student(&self, id: StudentId, draft: &StudentDraft) -> StoreResult<bool>;

    async fn insert_coach(&self, draft: &CoachDraft, created_at: DateTime<Utc>) -> StoreResult<CoachId>;
    async fn get_coach(&self, id: CoachId) -> StoreResult<Option<Coach>>;
    async fn list_coaches(&self) -> StoreResult<Vec<Coach>>;
    async fn update_coach(&self, id: CoachId, draft: &CoachDraft) -> StoreResult<bool>;

    /// Subset of `ids` that are existing students.
    async fn existing_students(&self, ids: &[i64]) -> StoreResult<HashSet<i64>>;
    /// Subset of `ids` that are existing coaches.
    async fn existing_coaches(&self, ids: &[i64]) -> StoreResult<HashSet<i64>>;

    async fn links_of(&self, owner: LinkOwner) -> StoreResult<Vec<StudentCoachLink>>;

    /// Insert all pairs in one atomic write; pairs already present are ignored.
    /// Returns the number of rows written.
    async fn insert_links(&self, links: &[StudentCoachLink]) -> StoreResult<u64>;

    async fn delete_links(&self, links: &[StudentCoachLink]) -> StoreResult<u64>;

    async fn delete_all_links(&self, owner: LinkOwner) -> StoreResult<u64>;

    /// Delete the student's associations and the student row in one
    /// transaction. Returns the number of associations removed.
    async fn delete_student_cascade(&self, id: StudentId) -> StoreResult<u64>;

    /// Delete the coach's associations and the coach row in one transaction.
    async fn delete_coach_cascade(&self, id: CoachId) -> StoreResult<u64>;
}

/// External predicate owned by the ordering system.
#[async_trait::async_trait]
pub trait OrderLedger: Send + Sync {
    async fn has_active_orders(&self, student: StudentId) -> StoreResult<bool>;
}

/// Every store capability, for wiring behind one trait object.
pub trait Store: ClassificationStore + BrandStore + AttributeStore + ContractStore + RosterStore {}

impl<T> Store for T where
    T: ClassificationStore + BrandStore + AttributeStore + ContractStore + RosterStore + ?Sized
{
}
