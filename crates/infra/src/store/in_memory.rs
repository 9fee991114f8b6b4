use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use tutorhub_catalog::{
    Attribute, AttributeDraft, Brand, Classification, ClassificationScope, RecordStatus,
};
use tutorhub_contracts::{Contract, ContractDraft, ContractStatus};
use tutorhub_core::{AttributeId, BrandId, ClassificationId, CoachId, ContractId, StudentId};
use tutorhub_roster::{Coach, CoachDraft, LinkOwner, Student, StudentCoachLink, StudentDraft};

use super::{
    AttributeStore, BrandStore, ClassificationFilter, ClassificationStore, ContractStore,
    OrderLedger, RosterStore, StoreError, StoreResult,
};

#[derive(Debug, Default)]
struct Tables {
    sequences: HashMap<&'static str, i64>,
    classifications: BTreeMap<ClassificationId, Classification>,
    brands: BTreeMap<BrandId, Brand>,
    attributes: BTreeMap<AttributeId, Attribute>,
    contracts: BTreeMap<ContractId, Contract>,
    students: BTreeMap<StudentId, Student>,
    coaches: BTreeMap<CoachId, Coach>,
    links: BTreeSet<StudentCoachLink>,
    active_orders: HashSet<StudentId>,
}

impl Tables {
    fn next_id(&mut self, table: &'static str) -> i64 {
        let seq = self.sequences.entry(table).or_insert(0);
        *seq += 1;
        *seq
    }

    fn remove_links_where(&mut self, keep: impl Fn(&StudentCoachLink) -> bool) -> u64 {
        let before = self.links.len();
        self.links.retain(|l| keep(l));
        (before - self.links.len()) as u64
    }
}

fn owned_by(owner: LinkOwner, link: &StudentCoachLink) -> bool {
    match owner {
        LinkOwner::Student(id) => link.student_id == id,
        LinkOwner::Coach(id) => link.coach_id == id,
    }
}

/// In-memory entity store.
///
/// Intended for tests/dev. Every operation takes the table lock once, so
/// multi-step writes are trivially atomic. It also stands in for the ordering
/// system through [`InMemoryStore::record_active_order`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    failing: RwLock<HashSet<&'static str>>,
    /// Status a competing writer commits right before the next transition save.
    #[cfg(test)]
    interleaved: RwLock<Option<ContractStatus>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a student as having an order still in progress.
    pub fn record_active_order(&self, student: StudentId) {
        if let Ok(mut tables) = self.tables.write() {
            tables.active_orders.insert(student);
        }
    }

    /// Make every subsequent write named `operation` fail.
    #[cfg(test)]
    pub(crate) fn fail_operation(&self, operation: &'static str) {
        if let Ok(mut failing) = self.failing.write() {
            failing.insert(operation);
        }
    }

    /// Force a contract into a status, as the external approval flow does.
    #[cfg(test)]
    pub(crate) fn force_contract_status(&self, id: ContractId, status: ContractStatus) {
        if let Ok(mut tables) = self.tables.write() {
            if let Some(contract) = tables.contracts.get_mut(&id) {
                contract.status = status;
            }
        }
    }

    /// Let another writer move the contract before the next `save_transition`
    /// compares its status.
    #[cfg(test)]
    pub(crate) fn interleave_transition(&self, status: ContractStatus) {
        if let Ok(mut interleaved) = self.interleaved.write() {
            *interleaved = Some(status);
        }
    }

    #[cfg(test)]
    fn interleave(&self, tables: &mut Tables, id: ContractId) {
        let pending = self.interleaved.write().ok().and_then(|mut s| s.take());
        if let (Some(status), Some(row)) = (pending, tables.contracts.get_mut(&id)) {
            row.status = status;
        }
    }

    #[cfg(not(test))]
    fn interleave(&self, _tables: &mut Tables, _id: ContractId) {}

    fn read(&self, operation: &'static str) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::database(operation, "lock poisoned"))
    }

    fn write(&self, operation: &'static str) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        let injected = self
            .failing
            .read()
            .map(|failing| failing.contains(operation))
            .unwrap_or(false);
        if injected {
            return Err(StoreError::database(operation, "write rejected"));
        }
        self.tables
            .write()
            .map_err(|_| StoreError::database(operation, "lock poisoned"))
    }
}

#[async_trait::async_trait]
impl ClassificationStore for InMemoryStore {
    async fn insert_classification(
        &self,
        name: &str,
        scope: ClassificationScope,
        status: RecordStatus,
    ) -> StoreResult<ClassificationId> {
        let mut t = self.write("insert_classification")?;
        let id = ClassificationId::new(t.next_id("classifications"));
        t.classifications.insert(
            id,
            Classification {
                id,
                name: name.to_string(),
                scope,
                status,
            },
        );
        Ok(id)
    }

    async fn get_classification(&self, id: ClassificationId) -> StoreResult<Option<Classification>> {
        Ok(self.read("get_classification")?.classifications.get(&id).cloned())
    }

    async fn update_classification(
        &self,
        id: ClassificationId,
        name: &str,
        scope: ClassificationScope,
    ) -> StoreResult<bool> {
        let mut t = self.write("update_classification")?;
        Ok(match t.classifications.get_mut(&id) {
            Some(row) => {
                row.name = name.to_string();
                row.scope = scope;
                true
            }
            None => false,
        })
    }

    async fn set_classification_status(
        &self,
        id: ClassificationId,
        status: RecordStatus,
    ) -> StoreResult<bool> {
        let mut t = self.write("set_classification_status")?;
        Ok(match t.classifications.get_mut(&id) {
            Some(row) => {
                row.status = status;
                true
            }
            None => false,
        })
    }

    async fn count_named_in_scope(
        &self,
        name: &str,
        scope: ClassificationScope,
        exclude: Option<ClassificationId>,
    ) -> StoreResult<u64> {
        let t = self.read("count_named_in_scope")?;
        Ok(t.classifications
            .values()
            .filter(|c| c.name == name && c.scope == scope && Some(c.id) != exclude)
            .count() as u64)
    }

    async fn count_children(&self, parent: ClassificationId) -> StoreResult<u64> {
        let t = self.read("count_children")?;
        Ok(t.classifications
            .values()
            .filter(|c| c.parent_id() == Some(parent))
            .count() as u64)
    }

    async fn list_classifications(
        &self,
        filter: ClassificationFilter,
    ) -> StoreResult<Vec<Classification>> {
        let t = self.read("list_classifications")?;
        Ok(t.classifications
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl BrandStore for InMemoryStore {
    async fn insert_brand(&self, name: &str) -> StoreResult<BrandId> {
        let mut t = self.write("insert_brand")?;
        let id = BrandId::new(t.next_id("brands"));
        t.brands.insert(
            id,
            Brand {
                id,
                name: name.to_string(),
                status: RecordStatus::Active,
            },
        );
        Ok(id)
    }

    async fn get_brand(&self, id: BrandId) -> StoreResult<Option<Brand>> {
        Ok(self.read("get_brand")?.brands.get(&id).cloned())
    }

    async fn list_brands(&self) -> StoreResult<Vec<Brand>> {
        Ok(self.read("list_brands")?.brands.values().cloned().collect())
    }

    async fn set_brand_status(&self, id: BrandId, status: RecordStatus) -> StoreResult<bool> {
        let mut t = self.write("set_brand_status")?;
        Ok(t.brands.get_mut(&id).map(|b| b.status = status).is_some())
    }
}

#[async_trait::async_trait]
impl AttributeStore for InMemoryStore {
    async fn insert_attribute(&self, draft: &AttributeDraft) -> StoreResult<AttributeId> {
        let mut t = self.write("insert_attribute")?;
        let id = AttributeId::new(t.next_id("attributes"));
        t.attributes.insert(
            id,
            Attribute {
                id,
                name: draft.name.clone(),
                status: RecordStatus::Active,
                values: draft.values.clone(),
            },
        );
        Ok(id)
    }

    async fn get_attribute(&self, id: AttributeId) -> StoreResult<Option<Attribute>> {
        Ok(self.read("get_attribute")?.attributes.get(&id).cloned())
    }

    async fn list_attributes(&self) -> StoreResult<Vec<Attribute>> {
        Ok(self.read("list_attributes")?.attributes.values().cloned().collect())
    }

    async fn rename_attribute(&self, id: AttributeId, name: &str) -> StoreResult<bool> {
        let mut t = self.write("rename_attribute")?;
        Ok(t.attributes
            .get_mut(&id)
            .map(|a| a.name = name.to_string())
            .is_some())
    }

    async fn replace_attribute_values(&self, id: AttributeId, values: &[String]) -> StoreResult<()> {
        let mut t = self.write("replace_attribute_values")?;
        if let Some(attribute) = t.attributes.get_mut(&id) {
            attribute.values = values.to_vec();
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ContractStore for InMemoryStore {
    async fn insert_contract(
        &self,
        draft: &ContractDraft,
        created_at: DateTime<Utc>,
    ) -> StoreResult<ContractId> {
        let mut t = self.write("insert_contract")?;
        let id = ContractId::new(t.next_id("contracts"));
        t.contracts
            .insert(id, Contract::from_draft(id, draft.clone(), created_at));
        Ok(id)
    }

    async fn get_contract(&self, id: ContractId) -> StoreResult<Option<Contract>> {
        Ok(self.read("get_contract")?.contracts.get(&id).cloned())
    }

    async fn list_contracts(&self, student: Option<StudentId>) -> StoreResult<Vec<Contract>> {
        let t = self.read("list_contracts")?;
        Ok(t.contracts
            .values()
            .filter(|c| student.is_none_or(|s| c.student_id == s))
            .cloned()
            .collect())
    }

    async fn save_transition(
        &self,
        contract: &Contract,
        expected: ContractStatus,
    ) -> StoreResult<bool> {
        let mut t = self.write("save_transition")?;
        self.interleave(&mut t, contract.id);
        match t.contracts.get_mut(&contract.id) {
            Some(row) if row.status == expected => {
                row.status = contract.status;
                row.termination_agreement = contract.termination_agreement.clone();
                row.updated_at = contract.updated_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait::async_trait]
impl RosterStore for InMemoryStore {
    async fn insert_student(&self, draft: &StudentDraft, created_at: DateTime<Utc>) -> StoreResult<StudentId> {
        let mut t = self.write("insert_student")?;
        let id = StudentId::new(t.next_id("students"));
        t.students.insert(
            id,
            Student {
                id,
                name: draft.name.clone(),
                phone: draft.phone.clone(),
                created_at,
            },
        );
        Ok(id)
    }

    async fn get_student(&self, id: StudentId) -> StoreResult<Option<Student>> {
        Ok(self.read("get_student")?.students.get(&id).cloned())
    }

    async fn list_students(&self) -> StoreResult<Vec<Student>> {
        Ok(self.read("list_students")?.students.values().cloned().collect())
    }

    async fn update_student(&self, id: StudentId, draft: &StudentDraft) -> StoreResult<bool> {
        let mut t = self.write("update_student")?;
        Ok(match t.students.get_mut(&id) {
            Some(row) => {
                row.name = draft.name.clone();
                row.phone = draft.phone.clone();
                true
            }
            None => false,
        })
    }

    async fn insert_coach(&self, draft: &CoachDraft, created_at: DateTime<Utc>) -> StoreResult<CoachId> {
        let mut t = self.write("insert_coach")?;
        let id = CoachId::new(t.next_id("coaches"));
        t.coaches.insert(
            id,
            Coach {
                id,
                name: draft.name.clone(),
                phone: draft.phone.clone(),
                created_at,
            },
        );
        Ok(id)
    }

    async fn get_coach(&self, id: CoachId) -> StoreResult<Option<Coach>> {
        Ok(self.read("get_coach")?.coaches.get(&id).cloned())
    }

    async fn list_coaches(&self) -> StoreResult<Vec<Coach>> {
        Ok(self.read("list_coaches")?.coaches.values().cloned().collect())
    }

    async fn update_coach(&self, id: CoachId, draft: &CoachDraft) -> StoreResult<bool> {
        let mut t = self.write("update_coach")?;
        Ok(match t.coaches.get_mut(&id) {
            Some(row) => {
                row.name = draft.name.clone();
                row.phone = draft.phone.clone();
                true
            }
            None => false,
        })
    }

    async fn existing_students(&self, ids: &[i64]) -> StoreResult<HashSet<i64>> {
        let t = self.read("existing_students")?;
        Ok(ids
            .iter()
            .copied()
            .filter(|id| t.students.contains_key(&StudentId::new(*id)))
            .collect())
    }

    async fn existing_coaches(&self, ids: &[i64]) -> StoreResult<HashSet<i64>> {
        let t = self.read("existing_coaches")?;
        Ok(ids
            .iter()
            .copied()
            .filter(|id| t.coaches.contains_key(&CoachId::new(*id)))
            .collect())
    }

    async fn links_of(&self, owner: LinkOwner) -> StoreResult<Vec<StudentCoachLink>> {
        let t = self.read("links_of")?;
        Ok(t.links.iter().filter(|l| owned_by(owner, l)).copied().collect())
    }

    async fn insert_links(&self, links: &[StudentCoachLink]) -> StoreResult<u64> {
        let mut t = self.write("insert_links")?;
        Ok(links.iter().filter(|l| t.links.insert(**l)).count() as u64)
    }

    async fn delete_links(&self, links: &[StudentCoachLink]) -> StoreResult<u64> {
        let mut t = self.write("delete_links")?;
        Ok(links.iter().filter(|l| t.links.remove(*l)).count() as u64)
    }

    async fn delete_all_links(&self, owner: LinkOwner) -> StoreResult<u64> {
        let mut t = self.write("delete_all_links")?;
        Ok(t.remove_links_where(|l| !owned_by(owner, l)))
    }

    async fn delete_student_cascade(&self, id: StudentId) -> StoreResult<u64> {
        let mut t = self.write("delete_student_cascade")?;
        let removed = t.remove_links_where(|l| l.student_id != id);
        t.students.remove(&id);
        Ok(removed)
    }

    async fn delete_coach_cascade(&self, id: CoachId) -> StoreResult<u64> {
        let mut t = self.write("delete_coach_cascade")?;
        let removed = t.remove_links_where(|l| l.coach_id != id);
        t.coaches.remove(&id);
        Ok(removed)
    }
}

#[async_trait::async_trait]
impl OrderLedger for InMemoryStore {
    async fn has_active_orders(&self, student: StudentId) -> StoreResult<bool> {
        Ok(self.read("has_active_orders")?.active_orders.contains(&student))
    }
}
