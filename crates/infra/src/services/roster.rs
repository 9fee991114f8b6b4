use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use tutorhub_core::{CoachId, DomainError, Entity, StudentId};
use tutorhub_roster::{
    Coach, CoachDraft, LinkOwner, LinkPlan, Student, StudentCoachLink, StudentDraft, plan_links,
};

use super::{ServiceResult, StoreContext};
use crate::store::{OrderLedger, RosterStore};

/// Students, coaches and the association set between them.
///
/// `O` is the ordering system's view of active orders; a student with active
/// orders cannot be deleted.
pub struct RosterService<S: ?Sized, O: ?Sized> {
    store: Arc<S>,
    orders: Arc<O>,
}

impl<S, O> RosterService<S, O>
where
    S: RosterStore + ?Sized,
    O: OrderLedger + ?Sized,
{
    pub fn new(store: Arc<S>, orders: Arc<O>) -> Self {
        Self { store, orders }
    }

    // Students

    #[instrument(skip(self, draft), err)]
    pub async fn create_student(&self, draft: &StudentDraft) -> ServiceResult<Student> {
        let created_at = Utc::now();
        let id = self
            .store
            .insert_student(draft, created_at)
            .await
            .context("create student")?;
        info!(student_id = %id, "student created");
        Ok(Student {
            id,
            name: draft.name.clone(),
            phone: draft.phone.clone(),
            created_at,
        })
    }

    pub async fn update_student(&self, id: StudentId, draft: &StudentDraft) -> ServiceResult<Student> {
        if !self
            .store
            .update_student(id, draft)
            .await
            .context("update student")?
        {
            return Err(Student::missing().into());
        }
        self.student(id).await
    }

    pub async fn student(&self, id: StudentId) -> ServiceResult<Student> {
        self.store
            .get_student(id)
            .await
            .context("get student")?
            .ok_or_else(|| Student::missing().into())
    }

    pub async fn students(&self) -> ServiceResult<Vec<Student>> {
        self.store.list_students().await.context("list students")
    }

    // Coaches

    #[instrument(skip(self, draft), err)]
    pub async fn create_coach(&self, draft: &CoachDraft) -> ServiceResult<Coach> {
        let created_at = Utc::now();
        let id = self
            .store
            .insert_coach(draft, created_at)
            .await
            .context("create coach")?;
        info!(coach_id = %id, "coach created");
        Ok(Coach {
            id,
            name: draft.name.clone(),
            phone: draft.phone.clone(),
            created_at,
        })
    }

    pub async fn update_coach(&self, id: CoachId, draft: &CoachDraft) -> ServiceResult<Coach> {
        if !self
            .store
            .update_coach(id, draft)
            .await
            .context("update coach")?
        {
            return Err(Coach::missing().into());
        }
        self.coach(id).await
    }

    pub async fn coach(&self, id: CoachId) -> ServiceResult<Coach> {
        self.store
            .get_coach(id)
            .await
            .context("get coach")?
            .ok_or_else(|| Coach::missing().into())
    }

    pub async fn coaches(&self) -> ServiceResult<Vec<Coach>> {
        self.store.list_coaches().await.context("list coaches")
    }

    // Associations

    /// Link `owner` to each counterpart. Unknown counterparts are skipped and
    /// already-linked ones are no-ops; the remaining pairs are written in one
    /// atomic store call, so a store failure links nothing.
    #[instrument(skip(self, counterparts), fields(owner = ?owner, requested = counterparts.len()), err)]
    pub async fn link(&self, owner: LinkOwner, counterparts: &[i64]) -> ServiceResult<LinkPlan> {
        self.ensure_owner(owner, "link").await?;

        let existing = match owner {
            LinkOwner::Student(_) => self.store.existing_coaches(counterparts).await,
            LinkOwner::Coach(_) => self.store.existing_students(counterparts).await,
        }
        .context("link")?;
        let linked = self.linked_ids(owner, "link").await?;

        let plan = plan_links(owner, counterparts, &existing, &linked);
        if !plan.missing.is_empty() {
            warn!(owner = ?owner, missing = ?plan.missing, "skipping unknown {}s", owner.counterpart_kind());
        }
        if !plan.to_insert.is_empty() {
            self.store.insert_links(&plan.to_insert).await.context("link")?;
        }

        info!(
            owner = ?owner,
            inserted = plan.to_insert.len(),
            already_linked = plan.already_linked.len(),
            "links written"
        );
        Ok(plan)
    }

    /// Remove the given pairs. Returns how many existed.
    #[instrument(skip(self, counterparts), fields(owner = ?owner), err)]
    pub async fn unlink(&self, owner: LinkOwner, counterparts: &[i64]) -> ServiceResult<u64> {
        self.ensure_owner(owner, "unlink").await?;

        let mut seen = HashSet::new();
        let pairs: Vec<StudentCoachLink> = counterparts
            .iter()
            .copied()
            .filter(|id| *id > 0 && seen.insert(*id))
            .map(|id| owner.pair_with(id))
            .collect();

        let removed = self.store.delete_links(&pairs).await.context("unlink")?;
        info!(owner = ?owner, removed, "links removed");
        Ok(removed)
    }

    #[instrument(skip(self), fields(owner = ?owner), err)]
    pub async fn unlink_all(&self, owner: LinkOwner) -> ServiceResult<u64> {
        self.ensure_owner(owner, "unlink all").await?;
        let removed = self
            .store
            .delete_all_links(owner)
            .await
            .context("unlink all")?;
        info!(owner = ?owner, removed, "links cleared");
        Ok(removed)
    }

    /// Coaches linked to `student`, in id order.
    pub async fn coaches_of(&self, student: StudentId) -> ServiceResult<Vec<Coach>> {
        let owner = LinkOwner::Student(student);
        self.ensure_owner(owner, "list linked coaches").await?;
        let ids = self.linked_ids(owner, "list linked coaches").await?;
        let coaches = self.coaches().await?;
        Ok(coaches.into_iter().filter(|c| ids.contains(&c.id.get())).collect())
    }

    /// Students linked to `coach`, in id order.
    pub async fn students_of(&self, coach: CoachId) -> ServiceResult<Vec<Student>> {
        let owner = LinkOwner::Coach(coach);
        self.ensure_owner(owner, "list linked students").await?;
        let ids = self.linked_ids(owner, "list linked students").await?;
        let students = self.students().await?;
        Ok(students.into_iter().filter(|s| ids.contains(&s.id.get())).collect())
    }

    /// Delete a student and all its associations, unless orders are open.
    #[instrument(skip(self), fields(student_id = %id), err)]
    pub async fn delete_student(&self, id: StudentId) -> ServiceResult<u64> {
        self.ensure_owner(LinkOwner::Student(id), "delete student").await?;

        if self
            .orders
            .has_active_orders(id)
            .await
            .context("delete student")?
        {
            warn!(student_id = %id, "student deletion refused: active orders");
            return Err(DomainError::constraint(format!(
                "student {id} has active orders and cannot be deleted"
            ))
            .into());
        }

        let removed = self
            .store
            .delete_student_cascade(id)
            .await
            .context("delete student")?;
        info!(student_id = %id, links_removed = removed, "student deleted");
        Ok(removed)
    }

    #[instrument(skip(self), fields(coach_id = %id), err)]
    pub async fn delete_coach(&self, id: CoachId) -> ServiceResult<u64> {
        self.ensure_owner(LinkOwner::Coach(id), "delete coach").await?;
        let removed = self
            .store
            .delete_coach_cascade(id)
            .await
            .context("delete coach")?;
        info!(coach_id = %id, links_removed = removed, "coach deleted");
        Ok(removed)
    }

    async fn ensure_owner(&self, owner: LinkOwner, context: &'static str) -> ServiceResult<()> {
        let exists = match owner {
            LinkOwner::Student(id) => self.store.get_student(id).await.context(context)?.is_some(),
            LinkOwner::Coach(id) => self.store.get_coach(id).await.context(context)?.is_some(),
        };
        if !exists {
            return Err(DomainError::not_found(owner.kind()).into());
        }
        Ok(())
    }

    async fn linked_ids(&self, owner: LinkOwner, context: &'static str) -> ServiceResult<HashSet<i64>> {
        let links = self.store.links_of(owner).await.context(context)?;
        Ok(links.iter().map(|l| owner.counterpart_of(l)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceError;
    use crate::store::InMemoryStore;

    type Roster = RosterService<InMemoryStore, InMemoryStore>;

    struct Fixture {
        store: Arc<InMemoryStore>,
        svc: Roster,
        student: StudentId,
        coaches: Vec<i64>,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let svc = RosterService::new(store.clone(), store.clone());
        let student = svc
            .create_student(&StudentDraft::new("Mia", Some("555")).unwrap())
            .await
            .unwrap()
            .id;
        let mut coaches = Vec::new();
        for name in ["Ann", "Bob", "Cid"] {
            let coach = svc.create_coach(&CoachDraft::new(name, None).unwrap()).await.unwrap();
            coaches.push(coach.id.get());
        }
        Fixture {
            store,
            svc,
            student,
            coaches,
        }
    }

    #[tokio::test]
    async fn link_is_idempotent_per_pair() {
        let f = fixture().await;
        let owner = LinkOwner::Student(f.student);

        let first = f.svc.link(owner, &f.coaches[..2]).await.unwrap();
        assert_eq!(first.to_insert.len(), 2);

        let second = f.svc.link(owner, &[f.coaches[0], f.coaches[0]]).await.unwrap();
        assert!(second.to_insert.is_empty());
        assert_eq!(second.already_linked, vec![f.coaches[0]]);
        assert_eq!(f.store.links_of(owner).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unknown_counterparts_are_skipped() {
        let f = fixture().await;
        let plan = f
            .svc
            .link(LinkOwner::Student(f.student), &[f.coaches[0], 404, 0])
            .await
            .unwrap();
        assert_eq!(plan.missing, vec![404, 0]);
        assert_eq!(plan.to_insert.len(), 1);
    }

    #[tokio::test]
    async fn unlink_all_then_link_rebuilds_from_empty() {
        let f = fixture().await;
        let owner = LinkOwner::Student(f.student);
        f.svc.link(owner, &f.coaches).await.unwrap();

        assert_eq!(f.svc.unlink_all(owner).await.unwrap(), 3);
        assert!(f.svc.coaches_of(f.student).await.unwrap().is_empty());

        f.svc.link(owner, &[f.coaches[2]]).await.unwrap();
        let linked = f.svc.coaches_of(f.student).await.unwrap();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].id.get(), f.coaches[2]);
    }

    #[tokio::test]
    async fn rejected_batch_links_nothing() {
        let f = fixture().await;
        f.store.fail_operation("insert_links");

        let err = f
            .svc
            .link(LinkOwner::Student(f.student), &f.coaches)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Store { context: "link", .. }));
        assert!(f.svc.coaches_of(f.student).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unlink_reports_removed_pairs() {
        let f = fixture().await;
        let coach = CoachId::new(f.coaches[0]);
        f.svc
            .link(LinkOwner::Coach(coach), &[f.student.get()])
            .await
            .unwrap();

        let removed = f
            .svc
            .unlink(LinkOwner::Coach(coach), &[f.student.get(), 77])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(f.svc.students_of(coach).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn owner_must_exist() {
        let f = fixture().await;
        let err = f
            .svc
            .link(LinkOwner::Coach(CoachId::new(404)), &[f.student.get()])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound("coach"))));
    }

    #[tokio::test]
    async fn student_with_active_orders_is_kept() {
        let f = fixture().await;
        f.svc.link(LinkOwner::Student(f.student), &f.coaches).await.unwrap();
        f.store.record_active_order(f.student);

        let err = f.svc.delete_student(f.student).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::ConstraintViolation(_))));
        assert_eq!(f.svc.coaches_of(f.student).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn cascade_delete_is_all_or_nothing() {
        let f = fixture().await;
        f.svc.link(LinkOwner::Student(f.student), &f.coaches).await.unwrap();

        f.store.fail_operation("delete_student_cascade");
        assert!(f.svc.delete_student(f.student).await.is_err());
        assert_eq!(f.svc.coaches_of(f.student).await.unwrap().len(), 3);

        let g = fixture().await;
        g.svc.link(LinkOwner::Student(g.student), &g.coaches).await.unwrap();
        assert_eq!(g.svc.delete_student(g.student).await.unwrap(), 3);
        assert!(matches!(
            g.svc.student(g.student).await.unwrap_err(),
            ServiceError::Domain(DomainError::NotFound("student"))
        ));
        let coach = CoachId::new(g.coaches[0]);
        assert!(g.svc.students_of(coach).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_coach_drops_its_links() {
        let f = fixture().await;
        f.svc.link(LinkOwner::Student(f.student), &f.coaches).await.unwrap();

        let removed = f.svc.delete_coach(CoachId::new(f.coaches[1])).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(f.svc.coaches_of(f.student).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_student_overwrites_fields() {
        let f = fixture().await;
        let updated = f
            .svc
            .update_student(f.student, &StudentDraft::new("Mia K", None).unwrap())
            .await
            .unwrap();
        assert_eq!(updated.name, "Mia K");
        assert_eq!(updated.phone, None);

        let err = f
            .svc
            .update_coach(CoachId::new(404), &CoachDraft::new("X", None).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound("coach"))));
    }
}
