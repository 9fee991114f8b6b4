use std::sync::Arc;

use tracing::{info, instrument, warn};

use tutorhub_catalog::{Classification, ClassificationDraft, ClassificationScope, RecordStatus};
use tutorhub_core::{coerce, ClassificationId, Entity};

use super::{ServiceError, ServiceResult, StoreContext, uniqueness::is_name_unique};
use crate::store::{ClassificationFilter, ClassificationStore};

/// Classification hierarchy manager.
///
/// Owns the two-level tree shape and per-scope name uniqueness. Drafts arrive
/// already validated (name, level, parent presence); this service runs the
/// checks that need stored state, in order: target exists (update), parent
/// linkage, demotion, uniqueness.
pub struct ClassificationService<S: ?Sized> {
    store: Arc<S>,
}

impl<S> ClassificationService<S>
where
    S: ClassificationStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, draft), fields(name = draft.name(), scope = ?draft.scope()), err)]
    pub async fn create(&self, draft: &ClassificationDraft) -> ServiceResult<ClassificationId> {
        self.check_parent(None, draft).await?;
        self.ensure_unique(draft, None).await?;

        let id = self
            .store
            .insert_classification(draft.name(), draft.scope(), RecordStatus::Active)
            .await
            .context("create classification")?;

        info!(classification_id = %id, "classification created");
        Ok(id)
    }

    #[instrument(skip(self, draft), fields(id = %id, name = draft.name(), scope = ?draft.scope()), err)]
    pub async fn update(&self, id: ClassificationId, draft: &ClassificationDraft) -> ServiceResult<()> {
        let current = self.load(id, "update classification").await?;

        self.check_parent(Some(id), draft).await?;

        if current.is_top_level() && !matches!(draft.scope(), ClassificationScope::TopLevel) {
            let children = self
                .store
                .count_children(id)
                .await
                .context("update classification")?;
            draft.check_demotion(&current, children)?;
        }

        self.ensure_unique(draft, Some(id)).await?;

        let written = self
            .store
            .update_classification(id, draft.name(), draft.scope())
            .await
            .context("update classification")?;
        if !written {
            return Err(Classification::missing().into());
        }

        info!(classification_id = %id, "classification updated");
        Ok(())
    }

    #[instrument(skip(self), fields(id = %id, status = ?status), err)]
    pub async fn toggle_status(&self, id: ClassificationId, status: RecordStatus) -> ServiceResult<()> {
        let written = self
            .store
            .set_classification_status(id, status)
            .await
            .context("toggle classification status")?;
        if !written {
            return Err(Classification::missing().into());
        }
        info!(classification_id = %id, "classification status changed");
        Ok(())
    }

    /// Uniqueness probe exposed to callers (e.g. form validation).
    pub async fn is_name_available(
        &self,
        name: &str,
        scope: ClassificationScope,
        exclude: Option<ClassificationId>,
    ) -> ServiceResult<bool> {
        let name = coerce::required_text("name", name)?;
        is_name_unique(&*self.store, &name, scope, exclude)
            .await
            .context("check classification name")
    }

    pub async fn get(&self, id: ClassificationId) -> ServiceResult<Classification> {
        self.load(id, "get classification").await
    }

    pub async fn list(&self, filter: ClassificationFilter) -> ServiceResult<Vec<Classification>> {
        self.store
            .list_classifications(filter)
            .await
            .context("list classifications")
    }

    async fn load(&self, id: ClassificationId, context: &'static str) -> ServiceResult<Classification> {
        self.store
            .get_classification(id)
            .await
            .context(context)?
            .ok_or_else(|| Classification::missing().into())
    }

    async fn check_parent(
        &self,
        editing: Option<ClassificationId>,
        draft: &ClassificationDraft,
    ) -> ServiceResult<()> {
        let Some(parent_id) = draft.scope().parent_id() else {
            return Ok(());
        };
        let parent = if editing == Some(parent_id) {
            None
        } else {
            self.store
                .get_classification(parent_id)
                .await
                .context("load parent classification")?
        };
        draft.check_parent(editing, parent.as_ref()).map_err(|e| {
            warn!(parent_id = %parent_id, error = %e, "classification parent rejected");
            ServiceError::from(e)
        })
    }

    async fn ensure_unique(
        &self,
        draft: &ClassificationDraft,
        exclude: Option<ClassificationId>,
    ) -> ServiceResult<()> {
        let unique = is_name_unique(&*self.store, draft.name(), draft.scope(), exclude)
            .await
            .context("check classification name")?;
        if !unique {
            warn!(name = draft.name(), scope = ?draft.scope(), "duplicate classification name");
            return Err(draft.scope().duplicate_name(draft.name()).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use tutorhub_core::DomainError;
    use serde_json::json;

    fn service() -> (Arc<InMemoryStore>, ClassificationService<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        (store.clone(), ClassificationService::new(store))
    }

    fn top(name: &str) -> ClassificationDraft {
        ClassificationDraft::new(name, 0, None).unwrap()
    }

    fn child(name: &str, parent: ClassificationId) -> ClassificationDraft {
        ClassificationDraft::new(name, 1, Some(parent.get())).unwrap()
    }

    fn domain(err: ServiceError) -> DomainError {
        match err {
            ServiceError::Domain(e) => e,
            other => panic!("expected domain error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn duplicate_top_level_name_is_rejected() {
        let (_, svc) = service();
        svc.create(&top("Language")).await.unwrap();

        let err = domain(svc.create(&top("Language")).await.unwrap_err());
        assert!(matches!(err, DomainError::ConstraintViolation(ref m) if m.contains("top-level")));
    }

    #[tokio::test]
    async fn same_child_name_under_different_parents() {
        let (_, svc) = service();
        let n = svc.create(&top("N")).await.unwrap();
        let m = svc.create(&top("M")).await.unwrap();

        svc.create(&child("English", n)).await.unwrap();
        svc.create(&child("English", m)).await.unwrap();

        let err = domain(svc.create(&child("English", n)).await.unwrap_err());
        assert!(matches!(err, DomainError::ConstraintViolation(ref m) if m.contains("under parent")));
    }

    #[tokio::test]
    async fn child_without_parent_fails_before_any_store_access() {
        for parent in [json!(null), json!(0), json!("")] {
            let err = ClassificationDraft::from_loose("English", &json!(1), &parent).unwrap_err();
            assert_eq!(err, DomainError::constraint("child classification requires a parent"));
        }
    }

    #[tokio::test]
    async fn parent_must_exist_and_be_top_level() {
        let (_, svc) = service();
        let err = domain(svc.create(&child("English", ClassificationId::new(42))).await.unwrap_err());
        assert_eq!(err, DomainError::not_found("parent classification"));

        let n = svc.create(&top("N")).await.unwrap();
        let english = svc.create(&child("English", n)).await.unwrap();
        let err = domain(svc.create(&child("Grammar", english)).await.unwrap_err());
        assert!(matches!(err, DomainError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn update_checks_target_then_parent_then_name() {
        let (_, svc) = service();
        let missing = ClassificationId::new(99);
        let err = domain(svc.update(missing, &child("X", ClassificationId::new(77))).await.unwrap_err());
        assert_eq!(err, DomainError::not_found("classification"));

        let a = svc.create(&top("A")).await.unwrap();
        let err = domain(svc.update(a, &child("A", a)).await.unwrap_err());
        assert!(matches!(err, DomainError::ConstraintViolation(ref m) if m.contains("own parent")));

        svc.create(&top("B")).await.unwrap();
        let err = domain(svc.update(a, &top("B")).await.unwrap_err());
        assert!(matches!(err, DomainError::ConstraintViolation(_)));

        // Renaming to its own current name is not a collision.
        svc.update(a, &top("A")).await.unwrap();
    }

    #[tokio::test]
    async fn top_level_with_children_cannot_be_demoted() {
        let (_, svc) = service();
        let a = svc.create(&top("A")).await.unwrap();
        let b = svc.create(&top("B")).await.unwrap();
        svc.create(&child("A1", a)).await.unwrap();

        let err = domain(svc.update(a, &child("A", b)).await.unwrap_err());
        assert!(matches!(err, DomainError::ConstraintViolation(ref m) if m.contains("child")));

        let c = svc.create(&top("C")).await.unwrap();
        svc.update(c, &child("C", b)).await.unwrap();
        assert_eq!(svc.get(c).await.unwrap().parent_id(), Some(b));
    }

    #[tokio::test]
    async fn toggle_status_and_projections() {
        let (_, svc) = service();
        let a = svc.create(&top("A")).await.unwrap();
        let a1 = svc.create(&child("A1", a)).await.unwrap();

        svc.toggle_status(a1, RecordStatus::Disabled).await.unwrap();
        assert_eq!(svc.list(ClassificationFilter::Active).await.unwrap().len(), 1);
        assert_eq!(svc.list(ClassificationFilter::TopLevel).await.unwrap().len(), 1);
        assert_eq!(svc.list(ClassificationFilter::ChildrenOf(a)).await.unwrap()[0].id, a1);

        let err = domain(
            svc.toggle_status(ClassificationId::new(9), RecordStatus::Active)
                .await
                .unwrap_err(),
        );
        assert_eq!(err, DomainError::not_found("classification"));
    }

    #[tokio::test]
    async fn name_availability_requires_a_name() {
        let (_, svc) = service();
        let id = svc.create(&top("Language")).await.unwrap();

        let err = domain(
            svc.is_name_available("   ", ClassificationScope::TopLevel, None)
                .await
                .unwrap_err(),
        );
        assert!(err.is_validation());

        assert!(!svc
            .is_name_available(" Language ", ClassificationScope::TopLevel, None)
            .await
            .unwrap());
        assert!(svc
            .is_name_available("Language", ClassificationScope::TopLevel, Some(id))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn store_failure_carries_context() {
        let (store, svc) = service();
        store.fail_operation("insert_classification");

        let err = svc.create(&top("A")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Store { context: "create classification", .. }));
    }
}
