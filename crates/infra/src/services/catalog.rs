use std::sync::Arc;

use tracing::{info, instrument};

use tutorhub_catalog::{Attribute, AttributeDraft, Brand, BrandDraft, RecordStatus, normalize_values};
use tutorhub_core::{AttributeId, BrandId, Entity};

use super::{ServiceResult, StoreContext};
use crate::store::{AttributeStore, BrandStore};

pub struct BrandService<S: ?Sized> {
    store: Arc<S>,
}

impl<S> BrandService<S>
where
    S: BrandStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, draft), fields(name = %draft.name), err)]
    pub async fn create(&self, draft: &BrandDraft) -> ServiceResult<BrandId> {
        let id = self.store.insert_brand(&draft.name).await.context("create brand")?;
        info!(brand_id = %id, "brand created");
        Ok(id)
    }

    pub async fn get(&self, id: BrandId) -> ServiceResult<Brand> {
        self.store
            .get_brand(id)
            .await
            .context("get brand")?
            .ok_or_else(|| Brand::missing().into())
    }

    pub async fn list(&self) -> ServiceResult<Vec<Brand>> {
        self.store.list_brands().await.context("list brands")
    }

    #[instrument(skip(self), fields(id = %id, status = ?status), err)]
    pub async fn toggle_status(&self, id: BrandId, status: RecordStatus) -> ServiceResult<()> {
        if !self
            .store
            .set_brand_status(id, status)
            .await
            .context("toggle brand status")?
        {
            return Err(Brand::missing().into());
        }
        info!(brand_id = %id, "brand status changed");
        Ok(())
    }
}

/// Attribute manager. The value set is only ever replaced as a whole.
pub struct AttributeService<S: ?Sized> {
    store: Arc<S>,
}

impl<S> AttributeService<S>
where
    S: AttributeStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, draft), fields(name = %draft.name, value_count = draft.values.len()), err)]
    pub async fn create(&self, draft: &AttributeDraft) -> ServiceResult<AttributeId> {
        let id = self
            .store
            .insert_attribute(draft)
            .await
            .context("create attribute")?;
        info!(attribute_id = %id, "attribute created");
        Ok(id)
    }

    pub async fn get(&self, id: AttributeId) -> ServiceResult<Attribute> {
        self.store
            .get_attribute(id)
            .await
            .context("get attribute")?
            .ok_or_else(|| Attribute::missing().into())
    }

    pub async fn list(&self) -> ServiceResult<Vec<Attribute>> {
        self.store.list_attributes().await.context("list attributes")
    }

    #[instrument(skip(self), fields(id = %id), err)]
    pub async fn rename(&self, id: AttributeId, name: &str) -> ServiceResult<()> {
        let name = tutorhub_core::coerce::required_text("name", name)?;
        if !self
            .store
            .rename_attribute(id, &name)
            .await
            .context("rename attribute")?
        {
            return Err(Attribute::missing().into());
        }
        info!(attribute_id = %id, "attribute renamed");
        Ok(())
    }

    /// Swap the whole value set. Either every old value is gone and every new
    /// one present, or nothing changed.
    #[instrument(skip(self, values), fields(id = %id, value_count = values.len()), err)]
    pub async fn replace_values<V: AsRef<str> + Sync>(
        &self,
        id: AttributeId,
        values: &[V],
    ) -> ServiceResult<Vec<String>> {
        let values = normalize_values(values)?;
        self.get(id).await?;
        self.store
            .replace_attribute_values(id, &values)
            .await
            .context("replace attribute values")?;
        info!(attribute_id = %id, "attribute values replaced");
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceError;
    use crate::store::InMemoryStore;
    use tutorhub_core::DomainError;

    #[tokio::test]
    async fn brand_lifecycle() {
        let svc = BrandService::new(Arc::new(InMemoryStore::new()));
        let id = svc.create(&BrandDraft::new(" Acme ").unwrap()).await.unwrap();
        assert_eq!(svc.get(id).await.unwrap().name, "Acme");

        svc.toggle_status(id, RecordStatus::Disabled).await.unwrap();
        assert_eq!(svc.get(id).await.unwrap().status, RecordStatus::Disabled);

        let err = svc.toggle_status(BrandId::new(5), RecordStatus::Active).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound("brand"))));
    }

    #[tokio::test]
    async fn replace_values_swaps_the_whole_set() {
        let svc = AttributeService::new(Arc::new(InMemoryStore::new()));
        let id = svc
            .create(&AttributeDraft::new("Size", &["S", "M"]).unwrap())
            .await
            .unwrap();

        let stored = svc.replace_values(id, &["L", " XL ", "L"]).await.unwrap();
        assert_eq!(stored, vec!["L", "XL"]);
        assert_eq!(svc.get(id).await.unwrap().values, vec!["L", "XL"]);
    }

    #[tokio::test]
    async fn failed_replacement_keeps_old_values() {
        let store = Arc::new(InMemoryStore::new());
        let svc = AttributeService::new(store.clone());
        let id = svc
            .create(&AttributeDraft::new("Size", &["S", "M"]).unwrap())
            .await
            .unwrap();
        store.fail_operation("replace_attribute_values");

        let err = svc.replace_values(id, &["L"]).await.unwrap_err();
        assert!(matches!(err, ServiceError::Store { .. }));
        assert_eq!(svc.get(id).await.unwrap().values, vec!["S", "M"]);
    }

    #[tokio::test]
    async fn replace_values_rejects_blank_and_missing() {
        let svc = AttributeService::new(Arc::new(InMemoryStore::new()));
        let err = svc.replace_values(AttributeId::new(1), &["ok", " "]).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));

        let err = svc.replace_values(AttributeId::new(1), &["ok"]).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound("attribute"))));
    }

    #[tokio::test]
    async fn rename_trims_and_requires_name() {
        let svc = AttributeService::new(Arc::new(InMemoryStore::new()));
        let id = svc
            .create(&AttributeDraft::new("Size", &["S"]).unwrap())
            .await
            .unwrap();
        svc.rename(id, "  Fit ").await.unwrap();
        assert_eq!(svc.get(id).await.unwrap().name, "Fit");
        assert!(svc.rename(id, "").await.is_err());
    }
}
