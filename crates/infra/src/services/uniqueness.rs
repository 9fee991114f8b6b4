use tutorhub_catalog::ClassificationScope;
use tutorhub_core::ClassificationId;

use crate::store::{ClassificationStore, StoreResult};

/// Whether no classification other than `exclude` is named `name` in `scope`.
///
/// Read-only; the caller's subsequent write is not protected against a
/// concurrent insert of the same name.
pub async fn is_name_unique<S>(
    store: &S,
    name: &str,
    scope: ClassificationScope,
    exclude: Option<ClassificationId>,
) -> StoreResult<bool>
where
    S: ClassificationStore + ?Sized,
{
    Ok(store.count_named_in_scope(name, scope, exclude).await? == 0)
}
