use std::sync::Arc;

use tracing::info;

use tutorhub_infra::services::{
    AttributeService, BrandService, ClassificationService, ContractService, RosterService,
};
use tutorhub_infra::store::{InMemoryStore, OrderLedger, PostgresStore, Store, StoreError};
use tutorhub_infra::DatabaseConfig;

/// Every manager the routes talk to, over one shared store.
pub struct AppServices {
    pub classifications: ClassificationService<dyn Store>,
    pub brands: BrandService<dyn Store>,
    pub attributes: AttributeService<dyn Store>,
    pub contracts: ContractService<dyn Store>,
    pub roster: RosterService<dyn Store, dyn OrderLedger>,
}

impl AppServices {
    pub fn new(store: Arc<dyn Store>, orders: Arc<dyn OrderLedger>) -> Self {
        Self {
            classifications: ClassificationService::new(store.clone()),
            brands: BrandService::new(store.clone()),
            attributes: AttributeService::new(store.clone()),
            contracts: ContractService::new(store.clone()),
            roster: RosterService::new(store, orders),
        }
    }

    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::new(store.clone(), store)
    }

    /// Postgres when a database is configured, in-memory otherwise.
    pub async fn from_config(database: Option<&DatabaseConfig>) -> Result<Self, StoreError> {
        let Some(db) = database else {
            info!("DATABASE_URL not set; using in-memory store");
            return Ok(Self::in_memory());
        };

        let store = Arc::new(PostgresStore::connect(&db.url, db.max_connections).await?);
        store.ensure_schema().await?;
        info!(max_connections = db.max_connections, "connected to postgres");
        Ok(Self::new(store.clone(), store))
    }
}
