use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use ipam_alloc_core::{AllocationService, AllocatorConfig, Repository};
use ipam_store::JsonFileRepository;

/// State shared by every handler
#[derive(Clone)]
pub struct AppContext {
    pub service: Arc<AllocationService>,
    pub started: DateTime<Utc>,
}

impl AppContext {
    pub fn new(repository: Arc<dyn Repository>, config: AllocatorConfig) -> Arc<Self> {
        Arc::new(Self {
            service: Arc::new(AllocationService::new(repository, config)),
            started: Utc::now(),
        })
    }

    /// Context backed by the JSON store at `store`
    pub async fn bootstrap(store: &Path, config: AllocatorConfig) -> Result<Arc<Self>> {
        let repository = JsonFileRepository::open(store)
            .await
            .with_context(|| format!("opening store {}", store.display()))?;
        log::info!("Serving allocations from {}", repository.path().display());
        Ok(Self::new(Arc::new(repository), config))
    }
}
