use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use ipam_alloc_core::{AllocationService, AllocatorConfig};
use ipam_store::JsonFileRepository;

/// Store handle plus the allocation service running on top of it
pub struct Session {
    pub store: Arc<JsonFileRepository>,
    pub service: AllocationService,
}

impl Session {
    pub async fn open(store: &Path, config: AllocatorConfig) -> Result<Arc<Self>> {
        let repository = JsonFileRepository::open(store)
            .await
            .with_context(|| format!("opening store {}", store.display()))?;
        let repository = Arc::new(repository);

        Ok(Arc::new(Self {
            service: AllocationService::new(repository.clone(), config),
            store: repository,
        }))
    }
}
