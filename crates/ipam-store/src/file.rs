//! JSON file repository
//!
//! The whole inventory lives in one JSON document. Every mutation is
//! applied to a copy, written to `<path>.tmp` and renamed over the store,
//! and only then becomes visible in memory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ipam_alloc_core::{Repository, RepositoryResult};
use ipam_shared_types::{ChildKind, ChildRecord, ObjectId, ParentRef, ParentSpace, Scope};
use tokio::sync::RwLock;

use crate::inventory::{single, Inventory};

#[derive(Debug)]
pub struct JsonFileRepository {
    path: PathBuf,
    inventory: RwLock<Inventory>,
}

impl JsonFileRepository {
    /// Load the store at `path`; a missing file is an empty store
    pub async fn open(path: impl Into<PathBuf>) -> RepositoryResult<Self> {
        let path = path.into();
        let inventory = match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let inventory: Inventory = serde_json::from_str(&content)?;
                if let Err(e) = inventory.validate() {
                    log::warn!("Rejecting inventory at {}: {}", path.display(), e);
                    return Err(e);
                }
                log::info!("Loaded IPAM inventory from {}", path.display());
                inventory
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No inventory at {}, starting fresh", path.display());
                Inventory::new()
            }
            Err(e) => {
                log::warn!("Failed to load inventory from {}: {}", path.display(), e);
                return Err(e.into());
            }
        };

        Ok(Self {
            path,
            inventory: RwLock::new(inventory),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn snapshot(&self) -> Inventory {
        self.inventory.read().await.clone()
    }

    pub async fn insert_parent(&self, parent: impl Into<ParentSpace>) -> RepositoryResult<ParentRef> {
        let parent = parent.into();
        self.mutate(|inventory| inventory.insert_parent(parent)).await
    }

    pub async fn insert_child(&self, child: impl Into<ChildRecord>) -> RepositoryResult<ChildRecord> {
        let batch = vec![child.into()];
        let created = self.mutate(|inventory| inventory.insert_children(batch)).await?;
        single(created)
    }

    pub async fn delete_child(&self, kind: ChildKind, id: ObjectId) -> RepositoryResult<ChildRecord> {
        self.mutate(|inventory| inventory.remove_child(kind, id)).await
    }

    /// Apply `op` to a copy, persist it, then publish it
    async fn mutate<T>(
        &self,
        op: impl FnOnce(&mut Inventory) -> RepositoryResult<T>,
    ) -> RepositoryResult<T> {
        let mut inventory = self.inventory.write().await;
        let mut next = inventory.clone();
        let result = op(&mut next)?;
        self.save(&next).await?;
        *inventory = next;
        Ok(result)
    }

    async fn save(&self, inventory: &Inventory) -> RepositoryResult<()> {
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }

        let content = serde_json::to_string_pretty(inventory)?;
        let mut temp_path = self.path.clone().into_os_string();
        temp_path.push(".tmp");
        tokio::fs::write(&temp_path, content).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;

        log::debug!("Saved IPAM inventory to {}", self.path.display());
        Ok(())
    }
}

#[async_trait]
impl Repository for JsonFileRepository {
    async fn parent(&self, parent: ParentRef) -> RepositoryResult<Option<ParentSpace>> {
        Ok(self.inventory.read().await.parent(parent))
    }

    async fn read_children(
        &self,
        parent: &ParentSpace,
        kind: ChildKind,
        scope: &Scope,
    ) -> RepositoryResult<Vec<ChildRecord>> {
        self.inventory.read().await.children(parent, kind, scope)
    }

    async fn write_children(
        &self,
        parent: ParentRef,
        batch: Vec<ChildRecord>,
    ) -> RepositoryResult<Vec<ChildRecord>> {
        let created = self
            .mutate(|inventory| inventory.insert_children(batch))
            .await?;
        log::debug!(
            "Committed {} record(s) under {} to {}",
            created.len(),
            parent,
            self.path.display()
        );
        Ok(created)
    }
}
