//! In-memory repository

use std::sync::Arc;

use async_trait::async_trait;
use ipam_alloc_core::{Repository, RepositoryResult};
use ipam_shared_types::{ChildKind, ChildRecord, ObjectId, ParentRef, ParentSpace, Scope};
use tokio::sync::RwLock;

use crate::inventory::{single, Inventory};

/// Repository keeping its inventory in process memory
///
/// Clones share the same inventory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    inventory: Arc<RwLock<Inventory>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_inventory(inventory: Inventory) -> Self {
        Self {
            inventory: Arc::new(RwLock::new(inventory)),
        }
    }

    pub async fn insert_parent(&self, parent: impl Into<ParentSpace>) -> RepositoryResult<ParentRef> {
        self.inventory.write().await.insert_parent(parent.into())
    }

    /// Store a child outside of any allocation, e.g. to seed fixtures
    pub async fn insert_child(&self, child: impl Into<ChildRecord>) -> RepositoryResult<ChildRecord> {
        let created = self
            .inventory
            .write()
            .await
            .insert_children(vec![child.into()])?;
        single(created)
    }

    pub async fn delete_child(&self, kind: ChildKind, id: ObjectId) -> RepositoryResult<ChildRecord> {
        self.inventory.write().await.remove_child(kind, id)
    }

    pub async fn snapshot(&self) -> Inventory {
        self.inventory.read().await.clone()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
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
        let created = self.inventory.write().await.insert_children(batch)?;
        log::debug!("Committed {} record(s) under {}", created.len(), parent);
        Ok(created)
    }
}
