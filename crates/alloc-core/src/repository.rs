//! Storage seam used by the allocation service

use async_trait::async_trait;
use ipam_shared_types::{ChildKind, ChildRecord, ParentRef, ParentSpace, Scope};

use crate::error::RepositoryError;

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Source of parents and sink for new children
///
/// `write_children` must apply a batch atomically: every record is stored
/// with a fresh id, or none is. Uniqueness constraints on the stored
/// children are the last line of defence against double allocation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Repository: Send + Sync {
    async fn parent(&self, parent: ParentRef) -> RepositoryResult<Option<ParentSpace>>;

    /// Existing children of `kind` that fall inside `parent` under `scope`
    async fn read_children(
        &self,
        parent: &ParentSpace,
        kind: ChildKind,
        scope: &Scope,
    ) -> RepositoryResult<Vec<ChildRecord>>;

    /// Store drafts and return them with assigned ids, in input order
    async fn write_children(
        &self,
        parent: ParentRef,
        batch: Vec<ChildRecord>,
    ) -> RepositoryResult<Vec<ChildRecord>>;
}
