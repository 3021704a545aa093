//! Allocation service
//!
//! Listing reads a consistent-enough snapshot without locking. Allocation
//! holds the parent's guard from the moment children are read until the
//! batch is written, so concurrent batches against one parent never see
//! each other's free space.

use std::sync::Arc;

use ipam_shared_types::{
    Asn, AsnRequest, AvailableAsn, AvailableIp, AvailablePrefix, AvailableVlan, ChildRecord,
    IpAddress, IpAddressRequest, ObjectId, ParentRef, ParentSpace, Prefix, PrefixRequest, Vlan,
    VlanRequest,
};

use crate::allocator::{Allocator, AsnPicker, IpPicker, PrefixSplitter, VlanPicker};
use crate::config::AllocatorConfig;
use crate::error::{AllocationError, RepositoryError, Result};
use crate::guard::ParentGuard;
use crate::repository::Repository;

pub struct AllocationService {
    repository: Arc<dyn Repository>,
    guard: ParentGuard,
    config: AllocatorConfig,
}

impl AllocationService {
    pub fn new(repository: Arc<dyn Repository>, config: AllocatorConfig) -> Self {
        Self {
            repository,
            guard: ParentGuard::new(),
            config,
        }
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    pub fn guard(&self) -> &ParentGuard {
        &self.guard
    }

    /// Free units of `parent`, ascending, at most `limit` (0 meaning all)
    pub async fn list_available<A: Allocator>(
        &self,
        parent: ParentRef,
        limit: Option<usize>,
    ) -> Result<Vec<A::Unit>> {
        let space = self.load_parent(parent).await?;
        let allocator = A::from_parent(space.clone())?;
        let children = self
            .repository
            .read_children(&space, allocator.child_kind(), &allocator.scope())
            .await?;

        let free = allocator.free_space(&children)?;
        allocator.available(&free, self.config.resolve_limit(limit))
    }

    /// Create one child per request, all or nothing, in request order
    pub async fn allocate<A: Allocator>(
        &self,
        parent: ParentRef,
        requests: &[A::Request],
    ) -> Result<Vec<A::Record>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let lease = self.guard.acquire(parent, self.config.guard_timeout()).await?;

        let space = self.load_parent(parent).await?;
        let allocator = A::from_parent(space.clone())?;
        let kind = allocator.child_kind();
        let children = self
            .repository
            .read_children(&space, kind, &allocator.scope())
            .await?;
        let free = allocator.free_space(&children)?;
        let drafts = allocator.allocate(free, requests)?;

        let created = self
            .repository
            .write_children(parent, drafts)
            .await
            .map_err(|err| {
                log::warn!("Write of {} batch to {} rejected: {}", kind, parent, err);
                AllocationError::Conflict {
                    parent,
                    message: err.to_string(),
                }
            })?;
        drop(lease);

        log::info!("Allocated {} {} record(s) from {}", created.len(), kind, parent);
        created
            .into_iter()
            .map(|record| {
                <A::Record as TryFrom<ChildRecord>>::try_from(record)
                    .map_err(|err| AllocationError::from(RepositoryError::from(err)))
            })
            .collect()
    }

    async fn load_parent(&self, parent: ParentRef) -> Result<ParentSpace> {
        self.repository
            .parent(parent)
            .await?
            .ok_or(AllocationError::ParentNotFound { parent })
    }

    pub async fn available_prefixes(
        &self,
        prefix: ObjectId,
        limit: Option<usize>,
    ) -> Result<Vec<AvailablePrefix>> {
        self.list_available::<PrefixSplitter>(ParentRef::prefix(prefix), limit)
            .await
    }

    pub async fn available_prefix_ips(
        &self,
        prefix: ObjectId,
        limit: Option<usize>,
    ) -> Result<Vec<AvailableIp>> {
        self.list_available::<IpPicker>(ParentRef::prefix(prefix), limit)
            .await
    }

    pub async fn available_range_ips(
        &self,
        range: ObjectId,
        limit: Option<usize>,
    ) -> Result<Vec<AvailableIp>> {
        self.list_available::<IpPicker>(ParentRef::ip_range(range), limit)
            .await
    }

    pub async fn available_asns(
        &self,
        range: ObjectId,
        limit: Option<usize>,
    ) -> Result<Vec<AvailableAsn>> {
        self.list_available::<AsnPicker>(ParentRef::asn_range(range), limit)
            .await
    }

    pub async fn available_vlans(
        &self,
        group: ObjectId,
        limit: Option<usize>,
    ) -> Result<Vec<AvailableVlan>> {
        self.list_available::<VlanPicker>(ParentRef::vlan_group(group), limit)
            .await
    }

    pub async fn allocate_prefixes(
        &self,
        prefix: ObjectId,
        requests: &[PrefixRequest],
    ) -> Result<Vec<Prefix>> {
        self.allocate::<PrefixSplitter>(ParentRef::prefix(prefix), requests)
            .await
    }

    pub async fn allocate_prefix_ips(
        &self,
        prefix: ObjectId,
        requests: &[IpAddressRequest],
    ) -> Result<Vec<IpAddress>> {
        self.allocate::<IpPicker>(ParentRef::prefix(prefix), requests)
            .await
    }

    pub async fn allocate_range_ips(
        &self,
        range: ObjectId,
        requests: &[IpAddressRequest],
    ) -> Result<Vec<IpAddress>> {
        self.allocate::<IpPicker>(ParentRef::ip_range(range), requests)
            .await
    }

    pub async fn allocate_asns(&self, range: ObjectId, requests: &[AsnRequest]) -> Result<Vec<Asn>> {
        self.allocate::<AsnPicker>(ParentRef::asn_range(range), requests)
            .await
    }

    pub async fn allocate_vlans(
        &self,
        group: ObjectId,
        requests: &[VlanRequest],
    ) -> Result<Vec<Vlan>> {
        self.allocate::<VlanPicker>(ParentRef::vlan_group(group), requests)
            .await
    }
}

impl std::fmt::Debug for AllocationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllocationService")
            .field("guard", &self.guard)
            .field("config", &self.config)
            .finish()
    }
}

