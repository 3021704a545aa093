//! Allocators turning free space into new child records
//!
//! One allocator exists per child kind. Each is built from a freshly loaded
//! parent, describes which universes the parent offers and which existing
//! children occupy them, then either lists free units or carves a batch.

mod asn;
mod ip;
mod prefix;
mod vlan;

pub use asn::AsnPicker;
pub use ip::IpPicker;
pub use prefix::PrefixSplitter;
pub use vlan::VlanPicker;

use ipam_shared_types::{ChildKind, ChildRecord, ParentRef, ParentSpace, Scope, SharedTypeError};

use crate::error::{AllocationError, Result};
use crate::gaps::FreeSpace;
use crate::range::Interval;

pub trait Allocator: Sized + Send + Sync {
    /// One entry per child to create
    type Request: Send + Sync;
    /// Descriptor of a free unit
    type Unit: Send;
    /// Stored form of a created child
    type Record: TryFrom<ChildRecord, Error = SharedTypeError> + Send;

    fn from_parent(parent: ParentSpace) -> Result<Self>;

    fn parent(&self) -> ParentRef;

    fn child_kind(&self) -> ChildKind;

    /// Which existing children are visible to this parent
    fn scope(&self) -> Scope;

    /// Spaces children are carved from, in walk order
    fn universes(&self) -> Result<Vec<Interval>>;

    /// Interval taken by `child`, if it counts against this parent
    fn occupied(&self, child: &ChildRecord) -> Option<Interval>;

    /// Up to `limit` free units in ascending order
    fn available(&self, space: &FreeSpace, limit: usize) -> Result<Vec<Self::Unit>>;

    /// Draft records for every request, in request order, or an error with
    /// nothing drafted
    fn allocate(&self, space: FreeSpace, requests: &[Self::Request]) -> Result<Vec<ChildRecord>>;

    fn free_space(&self, children: &[ChildRecord]) -> Result<FreeSpace> {
        let occupied = children
            .iter()
            .filter_map(|child| self.occupied(child))
            .collect();
        FreeSpace::new(self.universes()?, occupied)
    }
}

/// Lowest `count` free values, or a capacity error when fewer exist
pub(crate) fn take_units(space: &FreeSpace, count: usize) -> Result<Vec<u128>> {
    let available = space.available();
    if count as u128 > available {
        return Err(AllocationError::Capacity {
            requested: count,
            available,
        });
    }
    Ok(space.units().take(count).collect())
}

pub(crate) fn unsupported(parent: &ParentSpace, child: ChildKind) -> AllocationError {
    AllocationError::UnsupportedParent {
        parent: parent.kind(),
        child,
    }
}
