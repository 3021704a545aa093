//! IPAM allocation core
//!
//! Computes free space inside prefixes, IP ranges, ASN ranges and VLAN
//! groups, and turns it into new children exactly once per unit even when
//! clients race each other.

pub mod allocator;
pub mod config;
pub mod error;
pub mod gaps;
pub mod guard;
pub mod range;
pub mod repository;
pub mod service;

#[cfg(test)]
mod tests;

pub use allocator::{Allocator, AsnPicker, IpPicker, PrefixSplitter, VlanPicker};
pub use config::{AllocatorConfig, ConfigError};
pub use error::{AllocationError, ErrorClass, RepositoryError, Result};
pub use gaps::{EdgeExclusion, FreeSpace, GapFinder};
pub use guard::{GuardState, ParentGuard, ParentLease};
pub use range::{Family, Interval};
pub use repository::{Repository, RepositoryResult};
pub use service::AllocationService;
