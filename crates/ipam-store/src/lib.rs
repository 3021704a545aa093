//! Repositories for the IPAM allocation service
//!
//! Both repositories enforce the uniqueness a relational store would:
//! one prefix or address per VRF, one ASN overall, one VID per VLAN group.
//! Batches are written atomically.

pub mod file;
pub mod inventory;
pub mod memory;


pub use file::JsonFileRepository;
pub use inventory::Inventory;
pub use memory::InMemoryRepository;
