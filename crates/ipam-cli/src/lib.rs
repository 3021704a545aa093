//! IPAM allocation CLI
//!
//! Operator tooling over the JSON inventory: seed parents, list and
//! allocate free prefixes, addresses, ASNs and VLANs, release records and
//! manage the allocator configuration.

pub mod commands;
pub mod session;


pub use session::Session;
