//! IPAM allocation API
//!
//! REST endpoints listing and allocating prefixes, IP addresses, ASNs and
//! VLANs from their parents.

pub mod allocation;
pub mod context;
pub mod error;
pub mod payload;


pub use allocation::AllocationAPI;
pub use context::AppContext;
pub use error::{ApiError, ErrorResponse};
