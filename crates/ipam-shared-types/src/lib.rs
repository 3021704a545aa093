pub mod error;
pub mod parent;
pub mod record;
pub mod request;
pub mod scope;
pub mod unit;

pub use error::{SharedResult, SharedTypeError};
pub use parent::{
    format_vid_ranges, parse_vid_ranges, AsnRange, IpRange, ObjectId, ParentKind, ParentRef,
    ParentSpace, Prefix, PrefixStatus, VidRange, VlanGroup, VLAN_VID_MAX, VLAN_VID_MIN,
};
pub use record::{Asn, ChildKind, ChildRecord, IpAddress, Vlan, UNASSIGNED_ID};
pub use request::{AsnRequest, IpAddressRequest, PrefixRequest, VlanRequest};
pub use scope::Scope;
pub use unit::{AvailableAsn, AvailableIp, AvailablePrefix, AvailableVlan};
