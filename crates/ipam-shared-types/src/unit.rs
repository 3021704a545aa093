//! Descriptors of free units returned by "list available"

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::parent::ObjectId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailablePrefix {
    pub family: u8,
    pub prefix: IpNet,
    pub vrf: Option<ObjectId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableIp {
    pub family: u8,
    pub address: IpNet,
    pub vrf: Option<ObjectId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableAsn {
    pub rir: ObjectId,
    pub asn: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableVlan {
    pub group: ObjectId,
    pub vid: u16,
}
