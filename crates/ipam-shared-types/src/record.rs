//! Child allocations carved out of a parent space

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::error::SharedTypeError;
use crate::parent::{ObjectId, Prefix};

/// Id carried by records that have not been stored yet
pub const UNASSIGNED_ID: ObjectId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChildKind {
    Prefix,
    IpAddress,
    Asn,
    Vlan,
}

impl ChildKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChildKind::Prefix => "prefix",
            ChildKind::IpAddress => "ip-address",
            ChildKind::Asn => "asn",
            ChildKind::Vlan => "vlan",
        }
    }
}

impl fmt::Display for ChildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single IP address with the mask length of the network it lives in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpAddress {
    pub id: ObjectId,
    pub address: IpNet,
    pub vrf: Option<ObjectId>,
    pub tenant: Option<String>,
    pub description: Option<String>,
    pub created: DateTime<Utc>,
}

impl IpAddress {
    pub fn new(id: ObjectId, address: IpNet) -> Self {
        Self {
            id,
            address,
            vrf: None,
            tenant: None,
            description: None,
            created: Utc::now(),
        }
    }

    pub fn with_vrf(mut self, vrf: ObjectId) -> Self {
        self.vrf = Some(vrf);
        self
    }

    pub fn addr(&self) -> IpAddr {
        self.address.addr()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asn {
    pub id: ObjectId,
    pub asn: u32,
    pub rir: ObjectId,
    pub tenant: Option<String>,
    pub description: Option<String>,
    pub created: DateTime<Utc>,
}

impl Asn {
    pub fn new(id: ObjectId, asn: u32, rir: ObjectId) -> Self {
        Self {
            id,
            asn,
            rir,
            tenant: None,
            description: None,
            created: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vlan {
    pub id: ObjectId,
    pub vid: u16,
    pub name: String,
    pub group: ObjectId,
    pub tenant: Option<String>,
    pub description: Option<String>,
    pub created: DateTime<Utc>,
}

impl Vlan {
    pub fn new(id: ObjectId, vid: u16, name: String, group: ObjectId) -> Self {
        Self {
            id,
            vid,
            name,
            group,
            tenant: None,
            description: None,
            created: Utc::now(),
        }
    }
}

/// Any child record
///
/// Records handed to a repository for writing carry [`UNASSIGNED_ID`];
/// the repository assigns ids on commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ChildRecord {
    Prefix(Prefix),
    IpAddress(IpAddress),
    Asn(Asn),
    Vlan(Vlan),
}

impl ChildRecord {
    pub fn kind(&self) -> ChildKind {
        match self {
            ChildRecord::Prefix(_) => ChildKind::Prefix,
            ChildRecord::IpAddress(_) => ChildKind::IpAddress,
            ChildRecord::Asn(_) => ChildKind::Asn,
            ChildRecord::Vlan(_) => ChildKind::Vlan,
        }
    }

    pub fn id(&self) -> ObjectId {
        match self {
            ChildRecord::Prefix(prefix) => prefix.id,
            ChildRecord::IpAddress(ip) => ip.id,
            ChildRecord::Asn(asn) => asn.id,
            ChildRecord::Vlan(vlan) => vlan.id,
        }
    }

    pub fn set_id(&mut self, id: ObjectId) {
        match self {
            ChildRecord::Prefix(prefix) => prefix.id = id,
            ChildRecord::IpAddress(ip) => ip.id = id,
            ChildRecord::Asn(asn) => asn.id = id,
            ChildRecord::Vlan(vlan) => vlan.id = id,
        }
    }
}

macro_rules! child_conversions {
    ($variant:ident, $ty:ty, $name:literal) => {
        impl From<$ty> for ChildRecord {
            fn from(record: $ty) -> Self {
                ChildRecord::$variant(record)
            }
        }

        impl TryFrom<ChildRecord> for $ty {
            type Error = SharedTypeError;

            fn try_from(record: ChildRecord) -> Result<Self, Self::Error> {
                match record {
                    ChildRecord::$variant(inner) => Ok(inner),
                    other => Err(SharedTypeError::WrongKind {
                        expected: $name,
                        found: other.kind().as_str(),
                    }),
                }
            }
        }
    };
}

child_conversions!(Prefix, Prefix, "prefix");
child_conversions!(IpAddress, IpAddress, "ip-address");
child_conversions!(Asn, Asn, "asn");
child_conversions!(Vlan, Vlan, "vlan");
