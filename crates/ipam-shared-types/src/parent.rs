//! Parent spaces that children are carved out of

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::error::{SharedResult, SharedTypeError};

/// Primary key of a stored object
pub type ObjectId = u64;

/// Lowest assignable 802.1Q VLAN ID
pub const VLAN_VID_MIN: u16 = 1;
/// Highest assignable 802.1Q VLAN ID
pub const VLAN_VID_MAX: u16 = 4094;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParentKind {
    Prefix,
    IpRange,
    AsnRange,
    VlanGroup,
}

impl fmt::Display for ParentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentKind::Prefix => write!(f, "prefix"),
            ParentKind::IpRange => write!(f, "ip-range"),
            ParentKind::AsnRange => write!(f, "asn-range"),
            ParentKind::VlanGroup => write!(f, "vlan-group"),
        }
    }
}

impl FromStr for ParentKind {
    type Err = SharedTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "prefix" | "prefixes" => Ok(ParentKind::Prefix),
            "ip-range" | "ip-ranges" | "iprange" => Ok(ParentKind::IpRange),
            "asn-range" | "asn-ranges" | "asnrange" => Ok(ParentKind::AsnRange),
            "vlan-group" | "vlan-groups" | "vlangroup" => Ok(ParentKind::VlanGroup),
            _ => Err(SharedTypeError::Unsupported(format!("parent kind '{}'", s))),
        }
    }
}

/// Identity of a parent space: its kind plus primary key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParentRef {
    pub kind: ParentKind,
    pub id: ObjectId,
}

impl ParentRef {
    pub fn new(kind: ParentKind, id: ObjectId) -> Self {
        Self { kind, id }
    }

    pub fn prefix(id: ObjectId) -> Self {
        Self::new(ParentKind::Prefix, id)
    }

    pub fn ip_range(id: ObjectId) -> Self {
        Self::new(ParentKind::IpRange, id)
    }

    pub fn asn_range(id: ObjectId) -> Self {
        Self::new(ParentKind::AsnRange, id)
    }

    pub fn vlan_group(id: ObjectId) -> Self {
        Self::new(ParentKind::VlanGroup, id)
    }
}

impl fmt::Display for ParentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.kind, self.id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefixStatus {
    Container,
    #[default]
    Active,
    Reserved,
    Deprecated,
}

/// IP prefix
///
/// Prefixes act both as parents (carving smaller prefixes or handing out
/// addresses) and as children of a larger prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prefix {
    pub id: ObjectId,
    pub prefix: IpNet,
    pub vrf: Option<ObjectId>,
    #[serde(default)]
    pub status: PrefixStatus,
    /// All addresses, including network and broadcast, are usable
    #[serde(default)]
    pub is_pool: bool,
    pub tenant: Option<String>,
    pub description: Option<String>,
    pub created: DateTime<Utc>,
}

impl Prefix {
    /// Create a prefix; host bits of `prefix` are cleared
    pub fn new(id: ObjectId, prefix: IpNet) -> Self {
        Self {
            id,
            prefix: prefix.trunc(),
            vrf: None,
            status: PrefixStatus::Active,
            is_pool: false,
            tenant: None,
            description: None,
            created: Utc::now(),
        }
    }

    pub fn with_vrf(mut self, vrf: ObjectId) -> Self {
        self.vrf = Some(vrf);
        self
    }

    pub fn with_status(mut self, status: PrefixStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_pool(mut self, is_pool: bool) -> Self {
        self.is_pool = is_pool;
        self
    }

    /// 4 or 6
    pub fn family(&self) -> u8 {
        match self.prefix {
            IpNet::V4(_) => 4,
            IpNet::V6(_) => 6,
        }
    }

    /// A container in the global table sees children of every VRF
    pub fn spans_all_vrfs(&self) -> bool {
        self.vrf.is_none() && self.status == PrefixStatus::Container
    }
}

/// Arbitrary range of IP addresses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpRange {
    pub id: ObjectId,
    /// First address; its mask length is applied to addresses handed out
    pub start_address: IpNet,
    pub end_address: IpNet,
    pub vrf: Option<ObjectId>,
    /// Treat every address of the range as in use
    #[serde(default)]
    pub mark_populated: bool,
    pub tenant: Option<String>,
    pub description: Option<String>,
}

impl IpRange {
    pub fn new(id: ObjectId, start_address: IpNet, end_address: IpNet) -> SharedResult<Self> {
        let (start, end) = (start_address.addr(), end_address.addr());
        if start.is_ipv4() != end.is_ipv4() {
            return Err(SharedTypeError::InvalidValue {
                field: "end_address",
                value: format!("{} is not in the address family of {}", end, start),
            });
        }
        if start > end {
            return Err(SharedTypeError::InvalidValue {
                field: "end_address",
                value: format!("{} is lower than the starting address {}", end, start),
            });
        }

        Ok(Self {
            id,
            start_address,
            end_address,
            vrf: None,
            mark_populated: false,
            tenant: None,
            description: None,
        })
    }

    pub fn with_vrf(mut self, vrf: ObjectId) -> Self {
        self.vrf = Some(vrf);
        self
    }

    pub fn with_populated(mut self, mark_populated: bool) -> Self {
        self.mark_populated = mark_populated;
        self
    }

    pub fn start(&self) -> IpAddr {
        self.start_address.addr()
    }

    pub fn end(&self) -> IpAddr {
        self.end_address.addr()
    }

    pub fn mask_length(&self) -> u8 {
        self.start_address.prefix_len()
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        ip.is_ipv4() == self.start().is_ipv4() && *ip >= self.start() && *ip <= self.end()
    }
}

/// Range of autonomous system numbers delegated by one RIR
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsnRange {
    pub id: ObjectId,
    pub name: String,
    pub rir: ObjectId,
    pub start: u32,
    pub end: u32,
    pub tenant: Option<String>,
    pub description: Option<String>,
}

impl AsnRange {
    pub fn new(id: ObjectId, name: String, rir: ObjectId, start: u32, end: u32) -> SharedResult<Self> {
        if start == 0 {
            return Err(SharedTypeError::InvalidValue {
                field: "start",
                value: "ASN 0 is reserved".to_string(),
            });
        }
        if start > end {
            return Err(SharedTypeError::InvalidValue {
                field: "end",
                value: format!("{} is lower than the starting ASN {}", end, start),
            });
        }

        Ok(Self {
            id,
            name,
            rir,
            start,
            end,
            tenant: None,
            description: None,
        })
    }

    pub fn contains(&self, asn: u32) -> bool {
        asn >= self.start && asn <= self.end
    }
}

/// Inclusive range of VLAN IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VidRange {
    pub start: u16,
    pub end: u16,
}

impl VidRange {
    pub fn new(start: u16, end: u16) -> SharedResult<Self> {
        if start < VLAN_VID_MIN || end > VLAN_VID_MAX {
            return Err(SharedTypeError::InvalidValue {
                field: "vid_ranges",
                value: format!(
                    "{}-{} is outside {}-{}",
                    start, end, VLAN_VID_MIN, VLAN_VID_MAX
                ),
            });
        }
        if start > end {
            return Err(SharedTypeError::InvalidValue {
                field: "vid_ranges",
                value: format!("{}-{} is reversed", start, end),
            });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, vid: u16) -> bool {
        vid >= self.start && vid <= self.end
    }

    pub fn overlaps(&self, other: &VidRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl fmt::Display for VidRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

impl FromStr for VidRange {
    type Err = SharedTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim()
                .parse::<u16>()
                .map_err(|_| SharedTypeError::ParseError(format!("invalid VLAN ID '{}'", part)))
        };

        match s.split_once('-') {
            Some((start, end)) => VidRange::new(parse(start)?, parse(end)?),
            None => {
                let vid = parse(s)?;
                VidRange::new(vid, vid)
            }
        }
    }
}

/// Parse the `"100-199,300"` form into declared ranges
pub fn parse_vid_ranges(s: &str) -> SharedResult<Vec<VidRange>> {
    let ranges = s
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(VidRange::from_str)
        .collect::<SharedResult<Vec<_>>>()?;
    check_disjoint(&ranges)?;
    Ok(ranges)
}

pub fn format_vid_ranges(ranges: &[VidRange]) -> String {
    ranges
        .iter()
        .map(|range| range.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn check_disjoint(ranges: &[VidRange]) -> SharedResult<()> {
    for (i, range) in ranges.iter().enumerate() {
        if let Some(other) = ranges[i + 1..].iter().find(|other| range.overlaps(other)) {
            return Err(SharedTypeError::InvalidValue {
                field: "vid_ranges",
                value: format!("{} overlaps {}", range, other),
            });
        }
    }
    Ok(())
}

fn default_vid_ranges() -> Vec<VidRange> {
    vec![VidRange {
        start: VLAN_VID_MIN,
        end: VLAN_VID_MAX,
    }]
}

/// Group of VLANs sharing one or more VID ranges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VlanGroup {
    pub id: ObjectId,
    pub name: String,
    #[serde(default = "default_vid_ranges")]
    pub vid_ranges: Vec<VidRange>,
    pub description: Option<String>,
}

impl VlanGroup {
    /// Group spanning the whole 1-4094 VID space
    pub fn new(id: ObjectId, name: String) -> Self {
        Self {
            id,
            name,
            vid_ranges: default_vid_ranges(),
            description: None,
        }
    }

    /// Replace the declared ranges; declaration order is kept
    pub fn with_vid_ranges(mut self, vid_ranges: Vec<VidRange>) -> SharedResult<Self> {
        self.vid_ranges = vid_ranges;
        self.validate()?;
        Ok(self)
    }

    /// Deserialized groups skip the constructor checks
    pub fn validate(&self) -> SharedResult<()> {
        if self.vid_ranges.is_empty() {
            return Err(SharedTypeError::InvalidValue {
                field: "vid_ranges",
                value: "at least one range is required".to_string(),
            });
        }
        check_disjoint(&self.vid_ranges)
    }

    pub fn contains_vid(&self, vid: u16) -> bool {
        self.vid_ranges.iter().any(|range| range.contains(vid))
    }
}

/// Any parent space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ParentSpace {
    Prefix(Prefix),
    IpRange(IpRange),
    AsnRange(AsnRange),
    VlanGroup(VlanGroup),
}

impl ParentSpace {
    pub fn kind(&self) -> ParentKind {
        match self {
            ParentSpace::Prefix(_) => ParentKind::Prefix,
            ParentSpace::IpRange(_) => ParentKind::IpRange,
            ParentSpace::AsnRange(_) => ParentKind::AsnRange,
            ParentSpace::VlanGroup(_) => ParentKind::VlanGroup,
        }
    }

    pub fn id(&self) -> ObjectId {
        match self {
            ParentSpace::Prefix(prefix) => prefix.id,
            ParentSpace::IpRange(range) => range.id,
            ParentSpace::AsnRange(range) => range.id,
            ParentSpace::VlanGroup(group) => group.id,
        }
    }

    pub fn parent_ref(&self) -> ParentRef {
        ParentRef::new(self.kind(), self.id())
    }
}

impl From<Prefix> for ParentSpace {
    fn from(prefix: Prefix) -> Self {
        ParentSpace::Prefix(prefix)
    }
}

impl From<IpRange> for ParentSpace {
    fn from(range: IpRange) -> Self {
        ParentSpace::IpRange(range)
    }
}

impl From<AsnRange> for ParentSpace {
    fn from(range: AsnRange) -> Self {
        ParentSpace::AsnRange(range)
    }
}

impl From<VlanGroup> for ParentSpace {
    fn from(group: VlanGroup) -> Self {
        ParentSpace::VlanGroup(group)
    }
}
