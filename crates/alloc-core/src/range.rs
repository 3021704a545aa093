//! Closed intervals over address and number spaces
//!
//! Every coordinate is carried as a `u128`: IPv4 and IPv6 addresses by their
//! integer value, ASNs and VLAN IDs as-is. An [`Interval`] is tagged with the
//! [`Family`] it belongs to and operations refuse to mix families.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::error::{AllocationError, Result};
use crate::gaps::GapFinder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Ipv4,
    Ipv6,
    Asn,
    Vid,
}

impl Family {
    /// Width of the coordinate space in bits
    pub fn bits(self) -> u32 {
        match self {
            Family::Ipv4 => 32,
            Family::Ipv6 => 128,
            Family::Asn => 32,
            Family::Vid => 12,
        }
    }

    pub fn max_value(self) -> u128 {
        block_span(self.bits())
    }

    pub fn of_addr(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Family::Ipv4,
            IpAddr::V6(_) => Family::Ipv6,
        }
    }

    pub fn of_net(net: &IpNet) -> Self {
        match net {
            IpNet::V4(_) => Family::Ipv4,
            IpNet::V6(_) => Family::Ipv6,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::Ipv4 => write!(f, "IPv4"),
            Family::Ipv6 => write!(f, "IPv6"),
            Family::Asn => write!(f, "ASN"),
            Family::Vid => write!(f, "VLAN ID"),
        }
    }
}

/// Offset of the last value in an aligned block of `2^host_bits` values
pub(crate) fn block_span(host_bits: u32) -> u128 {
    if host_bits >= 128 {
        u128::MAX
    } else {
        (1u128 << host_bits) - 1
    }
}

pub fn addr_to_value(addr: IpAddr) -> u128 {
    match addr {
        IpAddr::V4(v4) => u128::from(u32::from(v4)),
        IpAddr::V6(v6) => u128::from(v6),
    }
}

/// Inverse of [`addr_to_value`]; IPv4 values are truncated to 32 bits
pub fn value_to_addr(value: u128, ipv4: bool) -> IpAddr {
    if ipv4 {
        IpAddr::V4(Ipv4Addr::from(value as u32))
    } else {
        IpAddr::V6(Ipv6Addr::from(value))
    }
}

/// Closed interval `[low, high]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    family: Family,
    low: u128,
    high: u128,
}

impl Interval {
    pub fn new(family: Family, low: u128, high: u128) -> Result<Self> {
        if low > high {
            return Err(AllocationError::invalid_range(format!(
                "lower bound {} is above upper bound {}",
                low, high
            )));
        }
        if high > family.max_value() {
            return Err(AllocationError::invalid_range(format!(
                "{} exceeds the {} space",
                high, family
            )));
        }
        Ok(Self::with_bounds(family, low, high))
    }

    pub fn single(family: Family, value: u128) -> Result<Self> {
        Self::new(family, value, value)
    }

    /// Network through broadcast address of `net`
    pub fn from_net(net: &IpNet) -> Self {
        Self::with_bounds(
            Family::of_net(net),
            addr_to_value(net.network()),
            addr_to_value(net.broadcast()),
        )
    }

    pub fn from_addrs(start: IpAddr, end: IpAddr) -> Result<Self> {
        let (family, other) = (Family::of_addr(&start), Family::of_addr(&end));
        if family != other {
            return Err(AllocationError::FamilyMismatch {
                expected: family,
                found: other,
            });
        }
        Self::new(family, addr_to_value(start), addr_to_value(end))
    }

    pub fn addr(addr: IpAddr) -> Self {
        let value = addr_to_value(addr);
        Self::with_bounds(Family::of_addr(&addr), value, value)
    }

    /// Bounds are trusted to be ordered and inside the family
    pub(crate) fn with_bounds(family: Family, low: u128, high: u128) -> Self {
        debug_assert!(low <= high && high <= family.max_value());
        Self { family, low, high }
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn low(&self) -> u128 {
        self.low
    }

    pub fn high(&self) -> u128 {
        self.high
    }

    /// Number of values; saturates for the whole IPv6 space
    pub fn size(&self) -> u128 {
        (self.high - self.low).saturating_add(1)
    }

    pub fn contains_value(&self, value: u128) -> bool {
        value >= self.low && value <= self.high
    }

    pub fn contains(&self, other: &Interval) -> Result<bool> {
        self.check_family(other)?;
        Ok(self.low <= other.low && other.high <= self.high)
    }

    pub fn overlaps(&self, other: &Interval) -> Result<bool> {
        self.check_family(other)?;
        Ok(self.low <= other.high && other.low <= self.high)
    }

    /// Largest aligned power-of-two blocks covering the interval, ascending
    pub fn blocks(&self) -> Blocks {
        Blocks {
            family: self.family,
            next: Some(self.low),
            high: self.high,
        }
    }

    pub(crate) fn check_family(&self, other: &Interval) -> Result<()> {
        if self.family != other.family {
            return Err(AllocationError::FamilyMismatch {
                expected: self.family,
                found: other.family,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.family {
            Family::Ipv4 | Family::Ipv6 => {
                let ipv4 = self.family == Family::Ipv4;
                write!(
                    f,
                    "{}-{}",
                    value_to_addr(self.low, ipv4),
                    value_to_addr(self.high, ipv4)
                )
            }
            Family::Asn | Family::Vid => write!(f, "{}-{}", self.low, self.high),
        }
    }
}

/// CIDR-style decomposition of an interval
///
/// Yields `(start, prefix_length)` pairs where the prefix length is relative
/// to the family width.
#[derive(Debug, Clone)]
pub struct Blocks {
    family: Family,
    next: Option<u128>,
    high: u128,
}

impl Iterator for Blocks {
    type Item = (u128, u8);

    fn next(&mut self) -> Option<Self::Item> {
        let low = self.next?;
        if low > self.high {
            self.next = None;
            return None;
        }

        let bits = self.family.bits();
        let aligned = if low == 0 {
            bits
        } else {
            low.trailing_zeros().min(bits)
        };
        let remaining = self.high - low;
        let fits = if remaining == u128::MAX {
            128
        } else {
            127 - (remaining + 1).leading_zeros()
        };
        let host_bits = aligned.min(fits);

        let end = low + block_span(host_bits);
        self.next = end.checked_add(1);
        Some((low, (bits - host_bits) as u8))
    }
}

pub fn contains(a: &Interval, b: &Interval) -> Result<bool> {
    a.contains(b)
}

pub fn overlaps(a: &Interval, b: &Interval) -> Result<bool> {
    a.overlaps(b)
}

/// Free parts of `universe` once `occupied` is removed, ascending
pub fn subtract(universe: &Interval, occupied: &[Interval]) -> Result<Vec<Interval>> {
    let finder = GapFinder::new(*universe, occupied.to_vec())?;
    Ok(finder.gaps().collect())
}

pub fn size(interval: &Interval) -> u128 {
    interval.size()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v4(low: &str, high: &str) -> Interval {
        Interval::from_addrs(low.parse().unwrap(), high.parse().unwrap()).unwrap()
    }

    #[test]
    fn test_interval_validation() {
        assert!(Interval::new(Family::Asn, 10, 5).is_err());
        assert!(Interval::new(Family::Vid, 1, 4095).is_ok());
        assert!(matches!(
            Interval::new(Family::Vid, 1, 4096),
            Err(AllocationError::InvalidRange { .. })
        ));
        assert!(matches!(
            Interval::from_addrs("192.0.2.1".parse().unwrap(), "2001:db8::1".parse().unwrap()),
            Err(AllocationError::FamilyMismatch { .. })
        ));
    }

    #[test]
    fn test_containment_and_overlap() {
        let outer = Interval::from_net(&"192.0.2.0/24".parse().unwrap());
        let inner = Interval::from_net(&"192.0.2.64/26".parse().unwrap());
        let other = v4("192.0.2.250", "192.0.3.5");

        assert!(contains(&outer, &inner).unwrap());
        assert!(!contains(&inner, &outer).unwrap());
        assert!(overlaps(&outer, &other).unwrap());
        assert!(!overlaps(&inner, &other).unwrap());

        let asns = Interval::new(Family::Asn, 1, 10).unwrap();
        assert!(matches!(
            outer.contains(&asns),
            Err(AllocationError::FamilyMismatch {
                expected: Family::Ipv4,
                found: Family::Asn
            })
        ));
    }

    #[test]
    fn test_size() {
        assert_eq!(size(&Interval::from_net(&"192.0.2.0/24".parse().unwrap())), 256);
        assert_eq!(size(&Interval::single(Family::Asn, 7).unwrap()), 1);
        assert_eq!(
            Interval::from_net(&"::/0".parse().unwrap()).size(),
            u128::MAX
        );
    }

    #[test]
    fn test_subtract() {
        let universe = Interval::new(Family::Asn, 101, 110).unwrap();
        let occupied = vec![
            Interval::single(Family::Asn, 105).unwrap(),
            Interval::new(Family::Asn, 101, 102).unwrap(),
        ];

        let free = subtract(&universe, &occupied).unwrap();
        assert_eq!(
            free,
            vec![
                Interval::new(Family::Asn, 103, 104).unwrap(),
                Interval::new(Family::Asn, 106, 110).unwrap(),
            ]
        );
    }

    #[test]
    fn test_blocks_decomposition() {
        let blocks: Vec<String> = v4("192.0.2.1", "192.0.2.255")
            .blocks()
            .map(|(start, len)| format!("{}/{}", value_to_addr(start, true), len))
            .collect();
        assert_eq!(
            blocks,
            vec![
                "192.0.2.1/32",
                "192.0.2.2/31",
                "192.0.2.4/30",
                "192.0.2.8/29",
                "192.0.2.16/28",
                "192.0.2.32/27",
                "192.0.2.64/26",
                "192.0.2.128/25",
            ]
        );

        let whole: Vec<(u128, u8)> = Interval::from_net(&"::/0".parse().unwrap())
            .blocks()
            .collect();
        assert_eq!(whole, vec![(0, 0)]);

        let tail: Vec<(u128, u8)> = Interval::new(Family::Ipv4, 0xffff_fffe, 0xffff_ffff)
            .unwrap()
            .blocks()
            .collect();
        assert_eq!(tail, vec![(0xffff_fffe, 31)]);
    }

    #[test]
    fn test_display() {
        assert_eq!(v4("192.0.2.1", "192.0.2.3").to_string(), "192.0.2.1-192.0.2.3");
        assert_eq!(
            Interval::new(Family::Vid, 100, 199).unwrap().to_string(),
            "100-199"
        );
    }
}
