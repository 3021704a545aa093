//! Free-space computation inside a parent
//!
//! [`GapFinder`] walks the occupied intervals of one universe in ascending
//! order and yields the complement lazily, so a nearly empty IPv6 /48 costs
//! no more than a single gap. [`FreeSpace`] chains several finders for
//! parents made of more than one range (VLAN groups).

use ipnet::IpNet;

use crate::error::Result;
use crate::range::Interval;

/// Edge addresses of a prefix that are never handed out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeExclusion {
    pub first: bool,
    pub last: bool,
}

impl EdgeExclusion {
    pub const NONE: Self = Self {
        first: false,
        last: false,
    };

    /// IPv4 loses network and broadcast, IPv6 the subnet-router anycast
    /// address. Pools and point-to-point sized prefixes lose nothing.
    pub fn for_prefix(net: &IpNet, is_pool: bool) -> Self {
        if is_pool {
            return Self::NONE;
        }
        match net {
            IpNet::V4(v4) if v4.prefix_len() < 31 => Self {
                first: true,
                last: true,
            },
            IpNet::V6(v6) if v6.prefix_len() < 127 => Self {
                first: true,
                last: false,
            },
            _ => Self::NONE,
        }
    }

    /// Shrink `universe`; `None` when nothing is left
    pub fn apply(&self, universe: Interval) -> Option<Interval> {
        let low = if self.first {
            universe.low().checked_add(1)?
        } else {
            universe.low()
        };
        let high = if self.last {
            universe.high().checked_sub(1)?
        } else {
            universe.high()
        };
        (low <= high).then(|| Interval::with_bounds(universe.family(), low, high))
    }
}

/// Complement of occupied intervals within one universe
#[derive(Debug, Clone)]
pub struct GapFinder {
    universe: Interval,
    occupied: Vec<Interval>,
}

impl GapFinder {
    /// Intervals not touching `universe` are dropped; the rest are sorted by
    /// lower bound, keeping input order for ties.
    pub fn new(universe: Interval, occupied: Vec<Interval>) -> Result<Self> {
        let mut kept = Vec::with_capacity(occupied.len());
        for interval in occupied {
            if universe.overlaps(&interval)? {
                kept.push(interval);
            }
        }
        kept.sort_by_key(Interval::low);

        Ok(Self {
            universe,
            occupied: kept,
        })
    }

    pub fn universe(&self) -> Interval {
        self.universe
    }

    pub fn occupied(&self) -> &[Interval] {
        &self.occupied
    }

    /// Mark `interval` as taken, keeping the occupied list sorted
    pub fn occupy(&mut self, interval: Interval) -> Result<()> {
        if !self.universe.overlaps(&interval)? {
            return Ok(());
        }
        let at = self
            .occupied
            .partition_point(|other| other.low() <= interval.low());
        self.occupied.insert(at, interval);
        Ok(())
    }

    pub fn gaps(&self) -> Gaps<'_> {
        Gaps {
            universe: self.universe,
            occupied: self.occupied.iter(),
            cursor: Some(self.universe.low()),
        }
    }

    /// Every free value, ascending
    pub fn units(&self) -> impl Iterator<Item = u128> + '_ {
        self.gaps().flat_map(|gap| gap.low()..=gap.high())
    }

    pub fn available(&self) -> u128 {
        self.gaps()
            .fold(0u128, |total, gap| total.saturating_add(gap.size()))
    }
}

/// Lazy iterator over the free intervals of a [`GapFinder`]
#[derive(Debug, Clone)]
pub struct Gaps<'a> {
    universe: Interval,
    occupied: std::slice::Iter<'a, Interval>,
    /// First value not yet known to be covered; `None` once past the end
    cursor: Option<u128>,
}

impl Iterator for Gaps<'_> {
    type Item = Interval;

    fn next(&mut self) -> Option<Self::Item> {
        let family = self.universe.family();
        loop {
            let cursor = self.cursor?;
            if cursor > self.universe.high() {
                self.cursor = None;
                return None;
            }

            match self.occupied.next() {
                Some(taken) if taken.high() < cursor => continue,
                Some(taken) if taken.low() <= cursor => {
                    self.cursor = taken.high().checked_add(1);
                }
                Some(taken) => {
                    let gap = Interval::with_bounds(family, cursor, taken.low() - 1);
                    self.cursor = taken.high().checked_add(1);
                    return Some(gap);
                }
                None => {
                    self.cursor = None;
                    return Some(Interval::with_bounds(
                        family,
                        cursor,
                        self.universe.high(),
                    ));
                }
            }
        }
    }
}

/// Free space of a parent across all of its universes
#[derive(Debug, Clone)]
pub struct FreeSpace {
    finders: Vec<GapFinder>,
}

impl FreeSpace {
    /// Universes are walked in the order given
    pub fn new(universes: Vec<Interval>, occupied: Vec<Interval>) -> Result<Self> {
        let finders = universes
            .into_iter()
            .map(|universe| GapFinder::new(universe, occupied.clone()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { finders })
    }

    pub fn empty() -> Self {
        Self {
            finders: Vec::new(),
        }
    }

    pub fn universes(&self) -> impl Iterator<Item = Interval> + '_ {
        self.finders.iter().map(GapFinder::universe)
    }

    pub fn gaps(&self) -> impl Iterator<Item = Interval> + '_ {
        self.finders.iter().flat_map(GapFinder::gaps)
    }

    pub fn units(&self) -> impl Iterator<Item = u128> + '_ {
        self.finders.iter().flat_map(GapFinder::units)
    }

    pub fn available(&self) -> u128 {
        self.finders
            .iter()
            .fold(0u128, |total, finder| total.saturating_add(finder.available()))
    }

    pub fn is_free(&self, value: u128) -> bool {
        self.gaps().any(|gap| gap.contains_value(value))
    }

    pub fn within(&self, value: u128) -> bool {
        self.universes()
            .any(|universe| universe.contains_value(value))
    }

    pub fn occupy(&mut self, interval: Interval) -> Result<()> {
        for finder in &mut self.finders {
            finder.occupy(interval)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AllocationError;
    use crate::range::Family;

    fn asn(low: u128, high: u128) -> Interval {
        Interval::new(Family::Asn, low, high).unwrap()
    }

    #[test]
    fn test_gaps_complement_children() {
        let finder = GapFinder::new(asn(1, 100), vec![asn(40, 60), asn(1, 10), asn(95, 100)]).unwrap();
        let gaps: Vec<Interval> = finder.gaps().collect();
        assert_eq!(gaps, vec![asn(11, 39), asn(61, 94)]);
        assert_eq!(finder.available(), 29 + 34);
    }

    #[test]
    fn test_gaps_with_overlapping_and_outside_children() {
        let finder = GapFinder::new(
            asn(10, 50),
            vec![asn(1, 12), asn(20, 30), asn(25, 35), asn(22, 23), asn(45, 80), asn(90, 95)],
        )
        .unwrap();
        let gaps: Vec<Interval> = finder.gaps().collect();
        assert_eq!(gaps, vec![asn(13, 19), asn(36, 44)]);
        assert_eq!(finder.occupied().len(), 5);
    }

    #[test]
    fn test_gaps_fully_covered_and_untouched() {
        let full = GapFinder::new(asn(5, 9), vec![asn(1, 20)]).unwrap();
        assert_eq!(full.gaps().count(), 0);
        assert_eq!(full.available(), 0);

        let untouched = GapFinder::new(asn(5, 9), Vec::new()).unwrap();
        assert_eq!(untouched.gaps().collect::<Vec<_>>(), vec![asn(5, 9)]);
    }

    #[test]
    fn test_gaps_at_top_of_space() {
        let universe = Interval::from_net(&"::/0".parse().unwrap());
        let top = Interval::new(Family::Ipv6, u128::MAX - 1, u128::MAX).unwrap();
        let finder = GapFinder::new(universe, vec![top]).unwrap();
        let gaps: Vec<Interval> = finder.gaps().collect();
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].high(), u128::MAX - 2);
    }

    #[test]
    fn test_sort_keeps_input_order_for_ties() {
        let finder = GapFinder::new(asn(1, 20), vec![asn(5, 9), asn(5, 5), asn(2, 3)]).unwrap();
        assert_eq!(finder.occupied(), &[asn(2, 3), asn(5, 9), asn(5, 5)]);
    }

    #[test]
    fn test_family_mismatch_rejected() {
        let universe = Interval::from_net(&"192.0.2.0/24".parse().unwrap());
        let result = GapFinder::new(universe, vec![asn(1, 2)]);
        assert!(matches!(result, Err(AllocationError::FamilyMismatch { .. })));
    }

    #[test]
    fn test_gaps_partition_universe() {
        // Deterministic pseudo-random occupied sets over a small universe
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed
        };

        for _ in 0..200 {
            let universe = asn(8, 56);
            let occupied: Vec<Interval> = (0..(next() % 6))
                .map(|_| {
                    let low = u128::from(next() % 64);
                    asn(low, low + u128::from(next() % 8))
                })
                .collect();
            let finder = GapFinder::new(universe, occupied.clone()).unwrap();
            let gaps: Vec<Interval> = finder.gaps().collect();

            for value in universe.low()..=universe.high() {
                let taken = occupied.iter().any(|o| o.contains_value(value));
                let free = gaps.iter().filter(|g| g.contains_value(value)).count();
                assert_eq!(free, usize::from(!taken), "value {} in {:?}", value, occupied);
            }
            for pair in gaps.windows(2) {
                assert!(pair[0].high() + 1 < pair[1].low());
            }
        }
    }

    #[test]
    fn test_occupy_updates_gaps() {
        let mut finder = GapFinder::new(asn(1, 10), vec![asn(4, 4)]).unwrap();
        finder.occupy(asn(1, 2)).unwrap();
        finder.occupy(asn(40, 50)).unwrap();
        assert_eq!(finder.gaps().collect::<Vec<_>>(), vec![asn(3, 3), asn(5, 10)]);
        assert_eq!(finder.units().take(3).collect::<Vec<_>>(), vec![3, 5, 6]);
    }

    #[test]
    fn test_edge_exclusion_rules() {
        let v4_net: IpNet = "192.0.2.0/29".parse().unwrap();
        let v6_net: IpNet = "2001:db8::/64".parse().unwrap();

        let v4 = EdgeExclusion::for_prefix(&v4_net, false);
        assert!(v4.first && v4.last);
        assert_eq!(EdgeExclusion::for_prefix(&v4_net, true), EdgeExclusion::NONE);
        assert_eq!(
            EdgeExclusion::for_prefix(&"192.0.2.0/31".parse().unwrap(), false),
            EdgeExclusion::NONE
        );
        assert_eq!(
            EdgeExclusion::for_prefix(&"192.0.2.1/32".parse().unwrap(), false),
            EdgeExclusion::NONE
        );

        let v6 = EdgeExclusion::for_prefix(&v6_net, false);
        assert!(v6.first && !v6.last);
        assert_eq!(
            EdgeExclusion::for_prefix(&"2001:db8::/127".parse().unwrap(), false),
            EdgeExclusion::NONE
        );

        let shrunk = v4.apply(Interval::from_net(&v4_net)).unwrap();
        assert_eq!(shrunk.size(), 6);
    }

    #[test]
    fn test_free_space_across_universes() {
        let vid = |low, high| Interval::new(Family::Vid, low, high).unwrap();
        let mut space = FreeSpace::new(
            vec![vid(300, 302), vid(100, 102)],
            vec![Interval::single(Family::Vid, 101).unwrap()],
        )
        .unwrap();

        assert_eq!(space.units().collect::<Vec<_>>(), vec![300, 301, 302, 100, 102]);
        assert_eq!(space.available(), 5);
        assert!(space.within(101));
        assert!(!space.is_free(101));
        assert!(!space.within(200));

        space.occupy(Interval::single(Family::Vid, 300).unwrap()).unwrap();
        assert!(!space.is_free(300));
        assert_eq!(space.available(), 4);
        assert_eq!(FreeSpace::empty().units().count(), 0);
    }
}
