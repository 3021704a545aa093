use ipam_shared_types::{
    AvailablePrefix, ChildKind, ChildRecord, ParentRef, ParentSpace, Prefix, PrefixRequest, Scope,
    UNASSIGNED_ID,
};
use ipnet::IpNet;

use super::{unsupported, Allocator};
use crate::error::{AllocationError, Result};
use crate::gaps::FreeSpace;
use crate::range::{block_span, value_to_addr, Family, Interval};

/// Carves child prefixes out of a parent prefix, first fit
#[derive(Debug, Clone)]
pub struct PrefixSplitter {
    prefix: Prefix,
}

impl PrefixSplitter {
    pub fn new(prefix: Prefix) -> Self {
        Self { prefix }
    }

    fn is_ipv4(&self) -> bool {
        matches!(self.prefix.prefix, IpNet::V4(_))
    }

    fn max_length(&self) -> u8 {
        Family::of_net(&self.prefix.prefix).bits() as u8
    }

    fn to_net(&self, start: u128, length: u8) -> Result<IpNet> {
        IpNet::new(value_to_addr(start, self.is_ipv4()), length)
            .map_err(|err| AllocationError::invalid_range(err.to_string()))
    }

    fn check_length(&self, length: u8) -> Result<()> {
        let parent_length = self.prefix.prefix.prefix_len();
        if length < parent_length || length > self.max_length() {
            return Err(AllocationError::invalid_range(format!(
                "Invalid prefix length ({}) for parent prefix {}; must be longer than /{} and at most /{}",
                length,
                self.prefix.prefix,
                parent_length,
                self.max_length()
            )));
        }
        // A child of the parent's own length would be the parent again
        if length == parent_length {
            return Err(AllocationError::invalid_range(format!(
                "Invalid prefix length ({}) for parent prefix {}; a /{} child would duplicate the parent",
                length, self.prefix.prefix, length
            )));
        }
        Ok(())
    }
}

/// Lowest block of `2^host_bits` values aligned on its size inside a gap
fn first_fit(space: &FreeSpace, host_bits: u32) -> Option<Interval> {
    let span = block_span(host_bits);
    space.gaps().find_map(|gap| {
        let start = align_up(gap.low(), span)?;
        let end = start.checked_add(span)?;
        (end <= gap.high()).then(|| Interval::with_bounds(gap.family(), start, end))
    })
}

fn align_up(value: u128, span: u128) -> Option<u128> {
    Some(value.checked_add(span)? & !span)
}

impl Allocator for PrefixSplitter {
    type Request = PrefixRequest;
    type Unit = AvailablePrefix;
    type Record = Prefix;

    fn from_parent(parent: ParentSpace) -> Result<Self> {
        match parent {
            ParentSpace::Prefix(prefix) => Ok(Self::new(prefix)),
            other => Err(unsupported(&other, ChildKind::Prefix)),
        }
    }

    fn parent(&self) -> ParentRef {
        ParentRef::prefix(self.prefix.id)
    }

    fn child_kind(&self) -> ChildKind {
        ChildKind::Prefix
    }

    fn scope(&self) -> Scope {
        if self.prefix.spans_all_vrfs() {
            Scope::AnyVrf
        } else {
            Scope::Vrf(self.prefix.vrf)
        }
    }

    fn universes(&self) -> Result<Vec<Interval>> {
        Ok(vec![Interval::from_net(&self.prefix.prefix)])
    }

    fn occupied(&self, child: &ChildRecord) -> Option<Interval> {
        match child {
            ChildRecord::Prefix(child)
                if child.id != self.prefix.id && self.prefix.prefix.contains(&child.prefix) =>
            {
                Some(Interval::from_net(&child.prefix))
            }
            _ => None,
        }
    }

    fn available(&self, space: &FreeSpace, limit: usize) -> Result<Vec<AvailablePrefix>> {
        space
            .gaps()
            .flat_map(|gap| gap.blocks())
            .take(limit)
            .map(|(start, length)| {
                Ok(AvailablePrefix {
                    family: self.prefix.family(),
                    prefix: self.to_net(start, length)?,
                    vrf: self.prefix.vrf,
                })
            })
            .collect()
    }

    fn allocate(&self, mut space: FreeSpace, requests: &[PrefixRequest]) -> Result<Vec<ChildRecord>> {
        for request in requests {
            self.check_length(request.prefix_length)?;
        }

        let mut carved = Vec::with_capacity(requests.len());
        for request in requests {
            let host_bits = u32::from(self.max_length() - request.prefix_length);
            let block = first_fit(&space, host_bits).ok_or(AllocationError::Capacity {
                requested: requests.len(),
                available: carved.len() as u128,
            })?;
            space.occupy(block)?;

            let mut child = Prefix::new(UNASSIGNED_ID, self.to_net(block.low(), request.prefix_length)?);
            child.vrf = self.prefix.vrf;
            child.status = request.status.unwrap_or_default();
            child.is_pool = request.is_pool;
            child.tenant = request.tenant.clone();
            child.description = request.description.clone();

            log::debug!("Carved {} from {}", child.prefix, self.prefix.prefix);
            carved.push(ChildRecord::Prefix(child));
        }

        Ok(carved)
    }
}
