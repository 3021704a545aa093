use std::collections::HashSet;

use chrono::Utc;
use ipam_shared_types::{
    AvailableVlan, ChildKind, ChildRecord, ParentRef, ParentSpace, Scope, Vlan, VlanGroup,
    VlanRequest, UNASSIGNED_ID,
};

use super::{take_units, unsupported, Allocator};
use crate::error::{AllocationError, Result};
use crate::gaps::FreeSpace;
use crate::range::{Family, Interval};

/// Hands out VLAN IDs from the ranges of a group
///
/// Ranges are walked in declaration order. Requests may pin a VID; pinned
/// VIDs are claimed before the rest of the batch is auto-numbered.
#[derive(Debug, Clone)]
pub struct VlanPicker {
    group: VlanGroup,
}

impl VlanPicker {
    pub fn new(group: VlanGroup) -> Self {
        Self { group }
    }

    fn claim_pinned(&self, space: &mut FreeSpace, requests: &[VlanRequest]) -> Result<()> {
        let mut seen = HashSet::new();
        for vid in requests.iter().filter_map(|request| request.vid) {
            let value = u128::from(vid);
            if !space.within(value) {
                return Err(AllocationError::ScopeViolation {
                    parent: self.parent(),
                    unit: format!("VLAN ID {}", vid),
                });
            }
            if !seen.insert(vid) || !space.is_free(value) {
                return Err(AllocationError::Conflict {
                    parent: self.parent(),
                    message: format!("VLAN ID {} is already in use", vid),
                });
            }
        }

        for vid in seen {
            space.occupy(Interval::single(Family::Vid, u128::from(vid))?)?;
        }
        Ok(())
    }

    fn draft(&self, vid: u16, request: &VlanRequest) -> ChildRecord {
        ChildRecord::Vlan(Vlan {
            id: UNASSIGNED_ID,
            vid,
            name: request.name.clone(),
            group: self.group.id,
            tenant: request.tenant.clone(),
            description: request.description.clone(),
            created: Utc::now(),
        })
    }
}

impl Allocator for VlanPicker {
    type Request = VlanRequest;
    type Unit = AvailableVlan;
    type Record = Vlan;

    fn from_parent(parent: ParentSpace) -> Result<Self> {
        match parent {
            ParentSpace::VlanGroup(group) => Ok(Self::new(group)),
            other => Err(unsupported(&other, ChildKind::Vlan)),
        }
    }

    fn parent(&self) -> ParentRef {
        ParentRef::vlan_group(self.group.id)
    }

    fn child_kind(&self) -> ChildKind {
        ChildKind::Vlan
    }

    fn scope(&self) -> Scope {
        Scope::VlanGroup(self.group.id)
    }

    fn universes(&self) -> Result<Vec<Interval>> {
        self.group
            .vid_ranges
            .iter()
            .map(|range| Interval::new(Family::Vid, u128::from(range.start), u128::from(range.end)))
            .collect()
    }

    fn occupied(&self, child: &ChildRecord) -> Option<Interval> {
        match child {
            ChildRecord::Vlan(vlan) if vlan.group == self.group.id => {
                Interval::single(Family::Vid, u128::from(vlan.vid)).ok()
            }
            _ => None,
        }
    }

    fn available(&self, space: &FreeSpace, limit: usize) -> Result<Vec<AvailableVlan>> {
        Ok(space
            .units()
            .take(limit)
            .map(|value| AvailableVlan {
                group: self.group.id,
                vid: value as u16,
            })
            .collect())
    }

    fn allocate(&self, mut space: FreeSpace, requests: &[VlanRequest]) -> Result<Vec<ChildRecord>> {
        self.claim_pinned(&mut space, requests)?;

        let auto = requests.iter().filter(|request| request.vid.is_none()).count();
        let pinned = (requests.len() - auto) as u128;
        // Shortfall is reported against the whole batch
        let shortfall = || AllocationError::Capacity {
            requested: requests.len(),
            available: pinned + space.available(),
        };
        let mut picked = take_units(&space, auto).map_err(|_| shortfall())?.into_iter();

        let mut drafts = Vec::with_capacity(requests.len());
        for request in requests {
            let vid = match request.vid {
                Some(vid) => vid,
                None => picked.next().map(|value| value as u16).ok_or_else(shortfall)?,
            };
            drafts.push(self.draft(vid, request));
        }

        log::debug!("Picked {} VLAN(s) from group {}", drafts.len(), self.group.name);
        Ok(drafts)
    }
}
