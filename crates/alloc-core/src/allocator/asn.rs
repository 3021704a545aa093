use chrono::Utc;
use ipam_shared_types::{
    Asn, AsnRange, AsnRequest, AvailableAsn, ChildKind, ChildRecord, ParentRef, ParentSpace, Scope,
    UNASSIGNED_ID,
};

use super::{take_units, unsupported, Allocator};
use crate::error::Result;
use crate::gaps::FreeSpace;
use crate::range::{Family, Interval};

/// Hands out the lowest free ASNs of a range
#[derive(Debug, Clone)]
pub struct AsnPicker {
    range: AsnRange,
}

impl AsnPicker {
    pub fn new(range: AsnRange) -> Self {
        Self { range }
    }
}

impl Allocator for AsnPicker {
    type Request = AsnRequest;
    type Unit = AvailableAsn;
    type Record = Asn;

    fn from_parent(parent: ParentSpace) -> Result<Self> {
        match parent {
            ParentSpace::AsnRange(range) => Ok(Self::new(range)),
            other => Err(unsupported(&other, ChildKind::Asn)),
        }
    }

    fn parent(&self) -> ParentRef {
        ParentRef::asn_range(self.range.id)
    }

    fn child_kind(&self) -> ChildKind {
        ChildKind::Asn
    }

    fn scope(&self) -> Scope {
        Scope::AnyRir
    }

    fn universes(&self) -> Result<Vec<Interval>> {
        Ok(vec![Interval::new(
            Family::Asn,
            u128::from(self.range.start),
            u128::from(self.range.end),
        )?])
    }

    fn occupied(&self, child: &ChildRecord) -> Option<Interval> {
        match child {
            // An ASN is taken whichever RIR it was recorded under
            ChildRecord::Asn(asn) => Interval::single(Family::Asn, u128::from(asn.asn)).ok(),
            _ => None,
        }
    }

    fn available(&self, space: &FreeSpace, limit: usize) -> Result<Vec<AvailableAsn>> {
        Ok(space
            .units()
            .take(limit)
            .map(|value| AvailableAsn {
                rir: self.range.rir,
                asn: value as u32,
            })
            .collect())
    }

    fn allocate(&self, space: FreeSpace, requests: &[AsnRequest]) -> Result<Vec<ChildRecord>> {
        let values = take_units(&space, requests.len())?;
        let drafts = values
            .into_iter()
            .zip(requests)
            .map(|(value, request)| {
                ChildRecord::Asn(Asn {
                    id: UNASSIGNED_ID,
                    asn: value as u32,
                    rir: self.range.rir,
                    tenant: request.tenant.clone(),
                    description: request.description.clone(),
                    created: Utc::now(),
                })
            })
            .collect::<Vec<_>>();

        log::debug!("Picked {} ASN(s) from range {}", drafts.len(), self.range.name);
        Ok(drafts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AllocationError;

    fn picker(start: u32, end: u32) -> AsnPicker {
        AsnPicker::new(AsnRange::new(1, "range".to_string(), 1, start, end).unwrap())
    }

    fn asns(records: Vec<ChildRecord>) -> Vec<u32> {
        records
            .into_iter()
            .map(|record| Asn::try_from(record).unwrap().asn)
            .collect()
    }

    #[test]
    fn test_available_asns() {
        let picker = picker(101, 110);
        let space = picker.free_space(&[]).unwrap();
        let free = picker.available(&space, usize::MAX).unwrap();
        assert_eq!(free.len(), 10);
        assert_eq!(free[0], AvailableAsn { rir: 1, asn: 101 });
        assert_eq!(free[9].asn, 110);
    }

    #[test]
    fn test_asns_of_other_rirs_occupy() {
        let picker = picker(101, 110);
        let children = [
            ChildRecord::Asn(Asn::new(5, 101, 1)),
            ChildRecord::Asn(Asn::new(6, 102, 2)),
        ];
        let space = picker.free_space(&children).unwrap();
        let free = picker.available(&space, 2).unwrap();
        assert_eq!(free[0], AvailableAsn { rir: 1, asn: 103 });

        let batch = picker
            .allocate(space, &[AsnRequest::default(), AsnRequest::with_description("peer")])
            .unwrap();
        assert_eq!(asns(batch), vec![103, 104]);
    }

    #[test]
    fn test_full_range_is_capacity_error() {
        let picker = picker(64512, 64513);
        let space = picker.free_space(&[ChildRecord::Asn(Asn::new(5, 64512, 1))]).unwrap();
        let result = picker.allocate(space, &[AsnRequest::default(), AsnRequest::default()]);
        assert!(matches!(
            result,
            Err(AllocationError::Capacity {
                requested: 2,
                available: 1
            })
        ));
    }

    #[test]
    fn test_four_byte_asns() {
        let picker = picker(4_294_967_290, 4_294_967_294);
        let space = picker.free_space(&[]).unwrap();
        let batch = picker.allocate(space, &[AsnRequest::default()]).unwrap();
        assert_eq!(asns(batch), vec![4_294_967_290]);
    }
}
