use chrono::Utc;
use ipam_shared_types::{
    AvailableIp, ChildKind, ChildRecord, IpAddress, IpAddressRequest, IpRange, ObjectId, ParentRef,
    ParentSpace, Prefix, Scope, UNASSIGNED_ID,
};
use ipnet::IpNet;

use super::{take_units, unsupported, Allocator};
use crate::error::{AllocationError, Result};
use crate::gaps::{EdgeExclusion, FreeSpace};
use crate::range::{value_to_addr, Interval};

/// Hands out single addresses from a prefix or an IP range
///
/// Addresses carry the mask length of their parent.
#[derive(Debug, Clone)]
pub struct IpPicker {
    parent: ParentRef,
    scope: Scope,
    /// `None` when the parent has nothing to hand out
    universe: Option<Interval>,
    mask_length: u8,
    ipv4: bool,
    vrf: Option<ObjectId>,
}

impl IpPicker {
    pub fn in_prefix(prefix: &Prefix) -> Self {
        let exclusion = EdgeExclusion::for_prefix(&prefix.prefix, prefix.is_pool);
        Self {
            parent: ParentRef::prefix(prefix.id),
            scope: if prefix.spans_all_vrfs() {
                Scope::AnyVrf
            } else {
                Scope::Vrf(prefix.vrf)
            },
            universe: exclusion.apply(Interval::from_net(&prefix.prefix)),
            mask_length: prefix.prefix.prefix_len(),
            ipv4: matches!(prefix.prefix, IpNet::V4(_)),
            vrf: prefix.vrf,
        }
    }

    /// A range marked populated offers no addresses
    pub fn in_range(range: &IpRange) -> Result<Self> {
        let universe = if range.mark_populated {
            None
        } else {
            Some(Interval::from_addrs(range.start(), range.end())?)
        };
        Ok(Self {
            parent: ParentRef::ip_range(range.id),
            scope: Scope::Vrf(range.vrf),
            universe,
            mask_length: range.mask_length(),
            ipv4: range.start().is_ipv4(),
            vrf: range.vrf,
        })
    }

    fn to_net(&self, value: u128) -> Result<IpNet> {
        IpNet::new(value_to_addr(value, self.ipv4), self.mask_length)
            .map_err(|err| AllocationError::invalid_range(err.to_string()))
    }

    fn family(&self) -> u8 {
        if self.ipv4 {
            4
        } else {
            6
        }
    }
}

impl Allocator for IpPicker {
    type Request = IpAddressRequest;
    type Unit = AvailableIp;
    type Record = IpAddress;

    fn from_parent(parent: ParentSpace) -> Result<Self> {
        match parent {
            ParentSpace::Prefix(prefix) => Ok(Self::in_prefix(&prefix)),
            ParentSpace::IpRange(range) => Self::in_range(&range),
            other => Err(unsupported(&other, ChildKind::IpAddress)),
        }
    }

    fn parent(&self) -> ParentRef {
        self.parent
    }

    fn child_kind(&self) -> ChildKind {
        ChildKind::IpAddress
    }

    fn scope(&self) -> Scope {
        self.scope
    }

    fn universes(&self) -> Result<Vec<Interval>> {
        Ok(self.universe.into_iter().collect())
    }

    fn occupied(&self, child: &ChildRecord) -> Option<Interval> {
        match child {
            ChildRecord::IpAddress(ip) if ip.addr().is_ipv4() == self.ipv4 => {
                Some(Interval::addr(ip.addr()))
            }
            _ => None,
        }
    }

    fn available(&self, space: &FreeSpace, limit: usize) -> Result<Vec<AvailableIp>> {
        space
            .units()
            .take(limit)
            .map(|value| {
                Ok(AvailableIp {
                    family: self.family(),
                    address: self.to_net(value)?,
                    vrf: self.vrf,
                })
            })
            .collect()
    }

    fn allocate(&self, space: FreeSpace, requests: &[IpAddressRequest]) -> Result<Vec<ChildRecord>> {
        let values = take_units(&space, requests.len())?;
        values
            .into_iter()
            .zip(requests)
            .map(|(value, request)| {
                let address = IpAddress {
                    id: UNASSIGNED_ID,
                    address: self.to_net(value)?,
                    vrf: self.vrf,
                    tenant: request.tenant.clone(),
                    description: request.description.clone(),
                    created: Utc::now(),
                };
                log::debug!("Picked {} from {}", address.address, self.parent);
                Ok(ChildRecord::IpAddress(address))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(id: u64, address: &str) -> ChildRecord {
        ChildRecord::IpAddress(IpAddress::new(id, address.parse().unwrap()))
    }

    fn listed(picker: &IpPicker, children: &[ChildRecord]) -> Vec<String> {
        let space = picker.free_space(children).unwrap();
        picker
            .available(&space, usize::MAX)
            .unwrap()
            .into_iter()
            .map(|unit| unit.address.to_string())
            .collect()
    }

    #[test]
    fn test_prefix_excludes_network_and_broadcast() {
        let prefix = Prefix::new(1, "192.0.2.0/29".parse().unwrap());
        let free = listed(&IpPicker::in_prefix(&prefix), &[]);
        assert_eq!(free.len(), 6);
        assert_eq!(free.first().map(String::as_str), Some("192.0.2.1/29"));
        assert_eq!(free.last().map(String::as_str), Some("192.0.2.6/29"));
    }

    #[test]
    fn test_pool_lists_every_address() {
        let prefix = Prefix::new(1, "192.0.2.0/29".parse().unwrap()).with_pool(true);
        let free = listed(&IpPicker::in_prefix(&prefix), &[]);
        assert_eq!(free.len(), 8);
        assert_eq!(free[0], "192.0.2.0/29");
    }

    #[test]
    fn test_point_to_point_prefixes_use_both_addresses() {
        let prefix = Prefix::new(1, "192.0.2.0/31".parse().unwrap());
        assert_eq!(listed(&IpPicker::in_prefix(&prefix), &[]).len(), 2);

        let host = Prefix::new(2, "2001:db8::1/128".parse().unwrap());
        assert_eq!(listed(&IpPicker::in_prefix(&host), &[]), vec!["2001:db8::1/128"]);
    }

    #[test]
    fn test_ipv6_excludes_subnet_router_anycast_only() {
        let prefix = Prefix::new(1, "2001:db8::/126".parse().unwrap());
        let free = listed(&IpPicker::in_prefix(&prefix), &[]);
        assert_eq!(free, vec!["2001:db8::1/126", "2001:db8::2/126", "2001:db8::3/126"]);
    }

    #[test]
    fn test_existing_addresses_are_skipped() {
        let prefix = Prefix::new(1, "192.0.2.0/29".parse().unwrap());
        let picker = IpPicker::in_prefix(&prefix);
        let children = [ip(5, "192.0.2.1/24"), ip(6, "192.0.2.3/32"), ip(7, "2001:db8::1/64")];

        let space = picker.free_space(&children).unwrap();
        let batch = picker
            .allocate(space, &[IpAddressRequest::default(), IpAddressRequest::with_description("b")])
            .unwrap();
        let addresses: Vec<IpAddress> = batch
            .into_iter()
            .map(|record| IpAddress::try_from(record).unwrap())
            .collect();
        assert_eq!(addresses[0].address.to_string(), "192.0.2.2/29");
        assert_eq!(addresses[1].address.to_string(), "192.0.2.4/29");
        assert_eq!(addresses[1].description.as_deref(), Some("b"));
    }

    #[test]
    fn test_range_allocation_until_exhausted() {
        let range = IpRange::new(1, "192.0.2.1/24".parse().unwrap(), "192.0.2.3/24".parse().unwrap())
            .unwrap()
            .with_vrf(3);
        let picker = IpPicker::in_range(&range).unwrap();
        assert_eq!(picker.scope(), Scope::Vrf(Some(3)));

        let space = picker.free_space(&[ip(9, "192.0.2.2/24")]).unwrap();
        let batch = picker
            .allocate(space, &[IpAddressRequest::default(), IpAddressRequest::default()])
            .unwrap();
        let addresses: Vec<String> = batch
            .into_iter()
            .map(|record| IpAddress::try_from(record).unwrap().address.to_string())
            .collect();
        assert_eq!(addresses, vec!["192.0.2.1/24", "192.0.2.3/24"]);

        let space = picker
            .free_space(&[ip(9, "192.0.2.2/24"), ip(10, "192.0.2.1/24"), ip(11, "192.0.2.3/24")])
            .unwrap();
        let result = picker.allocate(space, &[IpAddressRequest::default()]);
        assert!(matches!(
            result,
            Err(AllocationError::Capacity {
                requested: 1,
                available: 0
            })
        ));
    }

    #[test]
    fn test_populated_range_is_full() {
        let range = IpRange::new(1, "192.0.2.1/24".parse().unwrap(), "192.0.2.9/24".parse().unwrap())
            .unwrap()
            .with_populated(true);
        let picker = IpPicker::in_range(&range).unwrap();
        assert!(listed(&picker, &[]).is_empty());

        let space = picker.free_space(&[]).unwrap();
        assert!(matches!(
            picker.allocate(space, &[IpAddressRequest::default()]),
            Err(AllocationError::Capacity { .. })
        ));
    }

    #[test]
    fn test_children_inherit_vrf() {
        let prefix = Prefix::new(1, "10.0.0.0/24".parse().unwrap()).with_vrf(4);
        let picker = IpPicker::in_prefix(&prefix);
        let space = picker.free_space(&[]).unwrap();
        let batch = picker.allocate(space, &[IpAddressRequest::default()]).unwrap();
        let address = IpAddress::try_from(batch.into_iter().next().unwrap()).unwrap();
        assert_eq!(address.vrf, Some(4));
        assert_eq!(address.address.to_string(), "10.0.0.1/24");
    }
}
