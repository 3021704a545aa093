//! Tables of parents and children with the constraints of a relational store

use std::collections::HashSet;
use std::net::IpAddr;

use indexmap::IndexMap;
use ipam_alloc_core::{RepositoryError, RepositoryResult};
use ipam_shared_types::{
    Asn, AsnRange, ChildKind, ChildRecord, IpAddress, IpRange, ObjectId, ParentKind, ParentRef,
    ParentSpace, Prefix, Scope, Vlan, VlanGroup, UNASSIGNED_ID,
};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};

/// Identity under which two records of one kind collide
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum UniqueKey {
    Prefix(Option<ObjectId>, IpNet),
    Address(Option<ObjectId>, IpAddr),
    Asn(u32),
    Vlan(ObjectId, u16),
}

impl UniqueKey {
    fn of(record: &ChildRecord) -> Self {
        match record {
            ChildRecord::Prefix(prefix) => UniqueKey::Prefix(prefix.vrf, prefix.prefix),
            ChildRecord::IpAddress(ip) => UniqueKey::Address(ip.vrf, ip.addr()),
            ChildRecord::Asn(asn) => UniqueKey::Asn(asn.asn),
            ChildRecord::Vlan(vlan) => UniqueKey::Vlan(vlan.group, vlan.vid),
        }
    }

    fn describe(&self) -> String {
        match self {
            UniqueKey::Prefix(vrf, prefix) => format!("prefix {} in {}", prefix, vrf_name(vrf)),
            UniqueKey::Address(vrf, addr) => format!("address {} in {}", addr, vrf_name(vrf)),
            UniqueKey::Asn(asn) => format!("AS{}", asn),
            UniqueKey::Vlan(group, vid) => format!("VLAN {} in group {}", vid, group),
        }
    }
}

/// The one record of a single-record batch
pub(crate) fn single(created: Vec<ChildRecord>) -> RepositoryResult<ChildRecord> {
    created.into_iter().next().ok_or_else(|| RepositoryError::Storage {
        message: "write returned no record".to_string(),
    })
}

fn vrf_name(vrf: &Option<ObjectId>) -> String {
    match vrf {
        Some(id) => format!("VRF {}", id),
        None => "the global table".to_string(),
    }
}

/// Everything a repository stores
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Inventory {
    pub prefixes: IndexMap<ObjectId, Prefix>,
    pub ip_ranges: IndexMap<ObjectId, IpRange>,
    pub asn_ranges: IndexMap<ObjectId, AsnRange>,
    pub vlan_groups: IndexMap<ObjectId, VlanGroup>,
    pub ip_addresses: IndexMap<ObjectId, IpAddress>,
    pub asns: IndexMap<ObjectId, Asn>,
    pub vlans: IndexMap<ObjectId, Vlan>,
    last_id: ObjectId,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> ObjectId {
        self.last_id += 1;
        self.last_id
    }

    /// Keep explicit ids, assign one otherwise
    fn claim_id(&mut self, id: ObjectId) -> ObjectId {
        if id == UNASSIGNED_ID {
            self.next_id()
        } else {
            self.last_id = self.last_id.max(id);
            id
        }
    }

    fn id_taken(&self, kind: ParentKind, id: ObjectId) -> bool {
        match kind {
            ParentKind::Prefix => self.prefixes.contains_key(&id),
            ParentKind::IpRange => self.ip_ranges.contains_key(&id),
            ParentKind::AsnRange => self.asn_ranges.contains_key(&id),
            ParentKind::VlanGroup => self.vlan_groups.contains_key(&id),
        }
    }

    /// Check invariants the JSON form cannot express
    pub fn validate(&self) -> RepositoryResult<()> {
        for group in self.vlan_groups.values() {
            group.validate().map_err(|err| RepositoryError::Storage {
                message: format!("VLAN group {} ({}): {}", group.id, group.name, err),
            })?;
        }
        Ok(())
    }

    pub fn insert_parent(&mut self, parent: ParentSpace) -> RepositoryResult<ParentRef> {
        if let ParentSpace::VlanGroup(group) = &parent {
            group.validate()?;
        }
        if parent.id() != UNASSIGNED_ID && self.id_taken(parent.kind(), parent.id()) {
            return Err(RepositoryError::Constraint {
                message: format!("{} already exists", parent.parent_ref()),
            });
        }

        let parent = match parent {
            ParentSpace::Prefix(prefix) => {
                self.check_unique(&[ChildRecord::Prefix(prefix.clone())])?;
                let id = self.claim_id(prefix.id);
                self.prefixes.insert(id, Prefix { id, ..prefix });
                ParentRef::prefix(id)
            }
            ParentSpace::IpRange(range) => {
                let id = self.claim_id(range.id);
                self.ip_ranges.insert(id, IpRange { id, ..range });
                ParentRef::ip_range(id)
            }
            ParentSpace::AsnRange(range) => {
                let id = self.claim_id(range.id);
                self.asn_ranges.insert(id, AsnRange { id, ..range });
                ParentRef::asn_range(id)
            }
            ParentSpace::VlanGroup(group) => {
                let id = self.claim_id(group.id);
                self.vlan_groups.insert(id, VlanGroup { id, ..group });
                ParentRef::vlan_group(id)
            }
        };

        log::debug!("Stored {}", parent);
        Ok(parent)
    }

    pub fn parent(&self, parent: ParentRef) -> Option<ParentSpace> {
        match parent.kind {
            ParentKind::Prefix => self.prefixes.get(&parent.id).cloned().map(ParentSpace::from),
            ParentKind::IpRange => self.ip_ranges.get(&parent.id).cloned().map(ParentSpace::from),
            ParentKind::AsnRange => self.asn_ranges.get(&parent.id).cloned().map(ParentSpace::from),
            ParentKind::VlanGroup => self.vlan_groups.get(&parent.id).cloned().map(ParentSpace::from),
        }
    }

    pub fn parents(&self) -> Vec<ParentSpace> {
        let prefixes = self.prefixes.values().cloned().map(ParentSpace::from);
        let ranges = self.ip_ranges.values().cloned().map(ParentSpace::from);
        let asn_ranges = self.asn_ranges.values().cloned().map(ParentSpace::from);
        let groups = self.vlan_groups.values().cloned().map(ParentSpace::from);
        prefixes.chain(ranges).chain(asn_ranges).chain(groups).collect()
    }

    /// Children of `kind` inside `parent` and visible under `scope`, in
    /// insertion order
    pub fn children(
        &self,
        parent: &ParentSpace,
        kind: ChildKind,
        scope: &Scope,
    ) -> RepositoryResult<Vec<ChildRecord>> {
        let children: Vec<ChildRecord> = match (parent, kind) {
            (ParentSpace::Prefix(outer), ChildKind::Prefix) => self
                .prefixes
                .values()
                .filter(|p| p.id != outer.id && outer.prefix.contains(&p.prefix))
                .filter(|p| scope.admits_vrf(p.vrf))
                .cloned()
                .map(ChildRecord::from)
                .collect(),
            (ParentSpace::Prefix(outer), ChildKind::IpAddress) => self
                .ip_addresses
                .values()
                .filter(|ip| outer.prefix.contains(&ip.addr()) && scope.admits_vrf(ip.vrf))
                .cloned()
                .map(ChildRecord::from)
                .collect(),
            (ParentSpace::IpRange(range), ChildKind::IpAddress) => self
                .ip_addresses
                .values()
                .filter(|ip| range.contains(&ip.addr()) && scope.admits_vrf(ip.vrf))
                .cloned()
                .map(ChildRecord::from)
                .collect(),
            (ParentSpace::AsnRange(range), ChildKind::Asn) => self
                .asns
                .values()
                .filter(|asn| range.contains(asn.asn))
                .cloned()
                .map(ChildRecord::from)
                .collect(),
            (ParentSpace::VlanGroup(_), ChildKind::Vlan) => self
                .vlans
                .values()
                .filter(|vlan| scope.admits_group(vlan.group))
                .cloned()
                .map(ChildRecord::from)
                .collect(),
            (parent, child) => {
                return Err(RepositoryError::Unsupported {
                    parent: parent.kind(),
                    child,
                })
            }
        };

        Ok(children)
    }

    fn existing_keys(&self, kind: ChildKind) -> HashSet<UniqueKey> {
        match kind {
            ChildKind::Prefix => self
                .prefixes
                .values()
                .map(|p| UniqueKey::Prefix(p.vrf, p.prefix))
                .collect(),
            ChildKind::IpAddress => self
                .ip_addresses
                .values()
                .map(|ip| UniqueKey::Address(ip.vrf, ip.addr()))
                .collect(),
            ChildKind::Asn => self.asns.values().map(|asn| UniqueKey::Asn(asn.asn)).collect(),
            ChildKind::Vlan => self
                .vlans
                .values()
                .map(|vlan| UniqueKey::Vlan(vlan.group, vlan.vid))
                .collect(),
        }
    }

    /// Reject records colliding with stored ones or with each other
    fn check_unique(&self, batch: &[ChildRecord]) -> RepositoryResult<()> {
        let mut seen: HashSet<UniqueKey> = HashSet::new();
        let mut kinds = Vec::new();
        for record in batch {
            if !kinds.contains(&record.kind()) {
                kinds.push(record.kind());
                seen.extend(self.existing_keys(record.kind()));
            }
            let key = UniqueKey::of(record);
            if !seen.insert(key.clone()) {
                return Err(RepositoryError::Constraint {
                    message: format!("{} already exists", key.describe()),
                });
            }
        }
        Ok(())
    }

    /// Store every record of `batch` or none of them
    pub fn insert_children(&mut self, batch: Vec<ChildRecord>) -> RepositoryResult<Vec<ChildRecord>> {
        self.check_unique(&batch)?;

        let mut created = Vec::with_capacity(batch.len());
        for mut record in batch {
            let id = self.next_id();
            record.set_id(id);
            match &record {
                ChildRecord::Prefix(prefix) => {
                    self.prefixes.insert(id, prefix.clone());
                }
                ChildRecord::IpAddress(ip) => {
                    self.ip_addresses.insert(id, ip.clone());
                }
                ChildRecord::Asn(asn) => {
                    self.asns.insert(id, asn.clone());
                }
                ChildRecord::Vlan(vlan) => {
                    self.vlans.insert(id, vlan.clone());
                }
            }
            created.push(record);
        }
        Ok(created)
    }

    pub fn remove_child(&mut self, kind: ChildKind, id: ObjectId) -> RepositoryResult<ChildRecord> {
        let removed = match kind {
            ChildKind::Prefix => self.prefixes.shift_remove(&id).map(ChildRecord::from),
            ChildKind::IpAddress => self.ip_addresses.shift_remove(&id).map(ChildRecord::from),
            ChildKind::Asn => self.asns.shift_remove(&id).map(ChildRecord::from),
            ChildKind::Vlan => self.vlans.shift_remove(&id).map(ChildRecord::from),
        };
        removed.ok_or(RepositoryError::NotFound { kind, id })
    }

    pub fn count(&self, kind: ChildKind) -> usize {
        match kind {
            ChildKind::Prefix => self.prefixes.len(),
            ChildKind::IpAddress => self.ip_addresses.len(),
            ChildKind::Asn => self.asns.len(),
            ChildKind::Vlan => self.vlans.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefix(net: &str) -> Prefix {
        Prefix::new(UNASSIGNED_ID, net.parse().unwrap())
    }

    #[test]
    fn test_ids_are_assigned_and_kept() {
        let mut inventory = Inventory::new();
        let first = inventory.insert_parent(prefix("10.0.0.0/8").into()).unwrap();
        assert_eq!(first, ParentRef::prefix(1));

        let group = VlanGroup::new(10, "core".to_string());
        assert_eq!(inventory.insert_parent(group.into()).unwrap(), ParentRef::vlan_group(10));

        let created = inventory
            .insert_children(vec![ChildRecord::Asn(Asn::new(UNASSIGNED_ID, 65000, 1))])
            .unwrap();
        assert_eq!(created[0].id(), 11);

        let duplicate = VlanGroup::new(10, "again".to_string());
        assert!(matches!(
            inventory.insert_parent(duplicate.into()),
            Err(RepositoryError::Constraint { .. })
        ));
    }

    #[test]
    fn test_prefix_children_follow_scope() {
        let mut inventory = Inventory::new();
        let parent = inventory
            .insert_parent(prefix("10.0.0.0/16").with_status(ipam_shared_types::PrefixStatus::Container).into())
            .unwrap();
        inventory
            .insert_children(vec![
                ChildRecord::Prefix(prefix("10.0.1.0/24")),
                ChildRecord::Prefix(prefix("10.0.2.0/24").with_vrf(5)),
                ChildRecord::Prefix(prefix("10.1.0.0/24")),
            ])
            .unwrap();

        let space = inventory.parent(parent).unwrap();
        let all = inventory.children(&space, ChildKind::Prefix, &Scope::AnyVrf).unwrap();
        assert_eq!(all.len(), 2);
        let global = inventory.children(&space, ChildKind::Prefix, &Scope::Vrf(None)).unwrap();
        assert_eq!(global.len(), 1);
        let vrf = inventory.children(&space, ChildKind::Prefix, &Scope::Vrf(Some(5))).unwrap();
        assert_eq!(vrf.len(), 1);
    }

    #[test]
    fn test_unsupported_pairing() {
        let mut inventory = Inventory::new();
        let parent = inventory
            .insert_parent(VlanGroup::new(UNASSIGNED_ID, "g".to_string()).into())
            .unwrap();
        let space = inventory.parent(parent).unwrap();
        assert!(matches!(
            inventory.children(&space, ChildKind::Asn, &Scope::VlanGroup(1)),
            Err(RepositoryError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let mut inventory = Inventory::new();
        inventory
            .insert_children(vec![ChildRecord::Vlan(Vlan::new(UNASSIGNED_ID, 10, "a".to_string(), 1))])
            .unwrap();

        let result = inventory.insert_children(vec![
            ChildRecord::Vlan(Vlan::new(UNASSIGNED_ID, 11, "b".to_string(), 1)),
            ChildRecord::Vlan(Vlan::new(UNASSIGNED_ID, 10, "c".to_string(), 1)),
        ]);
        assert!(matches!(result, Err(RepositoryError::Constraint { .. })));
        assert_eq!(inventory.count(ChildKind::Vlan), 1);

        let result = inventory.insert_children(vec![
            ChildRecord::Vlan(Vlan::new(UNASSIGNED_ID, 12, "d".to_string(), 1)),
            ChildRecord::Vlan(Vlan::new(UNASSIGNED_ID, 12, "e".to_string(), 1)),
        ]);
        assert!(result.is_err());

        inventory
            .insert_children(vec![ChildRecord::Vlan(Vlan::new(UNASSIGNED_ID, 10, "f".to_string(), 2))])
            .unwrap();
        assert_eq!(inventory.count(ChildKind::Vlan), 2);
    }

    #[test]
    fn test_addresses_unique_per_vrf() {
        let mut inventory = Inventory::new();
        let address = |vrf: Option<ObjectId>| {
            let mut ip = IpAddress::new(UNASSIGNED_ID, "192.0.2.1/24".parse().unwrap());
            ip.vrf = vrf;
            ChildRecord::IpAddress(ip)
        };
        inventory.insert_children(vec![address(None), address(Some(1))]).unwrap();
        assert!(inventory.insert_children(vec![address(Some(1))]).is_err());
    }

    #[test]
    fn test_remove_child() {
        let mut inventory = Inventory::new();
        let created = inventory
            .insert_children(vec![ChildRecord::Asn(Asn::new(UNASSIGNED_ID, 65001, 1))])
            .unwrap();
        let id = created[0].id();

        assert!(inventory.remove_child(ChildKind::Asn, id).is_ok());
        assert!(matches!(
            inventory.remove_child(ChildKind::Asn, id),
            Err(RepositoryError::NotFound { .. })
        ));
    }
}
