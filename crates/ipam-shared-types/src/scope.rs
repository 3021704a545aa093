use serde::{Deserialize, Serialize};

use crate::parent::ObjectId;

/// Partition under which children of one parent collide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    /// One VRF; `None` is the global table
    Vrf(Option<ObjectId>),
    /// Every VRF, including the global table
    AnyVrf,
    /// ASNs are unique across every RIR
    AnyRir,
    VlanGroup(ObjectId),
}

impl Scope {
    pub fn admits_vrf(&self, vrf: Option<ObjectId>) -> bool {
        match self {
            Scope::Vrf(scope) => *scope == vrf,
            Scope::AnyVrf => true,
            _ => false,
        }
    }

    pub fn admits_group(&self, group: ObjectId) -> bool {
        matches!(self, Scope::VlanGroup(scope) if *scope == group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_admission() {
        assert!(Scope::Vrf(None).admits_vrf(None));
        assert!(!Scope::Vrf(None).admits_vrf(Some(1)));
        assert!(Scope::Vrf(Some(1)).admits_vrf(Some(1)));
        assert!(Scope::AnyVrf.admits_vrf(Some(7)));
        assert!(Scope::AnyVrf.admits_vrf(None));
        assert!(!Scope::AnyRir.admits_vrf(Some(2)));
        assert!(!Scope::AnyRir.admits_group(2));
        assert!(Scope::VlanGroup(3).admits_group(3));
        assert!(!Scope::VlanGroup(3).admits_group(4));
    }
}
