//! Release command

use std::sync::Arc;

use anyhow::{Context, Result};
use ipam_shared_types::{ChildKind, ChildRecord, ObjectId};

use crate::Session;

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Prefix,
    IpAddress,
    Asn,
    Vlan,
}

impl From<RecordKind> for ChildKind {
    fn from(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Prefix => ChildKind::Prefix,
            RecordKind::IpAddress => ChildKind::IpAddress,
            RecordKind::Asn => ChildKind::Asn,
            RecordKind::Vlan => ChildKind::Vlan,
        }
    }
}

/// Deletes one allocated record, returning its unit to the free pool
pub struct ReleaseCommand {
    session: Arc<Session>,
}

impl ReleaseCommand {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub async fn execute(&self, kind: RecordKind, id: ObjectId) -> Result<String> {
        let kind = ChildKind::from(kind);
        let removed = self
            .session
            .store
            .delete_child(kind, id)
            .await
            .with_context(|| format!("releasing {} {}", kind, id))?;

        let unit = match &removed {
            ChildRecord::Prefix(prefix) => prefix.prefix.to_string(),
            ChildRecord::IpAddress(ip) => ip.address.to_string(),
            ChildRecord::Asn(asn) => format!("AS{}", asn.asn),
            ChildRecord::Vlan(vlan) => format!("VLAN {}", vlan.vid),
        };
        Ok(format!("Released {} {} ({})", kind, id, unit))
    }
}
