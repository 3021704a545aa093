//! Parent command

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Subcommand;
use ipam_shared_types::{
    format_vid_ranges, parse_vid_ranges, AsnRange, IpRange, ObjectId, ParentSpace, Prefix,
    PrefixStatus, VlanGroup, UNASSIGNED_ID,
};
use ipnet::IpNet;

use super::{render, OutputFormat};
use crate::Session;

#[derive(Subcommand, Debug, Clone)]
pub enum NewParent {
    /// Prefix to carve child prefixes and addresses from
    Prefix {
        prefix: IpNet,

        /// Explicit id, assigned by the store when omitted
        #[arg(long)]
        id: Option<ObjectId>,

        #[arg(long)]
        vrf: Option<ObjectId>,

        /// Network and broadcast addresses are usable
        #[arg(long)]
        pool: bool,

        /// Mark as a container
        #[arg(long)]
        container: bool,

        #[arg(long)]
        description: Option<String>,
    },

    /// Arbitrary range of addresses, e.g. 192.0.2.10/24 192.0.2.20/24
    IpRange {
        start: IpNet,
        end: IpNet,

        #[arg(long)]
        id: Option<ObjectId>,

        #[arg(long)]
        vrf: Option<ObjectId>,

        /// Treat every address as in use
        #[arg(long)]
        populated: bool,
    },

    /// ASN range delegated by a RIR
    AsnRange {
        name: String,
        rir: ObjectId,
        start: u32,
        end: u32,

        #[arg(long)]
        id: Option<ObjectId>,
    },

    /// VLAN group, the whole 1-4094 space unless --vids is given
    VlanGroup {
        name: String,

        /// VID ranges, e.g. "100-199,300"
        #[arg(long)]
        vids: Option<String>,

        #[arg(long)]
        id: Option<ObjectId>,
    },
}

impl NewParent {
    pub fn build(self) -> Result<ParentSpace> {
        let parent = match self {
            NewParent::Prefix {
                prefix,
                id,
                vrf,
                pool,
                container,
                description,
            } => {
                let mut prefix = Prefix::new(id.unwrap_or(UNASSIGNED_ID), prefix).with_pool(pool);
                prefix.vrf = vrf;
                prefix.description = description;
                if container {
                    prefix = prefix.with_status(PrefixStatus::Container);
                }
                ParentSpace::from(prefix)
            }
            NewParent::IpRange {
                start,
                end,
                id,
                vrf,
                populated,
            } => {
                let mut range = IpRange::new(id.unwrap_or(UNASSIGNED_ID), start, end)?
                    .with_populated(populated);
                range.vrf = vrf;
                ParentSpace::from(range)
            }
            NewParent::AsnRange {
                name,
                rir,
                start,
                end,
                id,
            } => ParentSpace::from(AsnRange::new(id.unwrap_or(UNASSIGNED_ID), name, rir, start, end)?),
            NewParent::VlanGroup { name, vids, id } => {
                let group = VlanGroup::new(id.unwrap_or(UNASSIGNED_ID), name);
                let group = match vids {
                    Some(vids) => group
                        .with_vid_ranges(parse_vid_ranges(&vids)?)
                        .with_context(|| format!("invalid VID ranges '{}'", vids))?,
                    None => group,
                };
                ParentSpace::from(group)
            }
        };
        Ok(parent)
    }
}

fn describe(parent: &ParentSpace) -> String {
    match parent {
        ParentSpace::Prefix(prefix) => {
            let mut line = prefix.prefix.to_string();
            if let Some(vrf) = prefix.vrf {
                line.push_str(&format!(" vrf {}", vrf));
            }
            if prefix.is_pool {
                line.push_str(" pool");
            }
            line
        }
        ParentSpace::IpRange(range) => {
            format!("{}-{}/{}", range.start(), range.end(), range.mask_length())
        }
        ParentSpace::AsnRange(range) => format!(
            "{} rir {} AS{}-AS{}",
            range.name, range.rir, range.start, range.end
        ),
        ParentSpace::VlanGroup(group) => {
            format!("{} vids {}", group.name, format_vid_ranges(&group.vid_ranges))
        }
    }
}

/// Seeds and lists parent spaces
pub struct ParentCommand {
    session: Arc<Session>,
}

impl ParentCommand {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub async fn add(&self, parent: NewParent) -> Result<String> {
        let parent = parent.build()?;
        let summary = describe(&parent);
        let created = self.session.store.insert_parent(parent).await?;
        Ok(format!("Created {}: {}", created, summary))
    }

    pub async fn list(&self, format: OutputFormat) -> Result<String> {
        let parents = self.session.store.snapshot().await.parents();
        render(&parents, format, "No parents defined", |parent| {
            format!("{:<12} {:<6} {}", parent.kind().to_string(), parent.id(), describe(parent))
        })
    }
}
