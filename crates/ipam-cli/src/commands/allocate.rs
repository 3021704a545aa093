//! Allocate command

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use ipam_shared_types::{AsnRequest, IpAddressRequest, ObjectId, PrefixRequest, VlanRequest};

use super::{render, OutputFormat, Resource};
use crate::Session;

/// What to allocate; one request is built per `count`
#[derive(Args, Debug, Clone, Default)]
pub struct AllocateArgs {
    /// Number of units to allocate in one batch
    #[arg(short, long, default_value_t = 1)]
    pub count: usize,

    /// Mask length of each child prefix
    #[arg(short, long)]
    pub prefix_length: Option<u8>,

    /// Explicit VLAN ID
    #[arg(long)]
    pub vid: Option<u16>,

    /// VLAN name; numbered when more than one VLAN is requested
    #[arg(short, long)]
    pub name: Option<String>,

    #[arg(short, long)]
    pub description: Option<String>,

    #[arg(short, long)]
    pub tenant: Option<String>,
}

impl AllocateArgs {
    fn prefix_requests(&self) -> Result<Vec<PrefixRequest>> {
        let length = self
            .prefix_length
            .context("--prefix-length is required to allocate prefixes")?;
        let mut request = PrefixRequest::new(length);
        request.description = self.description.clone();
        request.tenant = self.tenant.clone();
        Ok(vec![request; self.count])
    }

    fn ip_requests(&self) -> Vec<IpAddressRequest> {
        let request = IpAddressRequest {
            tenant: self.tenant.clone(),
            description: self.description.clone(),
        };
        vec![request; self.count]
    }

    fn asn_requests(&self) -> Vec<AsnRequest> {
        let request = AsnRequest {
            tenant: self.tenant.clone(),
            description: self.description.clone(),
        };
        vec![request; self.count]
    }

    fn vlan_requests(&self) -> Result<Vec<VlanRequest>> {
        let name = self
            .name
            .as_deref()
            .context("--name is required to allocate VLANs")?;
        if self.vid.is_some() && self.count > 1 {
            bail!("--vid pins a single VLAN and cannot be combined with --count");
        }

        Ok((1..=self.count)
            .map(|n| {
                let name = if self.count > 1 {
                    format!("{}-{}", name, n)
                } else {
                    name.to_string()
                };
                let mut request = VlanRequest::new(&name);
                request.vid = self.vid;
                request.description = self.description.clone();
                request.tenant = self.tenant.clone();
                request
            })
            .collect())
    }
}

/// Allocates a batch of units from a parent
pub struct AllocateCommand {
    session: Arc<Session>,
}

impl AllocateCommand {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub async fn execute(
        &self,
        resource: Resource,
        id: ObjectId,
        args: &AllocateArgs,
        format: OutputFormat,
    ) -> Result<String> {
        if args.count == 0 {
            bail!("--count must be at least 1");
        }
        let service = &self.session.service;
        let none = "Nothing allocated";

        let output = match resource {
            Resource::Prefixes => {
                let created = service.allocate_prefixes(id, &args.prefix_requests()?).await?;
                render(&created, format, none, |prefix| {
                    format!("prefix {} (id {})", prefix.prefix, prefix.id)
                })?
            }
            Resource::PrefixIps => {
                let created = service.allocate_prefix_ips(id, &args.ip_requests()).await?;
                render(&created, format, none, |ip| {
                    format!("address {} (id {})", ip.address, ip.id)
                })?
            }
            Resource::RangeIps => {
                let created = service.allocate_range_ips(id, &args.ip_requests()).await?;
                render(&created, format, none, |ip| {
                    format!("address {} (id {})", ip.address, ip.id)
                })?
            }
            Resource::Asns => {
                let created = service.allocate_asns(id, &args.asn_requests()).await?;
                render(&created, format, none, |asn| {
                    format!("AS{} (id {})", asn.asn, asn.id)
                })?
            }
            Resource::Vlans => {
                let created = service.allocate_vlans(id, &args.vlan_requests()?).await?;
                render(&created, format, none, |vlan| {
                    format!("VLAN {} {} (id {})", vlan.vid, vlan.name, vlan.id)
                })?
            }
        };

        log::info!("Allocated {} x {:?} from #{}", args.count, resource, id);
        Ok(output)
    }
}
