//! Available command

use std::sync::Arc;

use anyhow::Result;
use ipam_shared_types::ObjectId;

use super::{render, OutputFormat, Resource};
use crate::Session;

/// Lists free units of a parent
pub struct AvailableCommand {
    session: Arc<Session>,
}

impl AvailableCommand {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub async fn execute(
        &self,
        resource: Resource,
        id: ObjectId,
        limit: Option<usize>,
        format: OutputFormat,
    ) -> Result<String> {
        let service = &self.session.service;
        let none = "Nothing available";

        match resource {
            Resource::Prefixes => {
                let units = service.available_prefixes(id, limit).await?;
                render(&units, format, none, |unit| unit.prefix.to_string())
            }
            Resource::PrefixIps => {
                let units = service.available_prefix_ips(id, limit).await?;
                render(&units, format, none, |unit| unit.address.to_string())
            }
            Resource::RangeIps => {
                let units = service.available_range_ips(id, limit).await?;
                render(&units, format, none, |unit| unit.address.to_string())
            }
            Resource::Asns => {
                let units = service.available_asns(id, limit).await?;
                render(&units, format, none, |unit| format!("AS{}", unit.asn))
            }
            Resource::Vlans => {
                let units = service.available_vlans(id, limit).await?;
                render(&units, format, none, |unit| unit.vid.to_string())
            }
        }
    }
}
