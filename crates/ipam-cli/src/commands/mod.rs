//! CLI commands

pub mod allocate;
pub mod available;
pub mod config;
pub mod parent;
pub mod release;

pub use allocate::{AllocateArgs, AllocateCommand};
pub use available::AvailableCommand;
pub use config::ConfigCommand;
pub use parent::{NewParent, ParentCommand};
pub use release::{RecordKind, ReleaseCommand};

use anyhow::Result;
use serde::Serialize;

/// Resource listed or allocated from a parent
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    /// Child prefixes of a prefix
    Prefixes,
    /// Addresses of a prefix
    PrefixIps,
    /// Addresses of an IP range
    RangeIps,
    /// ASNs of an ASN range
    Asns,
    /// VLANs of a VLAN group
    Vlans,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Pretty JSON, or one line per item with `empty` for an empty list
pub(crate) fn render<T: Serialize>(
    items: &[T],
    format: OutputFormat,
    empty: &str,
    line: impl Fn(&T) -> String,
) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(items)?),
        OutputFormat::Text if items.is_empty() => Ok(empty.to_string()),
        OutputFormat::Text => Ok(items.iter().map(line).collect::<Vec<_>>().join("\n")),
    }
}
