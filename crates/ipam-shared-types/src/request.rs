//! Allocation requests, one per unit to create

use serde::{Deserialize, Serialize};

use crate::parent::PrefixStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefixRequest {
    /// Mask length of the prefix to carve
    pub prefix_length: u8,
    pub status: Option<PrefixStatus>,
    #[serde(default)]
    pub is_pool: bool,
    pub tenant: Option<String>,
    pub description: Option<String>,
}

impl PrefixRequest {
    pub fn new(prefix_length: u8) -> Self {
        Self {
            prefix_length,
            status: None,
            is_pool: false,
            tenant: None,
            description: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IpAddressRequest {
    pub tenant: Option<String>,
    pub description: Option<String>,
}

impl IpAddressRequest {
    pub fn with_description(description: &str) -> Self {
        Self {
            tenant: None,
            description: Some(description.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AsnRequest {
    pub tenant: Option<String>,
    pub description: Option<String>,
}

impl AsnRequest {
    pub fn with_description(description: &str) -> Self {
        Self {
            tenant: None,
            description: Some(description.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VlanRequest {
    /// Explicit VID; the next free one when absent
    pub vid: Option<u16>,
    pub name: String,
    pub tenant: Option<String>,
    pub description: Option<String>,
}

impl VlanRequest {
    pub fn new(name: &str) -> Self {
        Self {
            vid: None,
            name: name.to_string(),
            tenant: None,
            description: None,
        }
    }

    pub fn pinned(name: &str, vid: u16) -> Self {
        Self {
            vid: Some(vid),
            ..Self::new(name)
        }
    }
}
