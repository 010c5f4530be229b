//! Reports produced by `multipass list --format json` and
//! `multipass info <name> --format json`.
//!
//! Only the fields the orchestrator reads are modelled; everything else in
//! the reports is ignored on deserialization.
use std::collections::HashMap;

use super::vm_record::{VmRecord, VmState};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListReport {
    #[serde(default)]
    pub list: Vec<ListEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListEntry {
    pub name: String,
    pub state: String,
    #[serde(default)]
    pub ipv4: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
}

impl ListEntry {
    pub fn to_record(&self) -> VmRecord {
        VmRecord {
            name: self.name.clone(),
            state: VmState::from_driver(&self.state),
            ipv4: self.ipv4.first().cloned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InfoReport {
    /// Errors are free-form values, usually strings
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
    #[serde(default)]
    pub info: HashMap<String, InstanceInfo>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstanceInfo {
    pub state: String,
    #[serde(default)]
    pub ipv4: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_release: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
}

impl InstanceInfo {
    pub fn to_record(&self, name: &str) -> VmRecord {
        VmRecord {
            name: name.to_string(),
            state: VmState::from_driver(&self.state),
            ipv4: self.ipv4.first().cloned(),
        }
    }
}
