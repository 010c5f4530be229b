//! First-boot cloud-init document handed to the hypervisor at launch.

/// Top-level `#cloud-config` document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudConfig {
    #[serde(default)]
    pub users: Vec<CloudUser>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runcmd: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub write_files: Vec<WriteFile>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CloudUser {
    pub name: String,
    #[serde(rename = "ssh-authorized-keys", default)]
    pub ssh_authorized_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sudo: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
}

/// A literal file written on first boot
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WriteFile {
    pub path: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<String>,
}

impl CloudConfig {
    pub fn user(&self, name: &str) -> Option<&CloudUser> {
        self.users.iter().find(|u| u.name == name)
    }
}
