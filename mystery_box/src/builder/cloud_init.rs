//! Builds the first-boot document embedding the operator's public key.
//!
//! The VM is expected to configure itself, so the document installs the
//! remote configuration tool on first boot instead of requiring it on the
//! operator's machine.
use mystery_box_models::models::{CloudConfig, CloudUser, WriteFile};

use crate::builder::{assert_not_none, Builder, BuilderError};

/// Privileged remote user, the one configuration runs as
pub const ROOT_USER: &str = "root";

const CLOUD_CONFIG_HEADER: &str = "#cloud-config\n";

#[derive(Debug, Default)]
pub struct CloudInitBuilder {
    user: Option<String>,
    authorized_keys: Vec<String>,
    packages: Vec<String>,
    runcmd: Vec<String>,
    write_files: Vec<WriteFile>,
}

impl CloudInitBuilder {
    pub fn new() -> CloudInitBuilder {
        CloudInitBuilder::default()
    }

    /// Document used by `up`: root and `user` trust `public_key`, and the
    /// configuration tool is bootstrapped through pip.
    pub fn bootstrap(user: &str, public_key: impl Into<String>) -> CloudInitBuilder {
        CloudInitBuilder::new()
            .with_user(user.to_string())
            .with_authorized_key(public_key.into())
            .with_package("python3-pip".to_string())
            .with_runcmd("pip3 install ansible".to_string())
            .with_write_file(
                "/etc/environment".to_string(),
                "LANG=en_US.utf-8\nLC_ALL=en_US.utf-8\n".to_string(),
            )
    }

    pub fn with_user(mut self, user: String) -> CloudInitBuilder {
        self.user = Some(user);
        self
    }

    pub fn with_authorized_key(mut self, key: String) -> CloudInitBuilder {
        self.authorized_keys.push(key.trim().to_string());
        self
    }

    pub fn with_package(mut self, package: String) -> CloudInitBuilder {
        self.packages.push(package);
        self
    }

    pub fn with_runcmd(mut self, command: String) -> CloudInitBuilder {
        self.runcmd.push(command);
        self
    }

    pub fn with_write_file(mut self, path: String, content: String) -> CloudInitBuilder {
        self.write_files.push(WriteFile {
            path,
            content,
            permissions: None,
        });
        self
    }
}

impl Builder<CloudConfig> for CloudInitBuilder {
    fn try_build(self) -> Result<CloudConfig, BuilderError> {
        assert_not_none(stringify!(self.user), &self.user)?;
        if self.authorized_keys.iter().all(|k| k.is_empty()) {
            return Err(BuilderError::EmptyField("authorized_keys".to_string()));
        }
        let user = self.user.unwrap_or_default();

        let mut users = vec![CloudUser {
            name: ROOT_USER.to_string(),
            ssh_authorized_keys: self.authorized_keys.clone(),
            groups: None,
            sudo: None,
            shell: None,
        }];
        if user != ROOT_USER {
            users.push(CloudUser {
                name: user,
                ssh_authorized_keys: self.authorized_keys,
                groups: Some("sudo".to_string()),
                sudo: Some(vec!["ALL=(ALL) NOPASSWD: ALL".to_string()]),
                shell: Some("/bin/bash".to_string()),
            });
        }

        Ok(CloudConfig {
            users,
            packages: self.packages,
            runcmd: self.runcmd,
            write_files: self.write_files,
        })
    }
}

/// Serialize a document to the text format the hypervisor reads on stdin
pub fn to_yaml(config: &CloudConfig) -> Result<String, serde_yaml::Error> {
    let body = serde_yaml::to_string(config)?;
    Ok(format!("{}{}", CLOUD_CONFIG_HEADER, body))
}
