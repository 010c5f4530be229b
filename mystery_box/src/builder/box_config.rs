//! Validated description of the desired VM and its configuration inputs.
//!
//! [BoxConfig] can only be obtained through [BoxConfigBuilder::try_build],
//! which rejects the whole object if a required field is absent or a local
//! path it references does not exist. Local paths are resolved to absolute
//! paths at build time, a leading `~` standing for the home directory.
use std::path::{Component, Path, PathBuf};

use crate::builder::{assert_not_none, Builder, BuilderError};

/// A single file pushed to the VM before configuration runs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CopyEntry {
    /// Absolute local path, known to exist at validation time
    pub src: PathBuf,
    /// Remote path, opaque to the host apart from the characters the remote
    /// shell would reinterpret, which are refused
    pub dest: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoxConfig {
    user: String,
    memory: String,
    disk: String,
    playbooks: Vec<PathBuf>,
    copy: Vec<CopyEntry>,
    key_folder: PathBuf,
}

impl BoxConfig {
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Hypervisor-format size such as `3G`, passed through unvalidated
    pub fn memory(&self) -> &str {
        &self.memory
    }

    pub fn disk(&self) -> &str {
        &self.disk
    }

    pub fn playbooks(&self) -> &[PathBuf] {
        &self.playbooks
    }

    pub fn copy_manifest(&self) -> &[CopyEntry] {
        &self.copy
    }

    pub fn key_folder(&self) -> &Path {
        &self.key_folder
    }

    /// Build a new configuration identical to this one except for its
    /// playbooks, which go through the same validation.
    pub fn with_playbooks(&self, playbooks: Vec<PathBuf>) -> Result<BoxConfig, BuilderError> {
        let mut builder = BoxConfigBuilder::new()
            .with_user(self.user.clone())
            .with_memory(self.memory.clone())
            .with_disk(self.disk.clone())
            .with_key_folder(self.key_folder.clone());
        for entry in &self.copy {
            builder = builder.with_copy(entry.src.clone(), entry.dest.clone());
        }
        for playbook in playbooks {
            builder = builder.with_playbook(playbook);
        }
        builder.try_build()
    }
}

/// Copy entry as provided to the builder; either side may be missing
#[derive(Debug, Default)]
struct PendingCopy {
    src: Option<PathBuf>,
    dest: Option<String>,
}

#[derive(Debug, Default)]
pub struct BoxConfigBuilder {
    user: Option<String>,
    memory: Option<String>,
    disk: Option<String>,
    playbooks: Vec<PathBuf>,
    copy: Vec<PendingCopy>,
    key_folder: Option<PathBuf>,
    base_dir: Option<PathBuf>,
}

impl BoxConfigBuilder {
    pub fn new() -> BoxConfigBuilder {
        BoxConfigBuilder::default()
    }

    pub fn with_user(mut self, user: String) -> BoxConfigBuilder {
        self.user = Some(user);
        self
    }

    pub fn with_memory(mut self, memory: String) -> BoxConfigBuilder {
        self.memory = Some(memory);
        self
    }

    pub fn with_disk(mut self, disk: String) -> BoxConfigBuilder {
        self.disk = Some(disk);
        self
    }

    pub fn with_playbook(mut self, playbook: impl Into<PathBuf>) -> BoxConfigBuilder {
        self.playbooks.push(playbook.into());
        self
    }

    pub fn with_copy(mut self, src: impl Into<PathBuf>, dest: impl Into<String>) -> BoxConfigBuilder {
        self.copy.push(PendingCopy {
            src: Some(src.into()),
            dest: Some(dest.into()),
        });
        self
    }

    /// Add a copy entry straight from a parsed document, where `src` or
    /// `dest` may be missing. The gap is reported by [Builder::try_build].
    pub fn with_partial_copy(
        mut self,
        src: Option<PathBuf>,
        dest: Option<String>,
    ) -> BoxConfigBuilder {
        self.copy.push(PendingCopy { src, dest });
        self
    }

    pub fn with_key_folder(mut self, key_folder: impl Into<PathBuf>) -> BoxConfigBuilder {
        self.key_folder = Some(key_folder.into());
        self
    }

    /// Directory relative local paths are resolved against, usually the one
    /// holding the configuration file. Defaults to the working directory.
    pub fn relative_to(mut self, base_dir: impl Into<PathBuf>) -> BoxConfigBuilder {
        self.base_dir = Some(base_dir.into());
        self
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf, BuilderError> {
        let path = expand_home(path)?;
        let joined = match (&self.base_dir, path.is_relative()) {
            (Some(base), true) => base.join(path),
            _ => path.to_path_buf(),
        };
        joined
            .canonicalize()
            .map_err(|_| BuilderError::PathNotFound(joined.clone()))
    }
}

/// Replace a leading `~` component with the home directory
fn expand_home(path: &Path) -> Result<PathBuf, BuilderError> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let home =
                dirs::home_dir().ok_or_else(|| BuilderError::HomeNotFound(path.to_path_buf()))?;
            Ok(home.join(components.as_path()))
        }
        _ => Ok(path.to_path_buf()),
    }
}

/// scp hands the destination to the remote shell, anything it would split or
/// expand is rejected. A leading `~` is left to the remote side.
fn is_safe_remote_path(dest: &str) -> bool {
    !dest.is_empty()
        && !dest.chars().any(|c| {
            c.is_whitespace()
                || matches!(
                    c,
                    '\'' | '"' | '`' | '$' | '\\' | ';' | '&' | '|' | '<' | '>' | '(' | ')'
                        | '*' | '?' | '[' | ']' | '{' | '}' | '!' | '#'
                )
        })
}

impl Builder<BoxConfig> for BoxConfigBuilder {
    fn try_build(self) -> Result<BoxConfig, BuilderError> {
        assert_not_none(stringify!(user), &self.user)?;
        assert_not_none(stringify!(memory), &self.memory)?;
        assert_not_none(stringify!(disk), &self.disk)?;

        let user = self.user.clone().unwrap_or_default();
        if user.trim().is_empty() {
            return Err(BuilderError::EmptyField("user".to_string()));
        }

        let mut playbooks = Vec::with_capacity(self.playbooks.len());
        for playbook in &self.playbooks {
            playbooks.push(self.resolve(playbook)?);
        }

        let mut copy = Vec::with_capacity(self.copy.len());
        for (index, entry) in self.copy.iter().enumerate() {
            let src = entry
                .src
                .as_ref()
                .ok_or(BuilderError::IncompleteCopyEntry { index, field: "src" })?;
            let dest = entry
                .dest
                .as_ref()
                .ok_or(BuilderError::IncompleteCopyEntry {
                    index,
                    field: "dest",
                })?;
            if !is_safe_remote_path(dest) {
                return Err(BuilderError::UnsafeRemotePath {
                    index,
                    dest: dest.clone(),
                });
            }
            copy.push(CopyEntry {
                src: self.resolve(src)?,
                dest: dest.clone(),
            });
        }

        let key_folder = self
            .key_folder
            .as_ref()
            .map(|folder| self.resolve(folder))
            .ok_or_else(|| BuilderError::MissingRequiredField("key_folder".to_string()))??;
        if !key_folder.is_dir() {
            return Err(BuilderError::NotADirectory(key_folder));
        }

        Ok(BoxConfig {
            user,
            memory: self.memory.unwrap_or_default(),
            disk: self.disk.unwrap_or_default(),
            playbooks,
            copy,
            key_folder,
        })
    }
}
