//! Loading of the `box.yaml` configuration file.
//!
//! ```yaml
//! user: dev
//! memory: 3G
//! disk: 30G
//! key_folder: ~/.mystery_box   # must exist
//! playbooks:
//!   - playbooks/devbox.yaml
//! copy:
//!   - src: ~/.gitconfig
//!     dest: /home/dev/.gitconfig
//! ```
//!
//! Relative paths are resolved against the directory holding the file, a
//! leading `~` against the home directory.
use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, instrument};

use crate::{
    builder::{
        box_config::{BoxConfig, BoxConfigBuilder},
        Builder,
    },
    error::BoxError,
};

pub const DEFAULT_CONFIG_FILE: &str = "box.yaml";

/// The file as written by the operator, before validation
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct RawBoxConfig {
    user: Option<String>,
    memory: Option<String>,
    disk: Option<String>,
    #[serde(default)]
    playbooks: Vec<PathBuf>,
    #[serde(default)]
    copy: Vec<RawCopy>,
    key_folder: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
struct RawCopy {
    src: Option<PathBuf>,
    dest: Option<String>,
}

impl RawBoxConfig {
    fn into_builder(self) -> BoxConfigBuilder {
        let mut builder = BoxConfigBuilder::new();
        if let Some(user) = self.user {
            builder = builder.with_user(user);
        }
        if let Some(memory) = self.memory {
            builder = builder.with_memory(memory);
        }
        if let Some(disk) = self.disk {
            builder = builder.with_disk(disk);
        }
        if let Some(key_folder) = self.key_folder {
            builder = builder.with_key_folder(key_folder);
        }
        for playbook in self.playbooks {
            builder = builder.with_playbook(playbook);
        }
        for entry in self.copy {
            builder = builder.with_partial_copy(entry.src, entry.dest);
        }
        builder
    }
}

/// Read and validate the configuration at `path`, `./box.yaml` by default
#[instrument]
pub fn load_config(path: Option<&Path>) -> Result<BoxConfig, BoxError> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    let content = fs::read_to_string(path).map_err(|e| BoxError::ConfigFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let raw: RawBoxConfig = serde_yaml::from_str(&content).map_err(|e| BoxError::ConfigFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let base_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    debug!("Resolving paths of {} against {}", path.display(), base_dir.display());
    let config = raw.into_builder().relative_to(base_dir).try_build()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::{env, fs};

    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use tempfile::tempdir;

    use super::load_config;
    use crate::{builder::BuilderError, error::BoxError};

    #[test]
    fn loads_and_resolves_relative_paths() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("keys")).unwrap();
        fs::create_dir(dir.path().join("playbooks")).unwrap();
        fs::write(dir.path().join("playbooks/devbox.yaml"), "- hosts: all").unwrap();
        fs::write(dir.path().join("gitconfig"), "").unwrap();
        let file = dir.path().join("box.yaml");
        fs::write(
            &file,
            "user: dev\nmemory: 3G\ndisk: 30G\nkey_folder: keys\nplaybooks:\n  - playbooks/devbox.yaml\ncopy:\n  - src: gitconfig\n    dest: /home/dev/.gitconfig\n",
        )
        .unwrap();

        let config = load_config(Some(file.as_path())).unwrap();
        let root = dir.path().canonicalize().unwrap();
        assert_eq!(config.user(), "dev");
        assert_eq!(config.memory(), "3G");
        assert_eq!(config.key_folder(), root.join("keys"));
        assert_eq!(config.playbooks(), &[root.join("playbooks/devbox.yaml")]);
        assert_eq!(config.copy_manifest()[0].src, root.join("gitconfig"));
        assert_eq!(config.copy_manifest()[0].dest, "/home/dev/.gitconfig");
    }

    #[test]
    fn playbooks_and_copy_are_optional() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("box.yaml");
        fs::write(&file, "user: dev\nmemory: 2G\ndisk: 10G\nkey_folder: .\n").unwrap();

        let config = load_config(Some(file.as_path())).unwrap();
        assert!(config.playbooks().is_empty());
        assert!(config.copy_manifest().is_empty());
    }

    #[test]
    fn missing_file() {
        let dir = tempdir().unwrap();
        let err = load_config(Some(dir.path().join("box.yaml").as_path())).unwrap_err();
        assert!(matches!(err, BoxError::ConfigFile { .. }));
    }

    #[test]
    fn malformed_yaml() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("box.yaml");
        fs::write(&file, "user: [dev\n").unwrap();
        let err = load_config(Some(file.as_path())).unwrap_err();
        assert!(matches!(err, BoxError::ConfigFile { ref path, .. } if path == &file));
    }

    #[test]
    fn missing_playbook_is_named() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("box.yaml");
        fs::write(
            &file,
            "user: dev\nmemory: 2G\ndisk: 10G\nkey_folder: .\nplaybooks: [site.yaml]\n",
        )
        .unwrap();
        let err = load_config(Some(file.as_path())).unwrap_err();
        match err {
            BoxError::Validation(BuilderError::PathNotFound(path)) => {
                assert!(path.ends_with("site.yaml"))
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn incomplete_copy_entry() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("box.yaml");
        fs::write(
            &file,
            "user: dev\nmemory: 2G\ndisk: 10G\nkey_folder: .\ncopy:\n  - src: box.yaml\n",
        )
        .unwrap();
        let err = load_config(Some(file.as_path())).unwrap_err();
        assert!(matches!(
            err,
            BoxError::Validation(BuilderError::IncompleteCopyEntry {
                index: 0,
                field: "dest"
            })
        ));
    }

    #[test]
    #[serial]
    fn defaults_to_box_yaml_in_working_directory() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("box.yaml"),
            "user: dev\nmemory: 2G\ndisk: 10G\nkey_folder: .\n",
        )
        .unwrap();
        let previous = env::current_dir().unwrap();
        env::set_current_dir(dir.path()).unwrap();
        let loaded = load_config(None);
        env::set_current_dir(previous).unwrap();

        assert_eq!(
            loaded.unwrap().key_folder(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    #[serial]
    fn tilde_paths_resolve_under_home() {
        let home = tempdir().unwrap();
        fs::create_dir(home.path().join(".mystery_box")).unwrap();
        fs::write(home.path().join(".gitconfig"), "").unwrap();
        let dir = tempdir().unwrap();
        let file = dir.path().join("box.yaml");
        fs::write(
            &file,
            "user: dev\nmemory: 3G\ndisk: 30G\nkey_folder: ~/.mystery_box\ncopy:\n  - src: ~/.gitconfig\n    dest: /home/dev/.gitconfig\n",
        )
        .unwrap();

        let previous = env::var_os("HOME");
        env::set_var("HOME", home.path());
        let loaded = load_config(Some(file.as_path()));
        match previous {
            Some(value) => env::set_var("HOME", value),
            None => env::remove_var("HOME"),
        }

        let config = loaded.unwrap();
        let root = home.path().canonicalize().unwrap();
        assert_eq!(config.key_folder(), root.join(".mystery_box"));
        assert_eq!(config.copy_manifest()[0].src, root.join(".gitconfig"));
    }
}
