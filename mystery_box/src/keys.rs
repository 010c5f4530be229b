//! # Keypair provisioning
//!
//! The RSA keypair stored in the configured key folder is the single source
//! of trust material: it is embedded in the cloud-init document and used by
//! every SSH/SCP session.
//!
//! The pair is atomic. Either both files exist and are reused as-is, or a
//! fresh pair is generated. A folder holding only one of the two files is
//! treated as corrupt and cleared before generating.
//!
//! Regeneration is not safe against two processes running at once.
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{debug, info, instrument, warn};

use crate::{
    error::BoxError,
    exec::{Execute, ProcessExecutor},
};

/// File name of the private key, the public key gets a `.pub` suffix
pub const KEY_NAME: &str = "mystery_box";

const RSA_BITS: &str = "4096";
const FOLDER_MODE: u32 = 0o700;
const KEY_MODE: u32 = 0o600;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPair {
    pub public: PathBuf,
    pub private: PathBuf,
}

impl KeyPair {
    /// Expected location of the pair inside `folder`, whether it exists or not
    pub fn in_folder(folder: &Path) -> KeyPair {
        KeyPair {
            public: folder.join(format!("{}.pub", KEY_NAME)),
            private: folder.join(KEY_NAME),
        }
    }

    /// Public key in the `ssh-rsa <base64> <comment>` text format
    pub fn read_public(&self) -> Result<String, BoxError> {
        fs::read_to_string(&self.public)
            .map(|key| key.trim().to_string())
            .map_err(|e| BoxError::filesystem(&self.public, e))
    }
}

/// Creates a new, unencrypted RSA keypair at the given locations
pub trait KeyGenerator: fmt::Debug {
    fn generate(&self, pair: &KeyPair) -> Result<(), BoxError>;
}

/// [KeyGenerator] shelling out to the local `ssh-keygen`
#[derive(Debug)]
pub struct SshKeygen {
    binary: PathBuf,
    executor: Arc<dyn Execute>,
}

impl SshKeygen {
    pub fn new(executor: Arc<dyn Execute>) -> SshKeygen {
        SshKeygen {
            binary: PathBuf::from("ssh-keygen"),
            executor,
        }
    }
}

impl Default for SshKeygen {
    fn default() -> Self {
        SshKeygen::new(Arc::new(ProcessExecutor))
    }
}

impl KeyGenerator for SshKeygen {
    #[instrument(skip(self))]
    fn generate(&self, pair: &KeyPair) -> Result<(), BoxError> {
        let private = pair.private.display().to_string();
        let args: Vec<String> = [
            "-q", "-t", "rsa", "-b", RSA_BITS, "-m", "PEM", "-N", "", "-C", KEY_NAME, "-f",
        ]
        .iter()
        .map(|a| a.to_string())
        .chain(std::iter::once(private))
        .collect();

        let output = self.executor.output(&self.binary, &args, None)?;
        if !output.success() {
            return Err(BoxError::KeyGeneration(output.combined()));
        }

        // ssh-keygen derives the public key name from the private one
        let written = PathBuf::from(format!("{}.pub", pair.private.display()));
        if written != pair.public {
            fs::rename(&written, &pair.public).map_err(|e| BoxError::filesystem(&written, e))?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct KeyStore {
    generator: Box<dyn KeyGenerator>,
}

impl Default for KeyStore {
    fn default() -> Self {
        KeyStore::new(Box::new(SshKeygen::default()))
    }
}

impl KeyStore {
    pub fn new(generator: Box<dyn KeyGenerator>) -> KeyStore {
        KeyStore { generator }
    }

    /// Return the keypair stored in `folder`, generating it when missing or
    /// half-present.
    #[instrument(skip(self))]
    pub fn ensure_key_pair(&self, folder: &Path) -> Result<KeyPair, BoxError> {
        if !folder.is_dir() {
            return Err(BoxError::filesystem(folder, "does not exist or is not a directory"));
        }
        restrict(folder, FOLDER_MODE)?;

        let pair = KeyPair::in_folder(folder);
        let public_exists = pair.public.is_file();
        let private_exists = pair.private.is_file();

        if public_exists && private_exists {
            debug!("Reusing keypair in {}", folder.display());
            return Ok(pair);
        }

        if public_exists || private_exists {
            warn!(
                "Found a partial keypair in {}, removing it before regenerating",
                folder.display()
            );
            for path in [&pair.public, &pair.private] {
                if path.exists() {
                    fs::remove_file(path).map_err(|e| BoxError::filesystem(path, e))?;
                }
            }
        }

        info!("Generating a new keypair in {}", folder.display());
        self.generator.generate(&pair)?;

        for path in [&pair.private, &pair.public] {
            if !path.is_file() {
                return Err(BoxError::KeyGeneration(format!(
                    "{} was not written",
                    path.display()
                )));
            }
            restrict(path, KEY_MODE)?;
        }
        Ok(pair)
    }
}

#[cfg(unix)]
fn restrict(path: &Path, mode: u32) -> Result<(), BoxError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| BoxError::filesystem(path, e))
}

#[cfg(not(unix))]
fn restrict(_path: &Path, _mode: u32) -> Result<(), BoxError> {
    Ok(())
}
