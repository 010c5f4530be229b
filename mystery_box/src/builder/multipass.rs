use std::{
    env::{split_paths, var_os},
    path::PathBuf,
    sync::Arc,
};

use tracing::warn;

use crate::{
    builder::{Builder, BuilderError},
    exec::{Execute, ProcessExecutor},
    hardware::Multipass,
};

use super::assert_not_none;

const BINARY_NAME: &str = "multipass";
const LOCATION_VAR: &str = "MULTIPASS_LOCATION";

#[derive(Debug)]
pub struct MultipassBuilder {
    binary: Option<PathBuf>,
    executor: Option<Arc<dyn Execute>>,
}

impl Default for MultipassBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipassBuilder {
    pub fn new() -> MultipassBuilder {
        MultipassBuilder {
            binary: None,
            executor: None,
        }
    }

    /// Tries to determine if `multipass` binary exists in the `$PATH` variable, if it does, it will
    /// return the path to the binary.
    fn find_binary_from_path() -> Option<PathBuf> {
        var_os("PATH").and_then(|paths| {
            split_paths(&paths)
                .map(|d| d.join(BINARY_NAME))
                .find(|full_path| full_path.is_file())
        })
    }

    /// Tries to determine if `multipass` binary exists in the current working directory
    fn find_binary_from_current_directory() -> Option<PathBuf> {
        let full_path = PathBuf::from("./").join(BINARY_NAME);
        match full_path.is_file() {
            true => Some(full_path),
            false => None,
        }
    }

    /// Tries to determine if variable `MULTIPASS_LOCATION` exists, if it does, it will check if
    /// the binary exists, if it does, it will return the content of the variable.
    fn find_binary_from_env_location() -> Option<PathBuf> {
        if let Some(path) = var_os(LOCATION_VAR) {
            if PathBuf::from(&path).is_file() {
                return Some(PathBuf::from(path));
            }

            warn!("{} is set but the file does not exist: {:?}", LOCATION_VAR, path);
        }
        None
    }

    /// Tries to determine `multipass` binary location.
    ///
    /// It is based on multiple sources (top to bottom priority).
    ///
    /// - `MULTIPASS_LOCATION` environment variable: direct path to the binary
    /// - `$PATH` environment variable: search for the binary in the directories
    /// - `multipass` binary in the current working directory
    pub fn determine_binary_location() -> Result<PathBuf, BuilderError> {
        Self::find_binary_from_env_location()
            .or_else(Self::find_binary_from_path)
            .or_else(Self::find_binary_from_current_directory)
            .ok_or_else(|| {
                BuilderError::BinaryNotFound(format!(
                    "{} is not installed or not in $PATH, set {} to its location",
                    BINARY_NAME, LOCATION_VAR
                ))
            })
    }

    /// Builder with the binary location already determined and the process
    /// executor
    pub fn auto() -> Result<MultipassBuilder, BuilderError> {
        let binary = Self::determine_binary_location()?;
        Ok(Self::new().with_binary(binary))
    }

    pub fn with_binary(mut self, binary: PathBuf) -> MultipassBuilder {
        self.binary = Some(binary);
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn Execute>) -> MultipassBuilder {
        self.executor = Some(executor);
        self
    }
}

impl Builder<Multipass> for MultipassBuilder {
    fn try_build(self) -> Result<Multipass, BuilderError> {
        assert_not_none(stringify!(self.binary), &self.binary)?;
        let executor = self.executor.unwrap_or_else(|| Arc::new(ProcessExecutor));
        Ok(Multipass::new(self.binary.unwrap_or_default(), executor))
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;
    use std::fs::File;
    use std::path::PathBuf;

    use tempfile::tempdir;

    use super::MultipassBuilder;
    use crate::builder::Builder;

    #[test]
    fn test_multipass_builder() {
        MultipassBuilder::new()
            .with_binary(PathBuf::from("/snap/bin/multipass"))
            .try_build()
            .unwrap();
    }

    #[test]
    fn test_multipass_required_fields() {
        let result = MultipassBuilder::new().try_build();
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_can_determine_binary_location_from_env() {
        let dir = tempdir().expect("failed to create temporary directory");
        let file_path = dir.path().join("multipass");
        let _file = File::create(file_path.clone()).expect("failed to create temporary file");
        std::env::set_var("MULTIPASS_LOCATION", &file_path);
        let result = MultipassBuilder::determine_binary_location();
        std::env::remove_var("MULTIPASS_LOCATION");
        assert_eq!(result.unwrap(), file_path);
    }

    #[test]
    #[serial]
    fn test_cant_determine_binary_location_from_env() {
        std::env::set_var("MULTIPASS_LOCATION", "/tmp/invalid_path/multipass");
        let result = MultipassBuilder::find_binary_from_env_location();
        std::env::remove_var("MULTIPASS_LOCATION");
        assert!(result.is_none());
    }

    #[test]
    #[serial]
    fn test_can_determine_binary_location_from_path() {
        let dir = tempdir().expect("failed to create temporary directory");
        let file_path = dir.path().join("multipass");
        let _file = File::create(file_path.clone()).expect("failed to create temporary file");

        let previous = std::env::var_os("PATH");
        std::env::set_var("PATH", dir.path());
        let result = MultipassBuilder::find_binary_from_path();
        if let Some(previous) = previous {
            std::env::set_var("PATH", previous);
        }
        assert_eq!(result, Some(file_path));
    }
}
