//! This module provides the `ConfigLoader` struct, responsible for loading machine
//! configurations from files, strings and directories.

use crate::parser::parse;
use crate::types::{MachineConfig, MachineError};
use std::fs;
use std::path::{Path, PathBuf};

/// File extension of machine configuration files.
pub const CONFIG_EXTENSION: &str = "utm";

/// `ConfigLoader` is a utility struct for loading machine configurations.
/// It loads single files, string content, and every `.utm` file within a directory.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads a single configuration from the specified file path.
    ///
    /// # Returns
    ///
    /// * `Ok(MachineConfig)` if the file is successfully read and parsed.
    /// * `Err(MachineError::FileError)` if the file cannot be read.
    /// * `Err(MachineError::ParseError)` or `Err(MachineError::ValidationError)` if the
    ///   content is not a valid configuration.
    pub fn load_config(path: &Path) -> Result<MachineConfig, MachineError> {
        let content = fs::read_to_string(path).map_err(|e| {
            MachineError::FileError(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        parse(&content)
    }

    /// Loads a single configuration from the provided string content, e.g. piped from stdin.
    pub fn load_config_from_string(content: &str) -> Result<MachineConfig, MachineError> {
        parse(content)
    }

    /// Loads all configuration files (`.utm` extension) from a given directory.
    ///
    /// Directories and files with other extensions are skipped. Each element of the result is
    /// either a loaded configuration with its path or the error that prevented loading it.
    pub fn load_configs(directory: &Path) -> Vec<Result<(PathBuf, MachineConfig), MachineError>> {
        if !directory.exists() {
            return vec![Err(MachineError::FileError(format!(
                "Directory {} does not exist",
                directory.display()
            )))];
        }

        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![Err(MachineError::FileError(format!(
                    "Failed to read directory {}: {}",
                    directory.display(),
                    e
                )))]
            }
        };

        entries
            .filter_map(|entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        return Some(Err(MachineError::FileError(format!(
                            "Failed to read directory entry: {}",
                            e
                        ))))
                    }
                };

                let path = entry.path();

                if path.is_dir() || path.extension().is_none_or(|ext| ext != CONFIG_EXTENSION) {
                    return None;
                }

                match Self::load_config(&path) {
                    Ok(config) => Some(Ok((path, config))),
                    Err(e) => Some(Err(MachineError::FileError(format!(
                        "Failed to load configuration from {}: {}",
                        path.display(),
                        e
                    )))),
                }
            })
            .collect()
    }
}
