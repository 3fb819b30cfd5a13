//! Configuration management for filtered-viewer
//!
//! This module provides:
//! - **store**: the INI filter file parsed into a typed `Configuration`
//! - **bootstrap**: first-run creation of the config directory and file
//! - **settings**: runtime switches taken from the command line

pub mod bootstrap;
pub mod settings;
pub mod store;

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::host::EditorHost;

// Re-export commonly used types
pub use settings::Settings;
pub use store::Configuration;

/// Path of the config file for this session.
///
/// An explicit override is used as-is; otherwise the file is established
/// under the host's plugin config root, creating it on first run.
pub fn config_file(
    host: &dyn EditorHost,
    override_path: Option<&Path>,
) -> Result<PathBuf, ConfigError> {
    match override_path {
        Some(path) => Ok(path.to_path_buf()),
        None => bootstrap::establish_config_file(host.plugin_config_dir().as_deref()),
    }
}
