//! First-run setup of the filter config file
//!
//! Layout under the host's plugin config root:
//!
//! ```text
//! <root>/filtered-viewer/filtered-viewer.ini
//! <root>/filtered-viewer/example-converter.sh   (or .bat on Windows)
//! <root>/PreviewHTML/Filters.ini                (legacy, copied once if present)
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::constants::config::{APP_DIR, FILENAME, LEGACY_DIR, LEGACY_FILENAME};
use crate::error::ConfigError;

#[cfg(windows)]
const CONVERTER_NAME: &str = "example-converter.bat";
#[cfg(windows)]
const CONVERTER_SOURCE: &str = include_str!("../assets/example-converter.bat");

#[cfg(not(windows))]
const CONVERTER_NAME: &str = "example-converter.sh";
#[cfg(not(windows))]
const CONVERTER_SOURCE: &str = include_str!("../assets/example-converter.sh");

/// Make sure a usable config file exists and return its path.
///
/// - no plugin config root at all: `DirectoryMissing` (fatal)
/// - missing tool subdirectory: created, seeded from the legacy PreviewHTML filters if present
/// - still no config file: a commented default pointing at the bundled example converter
pub fn establish_config_file(root: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let root = root.ok_or(ConfigError::NoConfigRoot)?;
    debug!(root = %root.display(), "Main plugin config directory");

    if !root.is_dir() {
        return Err(ConfigError::DirectoryMissing(root.to_path_buf()));
    }

    let app_dir = root.join(APP_DIR);
    let config_path = app_dir.join(FILENAME);

    if !app_dir.exists() {
        fs::create_dir(&app_dir).map_err(|source| ConfigError::Bootstrap {
            path: app_dir.clone(),
            source,
        })?;
        info!(path = %app_dir.display(), "Created config directory");

        let legacy = root.join(LEGACY_DIR).join(LEGACY_FILENAME);
        if legacy.is_file() {
            info!(
                from = %legacy.display(),
                to = %config_path.display(),
                "Importing legacy PreviewHTML filters"
            );
            fs::copy(&legacy, &config_path).map_err(|source| ConfigError::Bootstrap {
                path: config_path.clone(),
                source,
            })?;
        }
    }

    if !config_path.exists() {
        let converter = install_example_converter(&app_dir)?;
        fs::write(&config_path, default_config(&converter)).map_err(|source| {
            ConfigError::Bootstrap {
                path: config_path.clone(),
                source,
            }
        })?;
        info!(path = %config_path.display(), "Wrote default config file");
    }

    Ok(config_path)
}

/// Write the bundled converter next to the config so the default config runs as-is
fn install_example_converter(app_dir: &Path) -> Result<PathBuf, ConfigError> {
    let path = app_dir.join(CONVERTER_NAME);
    if path.exists() {
        return Ok(path);
    }
    fs::write(&path, CONVERTER_SOURCE).map_err(|source| ConfigError::Bootstrap {
        path: path.clone(),
        source,
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = fs::set_permissions(&path, fs::Permissions::from_mode(0o755)) {
            // The default command goes through `sh`, so this only matters for hand-edited configs
            warn!(
                path = %path.display(),
                error = %e,
                "Could not mark example converter executable"
            );
        }
    }

    Ok(path)
}

fn converter_command(converter: &Path) -> String {
    if cfg!(windows) {
        format!("\"{}\" \"%1\"", converter.display())
    } else {
        format!("sh \"{}\" \"%1\"", converter.display())
    }
}

fn default_config(converter: &Path) -> String {
    format!(
        r#"; filtered-viewer config file (compatible with the PreviewHTML Filters.ini file)
; Everything after ; is a comment, and will help you read/understand the ini file
[IniFile]                                          ;   => the name of the section; it must be unique.  Typically, based on the language
Extension=.ini .cfg                                ;   => space-separated list of filename extensions, including the period.
Language=INI                                       ;   => the name of the language, as reported by the editor: for a user-defined language, use its name
; the 'Command=' line below is the filter command;
;   the first part of the command should be the full path to the command
;       if it has spaces in the path, it MUST have quotes around it
;       if it does not have spaces in the path, it still MAY have quotes around it
;   %1 is the name of the active file; it is in quotes "%1" because the path might contain spaces
;   the command must write the HTML to STDOUT
Command={}
; this example command wraps the text of the INI file in HTML XMP tags, so the browser renders it as plain text inside an HTML file
"#,
        converter_command(converter)
    )
}
