//! Running filter commands into the temp area
//!
//! Output lands in `<temp>/filtered-viewer/<CRC32>.<basename>.FILTERED.html`.
//! The name depends only on the source path, so re-filtering a file rewrites
//! the same output and an already-open viewer can reload it in place.

use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use tracing::{debug, info, warn};

use crate::constants::filter::{MESSAGE_PAGE_CHECKSUM, OUTPUT_SUFFIX, SOURCE_PLACEHOLDER, TEMP_DIR};
use crate::error::FilterError;

/// The scratch directory holding filtered output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempArea {
    root: PathBuf,
}

impl TempArea {
    /// `<system temp dir>/filtered-viewer`
    pub fn system() -> Self {
        Self::at(std::env::temp_dir().join(TEMP_DIR))
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure(&self) -> Result<(), FilterError> {
        fs::create_dir_all(&self.root).map_err(|source| FilterError::Io {
            path: self.root.clone(),
            source,
        })
    }

    /// Output path for a source file
    pub fn output_path(&self, source: &Path) -> PathBuf {
        let source = normalize(source);
        let checksum = crc32fast::hash(source.to_string_lossy().as_bytes());
        self.named(checksum, &source)
    }

    /// Output path for a diagnostic page about a source file
    pub fn message_path(&self, source: &Path) -> PathBuf {
        self.named(MESSAGE_PAGE_CHECKSUM, source)
    }

    fn named(&self, checksum: u32, source: &Path) -> PathBuf {
        let basename = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.root.join(format!("{checksum:08X}.{basename}.{OUTPUT_SUFFIX}"))
    }

    /// Delete every regular file directly inside the temp area, creating it if absent.
    /// Returns the number of files removed.
    pub fn clean(&self) -> Result<usize, FilterError> {
        self.ensure()?;
        let io_err = |source: io::Error| FilterError::Io {
            path: self.root.clone(),
            source,
        };

        let mut removed = 0;
        for entry in fs::read_dir(&self.root).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() {
                debug!(path = %path.display(), "Deleting stale temp file");
                fs::remove_file(&path).map_err(|source| FilterError::Io {
                    path: path.clone(),
                    source,
                })?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Result of one filter run
#[derive(Debug)]
pub struct FilterOutput {
    pub path: PathBuf,
    pub status: ExitStatus,
}

/// Spawns filter commands with stdout captured into the temp area
#[derive(Debug, Clone)]
pub struct Filterer {
    temp: TempArea,
    working_dir: PathBuf,
    strict: bool,
}

impl Filterer {
    pub fn new(temp: TempArea, strict: bool) -> Self {
        Self {
            temp,
            working_dir: std::env::temp_dir(),
            strict,
        }
    }

    /// Run commands from another directory instead of the system temp dir
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Filter `source` through `template`.
    ///
    /// A non-zero exit status is logged and the output is still returned, since
    /// filters may emit useful partial HTML. Strict mode turns it into an error.
    pub fn run(&self, template: &str, source: &Path) -> Result<FilterOutput, FilterError> {
        let source = normalize(source);
        let command_line = substitute(template, &source);
        let destination = self.temp.output_path(&source);
        self.temp.ensure()?;

        let stdout = File::create(&destination).map_err(|source| FilterError::Io {
            path: destination.clone(),
            source,
        })?;

        info!(command = %command_line, output = %destination.display(), "Running filter");
        let output = shell(&command_line)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| FilterError::SpawnFailed {
                command: command_line.clone(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!(stderr = %stderr.trim_end(), "Filter wrote to stderr");
        }

        let size = fs::metadata(&destination).map(|m| m.len()).unwrap_or(0);
        debug!(status = %output.status, bytes = size, "Filter finished");

        if !output.status.success() {
            if self.strict {
                return Err(FilterError::ExitedNonZero {
                    command: command_line,
                    status: output.status,
                });
            }
            warn!(
                status = %output.status,
                command = %command_line,
                "Filter exited with failure, showing its output anyway"
            );
        }

        Ok(FilterOutput {
            path: destination,
            status: output.status,
        })
    }

    /// Write `message` as a plain-text HTML page in place of filtered output
    pub fn write_message_page(&self, message: &str, source: &Path) -> Result<PathBuf, FilterError> {
        self.temp.ensure()?;
        let path = self.temp.message_path(source);
        let page = format!(
            "<!DOCTYPE html>\n<meta charset=\"UTF-8\">\n<html>\n<xmp>\n{message}</xmp>\n</html>"
        );
        fs::write(&path, page).map_err(|source| FilterError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "Wrote message page");
        Ok(path)
    }
}

/// Replace every `%1` in the template with the source path
pub fn substitute(template: &str, source: &Path) -> String {
    template.replace(SOURCE_PLACEHOLDER, &source.to_string_lossy())
}

/// Absolute path with `.` and `..` folded away lexically (no symlink resolution)
pub fn normalize(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(unix)]
fn shell(command_line: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(command_line);
    command
}

#[cfg(windows)]
fn shell(command_line: &str) -> Command {
    use std::os::windows::process::CommandExt;
    let mut command = Command::new("cmd");
    command.arg("/C").raw_arg(command_line);
    command
}
