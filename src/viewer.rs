//! Opening filtered output in the default viewer

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

/// Something that can hand a file to an application
pub trait Opener {
    fn open(&self, path: &Path) -> Result<()>;
}

/// The OS default-application association, via the `open` crate
pub struct DefaultApp;

impl Opener for DefaultApp {
    fn open(&self, path: &Path) -> Result<()> {
        open::that(path).with_context(|| {
            format!("Failed to open {} with the default application", path.display())
        })
    }
}

pub struct ViewerLauncher {
    opener: Box<dyn Opener>,
}

impl ViewerLauncher {
    pub fn system() -> Self {
        Self::with_opener(DefaultApp)
    }

    pub fn with_opener(opener: impl Opener + 'static) -> Self {
        Self {
            opener: Box::new(opener),
        }
    }

    /// Open `path` in its viewer. A file that does not exist (yet) is skipped
    /// without error; returns whether a viewer was launched.
    pub fn open(&self, path: &Path) -> Result<bool> {
        if !path.exists() {
            debug!(path = %path.display(), "Nothing to view, file does not exist");
            return Ok(false);
        }
        info!(path = %path.display(), "Launching viewer");
        self.opener.open(path)?;
        Ok(true)
    }
}
