//! Filter-on-save state machine
//!
//! ```text
//! Inactive --register--> Active      first filter + viewer launch
//! Active   --save------> Active      re-filter, launch only outputs not seen yet
//! Active   --unregister-> Inactive   forget config and launched outputs
//! toggle = register when Inactive, unregister when Active
//! ```
//!
//! Outputs already open in a viewer are rewritten in place, so the viewer's
//! own reload picks up the change; only new outputs need a launch.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::config::{self, Configuration, Settings};
use crate::constants::host::FILTER_ON_SAVE_MARKER;
use crate::error::OnSaveError;
use crate::filter::Filterer;
use crate::host::{Document, EditorHost};
use crate::report::{self, FILTER_FAILED_TITLE, NO_COMMAND_TITLE, NO_SECTION_TITLE};
use crate::resolver::{self, ResolvedSection};
use crate::viewer::ViewerLauncher;

/// Runtime state while filter-on-save is registered (never persisted)
#[derive(Debug)]
struct ActiveSession {
    config: Configuration,
    /// Output files launched at least once this session
    launched: HashSet<PathBuf>,
}

#[derive(Debug, Default)]
enum SessionState {
    #[default]
    Inactive,
    Active(ActiveSession),
}

pub struct OnSaveController {
    settings: Settings,
    filterer: Filterer,
    viewer: ViewerLauncher,
    state: SessionState,
}

/// Status text: the language description, prefixed with a marker while active
pub fn status_text(document: &Document, active: bool) -> String {
    if active {
        format!("{FILTER_ON_SAVE_MARKER} {}", document.language_description())
    } else {
        document.language_description().to_string()
    }
}

impl OnSaveController {
    pub fn new(settings: Settings, filterer: Filterer, viewer: ViewerLauncher) -> Self {
        Self {
            settings,
            filterer,
            viewer,
            state: SessionState::Inactive,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active(_))
    }

    /// Outputs launched so far this session
    pub fn launched(&self) -> Vec<&Path> {
        match &self.state {
            SessionState::Active(session) => {
                session.launched.iter().map(PathBuf::as_path).collect()
            }
            SessionState::Inactive => Vec::new(),
        }
    }

    /// Load the config, filter and show the current document, then start
    /// listening for saves. Problems with the document are reported to the
    /// user and leave the controller inactive; config location errors are returned.
    pub fn register(&mut self, host: &mut dyn EditorHost) -> Result<()> {
        let config_path = config::config_file(&*host, self.settings.config_override.as_deref())?;
        let config = Configuration::load(&config_path)?;
        let document = host.current_document();

        let resolved = resolver::resolve(&config, document.language.as_deref(), &document.path);
        let section = match resolved {
            ResolvedSection::Found { section, .. } => section,
            ResolvedSection::NoMatch { diagnostic, .. } => {
                report::warning_with_config(host, NO_SECTION_TITLE, &diagnostic, &config_path);
                return self.unregister(host);
            }
        };
        let command = match resolver::ensure_command(&config, &section) {
            Ok(command) => command.to_string(),
            Err(missing) => {
                let diagnostic = &missing.diagnostic;
                report::warning_with_config(host, NO_COMMAND_TITLE, diagnostic, &config_path);
                return self.unregister(host);
            }
        };
        let output = match self.filterer.run(&command, &document.path) {
            Ok(output) => output.path,
            Err(e) => {
                report::warning(host, FILTER_FAILED_TITLE, &e.to_string());
                return self.unregister(host);
            }
        };

        if let Err(e) = self.viewer.open(&output) {
            warn!(error = %e, "Could not launch viewer");
        }

        self.state = SessionState::Active(ActiveSession {
            config,
            launched: HashSet::from([output]),
        });
        host.set_save_notifications(true)?;
        host.set_status(&status_text(&document, true));
        info!(section = %section, document = %document.path.display(), "Filter on save registered");
        Ok(())
    }

    pub fn unregister(&mut self, host: &mut dyn EditorHost) -> Result<()> {
        if self.is_active() {
            info!("Filter on save unregistered");
        }
        self.state = SessionState::Inactive;
        host.set_save_notifications(false)?;
        host.set_status(&status_text(&host.current_document(), false));
        Ok(())
    }

    pub fn toggle(&mut self, host: &mut dyn EditorHost) -> Result<()> {
        if self.is_active() {
            debug!("Toggle: active, so unregister");
            self.unregister(host)
        } else {
            debug!("Toggle: inactive, so register");
            self.register(host)
        }
    }

    /// Handle a save of the current document.
    ///
    /// Never shows a dialog: a document without a usable section gets a
    /// diagnostic page in the viewer instead, and the session stays active.
    pub fn on_save(&mut self, host: &mut dyn EditorHost) -> Result<()> {
        let SessionState::Active(session) = &mut self.state else {
            error!("Save event arrived while filter on save is not registered");
            return Err(OnSaveError::NotRegistered.into());
        };
        let document = host.current_document();
        debug!(
            document = %document.path.display(),
            launched = session.launched.len(),
            "Document saved"
        );

        let config = &session.config;
        let resolved = resolver::resolve(config, document.language.as_deref(), &document.path);
        let outcome = match &resolved {
            ResolvedSection::Found { section, .. } => {
                match resolver::ensure_command(config, section) {
                    Ok(command) => self
                        .filterer
                        .run(command, &document.path)
                        .map(|output| output.path)
                        .map_err(|e| e.to_string()),
                    Err(missing) => Err(missing.diagnostic),
                }
            }
            ResolvedSection::NoMatch { diagnostic, .. } => Err(diagnostic.clone()),
        };
        let output = match outcome {
            Ok(path) => path,
            Err(problem) => {
                warn!(document = %document.path.display(), "{}", problem.trim_end());
                self.filterer.write_message_page(&report::page_text(&problem), &document.path)?
            }
        };

        if session.launched.insert(output.clone()) {
            if let Err(e) = self.viewer.open(&output) {
                warn!(error = %e, "Could not launch viewer");
            }
        } else {
            debug!(output = %output.display(), "Already launched, viewer reloads it");
        }

        host.set_status(&status_text(&document, true));
        Ok(())
    }
}
