//! Entry points behind the subcommands

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{self, Configuration, Settings};
use crate::constants::filter::DELETE_DELAY_SECS;
use crate::event_handler::{Flow, handle_event};
use crate::filter::{Filterer, TempArea};
use crate::host::{EditorHost, TerminalHost};
use crate::on_save::OnSaveController;
use crate::report::{self, FILTER_FAILED_TITLE, NO_COMMAND_TITLE, NO_SECTION_TITLE};
use crate::resolver::{self, ResolvedSection};
use crate::viewer::ViewerLauncher;

/// Filter the current document once and open the result.
///
/// Returns the launched output, or `None` when the user was shown a
/// warning instead.
pub fn view(
    host: &mut dyn EditorHost,
    settings: &Settings,
    filterer: &Filterer,
    viewer: &ViewerLauncher,
) -> Result<Option<PathBuf>> {
    let config_path = config::config_file(&*host, settings.config_override.as_deref())?;
    let config = Configuration::load(&config_path)?;
    let document = host.current_document();

    let section = match resolver::resolve(&config, document.language.as_deref(), &document.path) {
        ResolvedSection::Found { section, .. } => section,
        ResolvedSection::NoMatch { diagnostic, .. } => {
            report::warning_with_config(host, NO_SECTION_TITLE, &diagnostic, &config_path);
            return Ok(None);
        }
    };
    let command = match resolver::ensure_command(&config, &section) {
        Ok(command) => command,
        Err(missing) => {
            report::warning_with_config(host, NO_COMMAND_TITLE, &missing.diagnostic, &config_path);
            return Ok(None);
        }
    };
    let output = match filterer.run(command, &document.path) {
        Ok(output) => {
            debug!(section = %section, success = output.status.success(), "Filtered");
            output.path
        }
        Err(e) => {
            report::warning(host, FILTER_FAILED_TITLE, &e.to_string());
            return Ok(None);
        }
    };

    if !viewer.open(&output)? {
        return Ok(None);
    }
    if !settings.keep_temp {
        delete_after(&output, Duration::from_secs(DELETE_DELAY_SECS));
    }
    Ok(Some(output))
}

/// Give the viewer time to load `path`, then remove it
fn delete_after(path: &Path, delay: Duration) {
    debug!(path = %path.display(), delay_secs = delay.as_secs(), "Deleting output after delay");
    thread::sleep(delay);
    if let Err(e) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "Could not delete filtered output");
    }
}

/// Open the config file in the editor, creating it on first run
pub fn edit_config(host: &mut dyn EditorHost, settings: &Settings) -> Result<PathBuf> {
    let path = config::config_file(&*host, settings.config_override.as_deref())?;
    info!(path = %path.display(), "Editing config file");
    host.open_in_editor(&path)?;
    Ok(path)
}

/// Resolution of one file, as printed by `resolve`
#[derive(Debug, Serialize)]
pub struct ResolveReport {
    pub file: PathBuf,
    pub config: PathBuf,
    /// Language as reported by the host, before any `udf - ` unwrapping
    pub document_language: Option<String>,
    #[serde(flatten)]
    pub resolution: ResolvedSection,
    /// Command template of the matched section, if it has one
    pub command: Option<String>,
}

impl ResolveReport {
    pub fn render(&self) -> String {
        let mut text = format!(
            "file:    {}\nconfig:  {}\n",
            self.file.display(),
            self.config.display()
        );
        if let Some(language) = &self.document_language {
            text.push_str(&format!("language: {language}\n"));
        }
        match &self.resolution {
            ResolvedSection::Found { section, matched_by } => {
                text.push_str(&format!("section: [{section}] (by {})\n", matched_by.as_str()));
                match &self.command {
                    Some(command) => text.push_str(&format!("command: {command}\n")),
                    None => text.push_str("command: <missing>\n"),
                }
            }
            ResolvedSection::NoMatch { diagnostic, .. } => {
                text.push('\n');
                text.push_str(diagnostic);
            }
        }
        text
    }
}

pub fn resolve(host: &dyn EditorHost, settings: &Settings) -> Result<ResolveReport> {
    let config_path = config::config_file(host, settings.config_override.as_deref())?;
    let config = Configuration::load(&config_path)?;
    let document = host.current_document();

    let resolution = resolver::resolve(&config, document.language.as_deref(), &document.path);
    let command = resolution
        .section()
        .and_then(|section| resolver::ensure_command(&config, section).ok())
        .map(str::to_string);

    Ok(ResolveReport {
        file: document.path,
        config: config_path,
        document_language: document.language,
        resolution,
        command,
    })
}

pub fn clean(temp: &TempArea) -> Result<usize> {
    let removed = temp
        .clean()
        .with_context(|| format!("Failed to clean {}", temp.root().display()))?;
    info!(removed, dir = %temp.root().display(), "Cleaned temp area");
    Ok(removed)
}

/// Register filter-on-save and process host events until quit or a signal
pub fn watch(
    host: &mut TerminalHost,
    controller: &mut OnSaveController,
    settings: &Settings,
) -> Result<()> {
    host.install_signal_handlers()?;
    let _reader = host.spawn_control_reader();

    if let Err(e) = controller.register(host) {
        report::fatal(host, &format!("{e:#}"));
    }
    info!("Watching for saves; type toggle, register, unregister, edit-config or quit");

    while let Some(event) = host.next_event() {
        match handle_event(controller, host, settings, event) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => report::fatal(host, &format!("{e:#}")),
        }
    }

    info!(outputs = controller.launched().len(), "Stopped watching");
    controller.unregister(host)
}
