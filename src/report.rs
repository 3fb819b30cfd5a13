//! User-facing problem reports
//!
//! Interactive triggers get a console log line plus a host dialog. Save-triggered
//! runs must not interrupt editing, so their problems are rendered as an HTML
//! page in the viewer instead (see `OnSaveController::on_save`).

use std::path::Path;

use tracing::{error, warn};

use crate::host::{EditorHost, MessageKind};

pub const NO_SECTION_TITLE: &str = "filtered-viewer: no config found";
pub const NO_COMMAND_TITLE: &str = "filtered-viewer: no Command found in config";
pub const FILTER_FAILED_TITLE: &str = "filtered-viewer: filter failed";
pub const FATAL_TITLE: &str = "filtered-viewer fatal error";

pub fn warning(host: &mut dyn EditorHost, title: &str, message: &str) {
    warn!(title = %title, "{}", message.trim_end());
    host.show_message(title, message, MessageKind::Warning);
}

/// Warn, then open the config file so the user can fix it
pub fn warning_with_config(
    host: &mut dyn EditorHost,
    title: &str,
    message: &str,
    config_path: &Path,
) {
    warning(host, title, message);
    if let Err(e) = host.open_in_editor(config_path) {
        error!(path = %config_path.display(), error = %e, "Could not open config file for editing");
    }
}

pub fn fatal(host: &mut dyn EditorHost, message: &str) {
    error!("{}", message.trim_end());
    host.show_message(FATAL_TITLE, message, MessageKind::Error);
}

/// Text for a diagnostic page shown in place of filtered output
pub fn page_text(diagnostic: &str) -> String {
    format!(
        "{}\n\nRunning `filtered-viewer edit-config` will open the config file for you\n",
        diagnostic.trim_end()
    )
}
