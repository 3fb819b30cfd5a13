//! Editor host capabilities
//!
//! Everything the filter flow needs from the editor it runs inside: the
//! active document, the plugin config root, dialogs, status text and save
//! notifications. `TerminalHost` is the command-line implementation.

mod terminal;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Result;

use crate::constants::host::PLAIN_TEXT_DESC;

pub use terminal::TerminalHost;

/// The document the user is looking at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    /// Language name as the host reports it (`"udf - Name"` for user-defined languages)
    pub language: Option<String>,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, language: Option<String>) -> Self {
        Self {
            path: path.into(),
            language,
        }
    }

    /// Human readable language, used in the status text
    pub fn language_description(&self) -> &str {
        self.language.as_deref().unwrap_or(PLAIN_TEXT_DESC)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Warning,
    Error,
}

pub trait EditorHost {
    fn current_document(&self) -> Document;

    /// Root directory under which plugins keep their config, if the host has one
    fn plugin_config_dir(&self) -> Option<PathBuf>;

    /// Open a file for editing
    fn open_in_editor(&mut self, path: &Path) -> Result<()>;

    fn set_status(&mut self, text: &str);

    /// Blocking message to the user
    fn show_message(&mut self, title: &str, message: &str, kind: MessageKind);

    /// Start or stop delivering "document saved" events
    fn set_save_notifications(&mut self, enabled: bool) -> Result<()>;
}

/// Commands accepted on the watch-mode control channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Register,
    Unregister,
    Toggle,
    EditConfig,
    Quit,
}

impl FromStr for ControlCommand {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "register" => Ok(Self::Register),
            "unregister" => Ok(Self::Unregister),
            "toggle" => Ok(Self::Toggle),
            "edit-config" | "edit" => Ok(Self::EditConfig),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(format!("unknown command `{other}`")),
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Register => "register",
            Self::Unregister => "unregister",
            Self::Toggle => "toggle",
            Self::EditConfig => "edit-config",
            Self::Quit => "quit",
        };
        f.write_str(name)
    }
}

/// Events delivered to the watch loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A watched document was written; it is now the current document
    Saved(PathBuf),
    Control(ControlCommand),
}
