//! Test doubles for the host and the viewer

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Result;

use crate::host::{Document, EditorHost, MessageKind};
use crate::viewer::Opener;

/// Records every path it is asked to open; clones share the record
#[derive(Debug, Clone, Default)]
pub struct RecordingOpener {
    opened: Rc<RefCell<Vec<PathBuf>>>,
}

impl RecordingOpener {
    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.borrow().clone()
    }
}

impl Opener for RecordingOpener {
    fn open(&self, path: &Path) -> Result<()> {
        self.opened.borrow_mut().push(path.to_path_buf());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShownMessage {
    pub title: String,
    pub message: String,
    pub kind: MessageKind,
}

/// In-memory editor host
#[derive(Debug)]
pub struct RecordingHost {
    pub document: Document,
    pub config_root: Option<PathBuf>,
    pub statuses: Vec<String>,
    pub messages: Vec<ShownMessage>,
    pub edited: Vec<PathBuf>,
    pub notifications: bool,
}

impl RecordingHost {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            config_root: None,
            statuses: Vec::new(),
            messages: Vec::new(),
            edited: Vec::new(),
            notifications: false,
        }
    }

    pub fn last_status(&self) -> Option<&str> {
        self.statuses.last().map(String::as_str)
    }
}

impl EditorHost for RecordingHost {
    fn current_document(&self) -> Document {
        self.document.clone()
    }

    fn plugin_config_dir(&self) -> Option<PathBuf> {
        self.config_root.clone()
    }

    fn open_in_editor(&mut self, path: &Path) -> Result<()> {
        self.edited.push(path.to_path_buf());
        Ok(())
    }

    fn set_status(&mut self, text: &str) {
        self.statuses.push(text.to_string());
    }

    fn show_message(&mut self, title: &str, message: &str, kind: MessageKind) {
        self.messages.push(ShownMessage {
            title: title.to_string(),
            message: message.to_string(),
            kind,
        });
    }

    fn set_save_notifications(&mut self, enabled: bool) -> Result<()> {
        self.notifications = enabled;
        Ok(())
    }
}
