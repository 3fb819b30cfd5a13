//! Command-line editor host
//!
//! - documents come from the command line, the most recently saved one is current
//! - save events come from a debounced filesystem watcher on the documents' directories,
//!   reported only when a document's modification time or size changed (opening
//!   or reading a file also wakes the watcher, and filters read their input)
//! - control commands are read line by line from stdin on a background thread
//! - status text and messages go to stderr

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result, bail};
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebounceEventResult, DebouncedEventKind, Debouncer, new_debouncer};
use tracing::{debug, error, info, trace, warn};

use super::{ControlCommand, Document, EditorHost, HostEvent, MessageKind};
use crate::constants::watch::{DEBOUNCE_MS, POLL_MS};

/// Modification time and size of a document as last seen by the watcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

impl Fingerprint {
    fn of(path: &Path) -> Option<Self> {
        let metadata = fs::metadata(path).ok()?;
        Some(Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        })
    }
}

/// Turns raw watcher wakeups into saves
#[derive(Debug)]
struct SaveDetector {
    seen: HashMap<PathBuf, Fingerprint>,
}

impl SaveDetector {
    /// Start from the documents' current state, so only later writes count
    fn new(documents: impl IntoIterator<Item = PathBuf>) -> Self {
        let seen = documents
            .into_iter()
            .filter_map(|path| Fingerprint::of(&path).map(|fp| (path, fp)))
            .collect();
        Self { seen }
    }

    /// Whether `path` changed since the last call; a missing file is not a save
    fn changed(&mut self, path: &Path) -> bool {
        let Some(current) = Fingerprint::of(path) else {
            return false;
        };
        match self.seen.insert(path.to_path_buf(), current) {
            Some(previous) => previous != current,
            None => true,
        }
    }
}

pub struct TerminalHost {
    documents: Vec<PathBuf>,
    current: usize,
    language: Option<String>,
    config_root: Option<PathBuf>,
    events_tx: Sender<HostEvent>,
    events_rx: Receiver<HostEvent>,
    /// Dropping the debouncer stops the watcher
    watcher: Option<Debouncer<RecommendedWatcher>>,
    shutdown: Arc<AtomicBool>,
    /// Set once the control reader owns stdin; terminal editors can't share it
    stdin_taken: bool,
}

impl TerminalHost {
    /// Host for the given documents; the first one starts out current
    pub fn new(
        documents: &[PathBuf],
        language: Option<String>,
        config_root: Option<PathBuf>,
    ) -> Result<Self> {
        if documents.is_empty() {
            bail!("at least one document is required");
        }
        let documents = documents
            .iter()
            .map(|p| {
                p.canonicalize()
                    .with_context(|| format!("Document not found: {}", p.display()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::build(documents, language, config_root))
    }

    /// Host with no open document, for commands that only touch the config
    pub fn config_only(config_root: Option<PathBuf>) -> Self {
        Self::build(Vec::new(), None, config_root)
    }

    fn build(
        documents: Vec<PathBuf>,
        language: Option<String>,
        config_root: Option<PathBuf>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            documents,
            current: 0,
            language,
            config_root,
            events_tx,
            events_rx,
            watcher: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            stdin_taken: false,
        }
    }

    /// Read control commands from stdin on a background thread
    pub fn spawn_control_reader(&mut self) -> thread::JoinHandle<()> {
        self.stdin_taken = true;
        let sender = self.events_tx.clone();
        thread::spawn(move || {
            debug!("Control reader started");
            for line in io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        error!(error = %e, "Failed to read control command");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<ControlCommand>() {
                    Ok(command) => {
                        if sender.send(HostEvent::Control(command)).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(
                        input = %line.trim(),
                        "{e}; expected register, unregister, toggle, edit-config or quit"
                    ),
                }
            }
            debug!("Control reader finished");
        })
    }

    /// Stop the event loop on SIGINT/SIGTERM instead of dying mid-filter
    #[cfg(unix)]
    pub fn install_signal_handlers(&self) -> Result<()> {
        use signal_hook::consts::{SIGINT, SIGTERM};
        for signal in [SIGINT, SIGTERM] {
            signal_hook::flag::register(signal, Arc::clone(&self.shutdown))
                .context("Failed to register signal handler")?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    pub fn install_signal_handlers(&self) -> Result<()> {
        Ok(())
    }

    /// Block until the next event; `None` once shutdown was requested
    pub fn next_event(&mut self) -> Option<HostEvent> {
        while !self.shutdown.load(Ordering::SeqCst) {
            match self.events_rx.recv_timeout(Duration::from_millis(POLL_MS)) {
                Ok(event) => {
                    if let Some(event) = self.accept(event) {
                        return Some(event);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                // We hold a sender ourselves, so this only happens on teardown
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
        info!("Shutdown requested");
        None
    }

    /// Drop saves queued before notifications were switched off; a save makes its document current
    fn accept(&mut self, event: HostEvent) -> Option<HostEvent> {
        let path = match event {
            HostEvent::Saved(path) => path,
            other => return Some(other),
        };
        if self.watcher.is_none() {
            debug!(path = %path.display(), "Ignoring save, notifications are off");
            return None;
        }
        if let Some(index) = self.documents.iter().position(|d| *d == path) {
            self.current = index;
        }
        Some(HostEvent::Saved(path))
    }

    fn start_watching(&mut self) -> Result<()> {
        let documents: BTreeSet<PathBuf> = self.documents.iter().cloned().collect();
        let directories: BTreeSet<PathBuf> = documents
            .iter()
            .filter_map(|d| d.parent().map(Path::to_path_buf))
            .collect();
        let sender = self.events_tx.clone();
        let mut detector = SaveDetector::new(documents.iter().cloned());

        let mut debouncer = new_debouncer(
            Duration::from_millis(DEBOUNCE_MS),
            move |result: DebounceEventResult| {
                let events = match result {
                    Ok(events) => events,
                    Err(e) => {
                        error!(error = %e, "File watcher error");
                        return;
                    }
                };
                for event in events {
                    let is_document = documents.contains(&event.path);
                    if !matches!(event.kind, DebouncedEventKind::Any) || !is_document {
                        continue;
                    }
                    if detector.changed(&event.path) {
                        let _ = sender.send(HostEvent::Saved(event.path));
                    } else {
                        trace!(path = %event.path.display(), "Document touched but not modified");
                    }
                }
            },
        )
        .context("Failed to create file watcher")?;

        // Watch directories rather than files so editors that save by rename are still seen
        for dir in &directories {
            debouncer
                .watcher()
                .watch(dir, RecursiveMode::NonRecursive)
                .with_context(|| format!("Failed to watch {}", dir.display()))?;
            debug!(dir = %dir.display(), "Watching for saves");
        }

        self.watcher = Some(debouncer);
        Ok(())
    }
}

impl EditorHost for TerminalHost {
    fn current_document(&self) -> Document {
        let path = self.documents.get(self.current).cloned().unwrap_or_default();
        Document::new(path, self.language.clone())
    }

    fn plugin_config_dir(&self) -> Option<PathBuf> {
        self.config_root.clone()
    }

    /// `$VISUAL` or `$EDITOR` when set and stdin is free, otherwise the OS association
    fn open_in_editor(&mut self, path: &Path) -> Result<()> {
        let editor = std::env::var("VISUAL")
            .or_else(|_| std::env::var("EDITOR"))
            .ok()
            .filter(|e| !e.trim().is_empty() && !self.stdin_taken);

        match editor {
            Some(editor) => {
                let mut parts = editor.split_whitespace();
                let program = parts.next().unwrap_or_default();
                info!(editor = %editor, path = %path.display(), "Opening in editor");
                let status = Command::new(program)
                    .args(parts)
                    .arg(path)
                    .status()
                    .with_context(|| format!("Failed to start editor `{editor}`"))?;
                if !status.success() {
                    warn!(editor = %editor, status = %status, "Editor exited with failure");
                }
                Ok(())
            }
            None => open::that(path).with_context(|| format!("Failed to open {}", path.display())),
        }
    }

    fn set_status(&mut self, text: &str) {
        debug!(status = %text, "Status updated");
        eprintln!("[{}]", text.trim());
    }

    fn show_message(&mut self, title: &str, message: &str, kind: MessageKind) {
        let marker = match kind {
            MessageKind::Warning => "warning",
            MessageKind::Error => "error",
        };
        eprintln!("\n\n{title} ({marker})\n{}\n\n{message}\n", "-".repeat(40));
    }

    fn set_save_notifications(&mut self, enabled: bool) -> Result<()> {
        match (enabled, self.watcher.is_some()) {
            (true, false) => self.start_watching(),
            (false, true) => {
                self.watcher = None;
                debug!("Stopped watching for saves");
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    /// Like `next_event`, but gives up after `timeout`
    fn wait_for_event(host: &mut TerminalHost, timeout: Duration) -> Option<HostEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            let event = host.events_rx.recv_timeout(remaining).ok()?;
            if let Some(event) = host.accept(event) {
                return Some(event);
            }
        }
    }

    fn saves_within(host: &mut TerminalHost, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut saves = 0;
        while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
            match wait_for_event(host, remaining) {
                Some(HostEvent::Saved(_)) => saves += 1,
                Some(_) => {}
                None => break,
            }
        }
        saves
    }

    #[test]
    fn test_requires_a_document() {
        assert!(TerminalHost::new(&[], None, None).is_err());
    }

    #[test]
    fn test_config_only_host_has_empty_document() {
        let host = TerminalHost::config_only(None);
        assert_eq!(host.current_document().path, PathBuf::new());
        assert!(host.plugin_config_dir().is_none());
    }

    #[test]
    fn test_missing_document_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = TerminalHost::new(&[dir.path().join("nope.md")], None, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_first_document_is_current() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.md");
        let b = dir.path().join("b.md");
        std::fs::write(&a, "").unwrap();
        std::fs::write(&b, "").unwrap();

        let host = TerminalHost::new(&[a.clone(), b], Some("Markdown".into()), Some(dir.path().into())).unwrap();
        let document = host.current_document();
        assert_eq!(document.path, a.canonicalize().unwrap());
        assert_eq!(document.language.as_deref(), Some("Markdown"));
        assert_eq!(host.plugin_config_dir().as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_saved_event_switches_current_document() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.md");
        let b = dir.path().join("b.md");
        std::fs::write(&a, "").unwrap();
        std::fs::write(&b, "").unwrap();

        let mut host = TerminalHost::new(&[a, b.clone()], None, None).unwrap();
        host.set_save_notifications(true).unwrap();
        let b = b.canonicalize().unwrap();
        host.events_tx.send(HostEvent::Saved(b.clone())).unwrap();

        assert_eq!(host.next_event(), Some(HostEvent::Saved(b.clone())));
        assert_eq!(host.current_document().path, b);
    }

    #[test]
    fn test_saves_dropped_while_notifications_off() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.md");
        std::fs::write(&a, "").unwrap();

        let mut host = TerminalHost::new(&[a.clone()], None, None).unwrap();
        host.events_tx.send(HostEvent::Saved(a.canonicalize().unwrap())).unwrap();
        host.events_tx.send(HostEvent::Control(ControlCommand::Quit)).unwrap();

        assert_eq!(host.next_event(), Some(HostEvent::Control(ControlCommand::Quit)));
    }

    #[test]
    fn test_shutdown_flag_ends_event_stream() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.md");
        std::fs::write(&a, "").unwrap();

        let mut host = TerminalHost::new(&[a], None, None).unwrap();
        host.shutdown.store(true, Ordering::SeqCst);
        assert_eq!(host.next_event(), None);
    }

    #[test]
    fn test_save_detector_ignores_untouched_documents() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.md");
        fs::write(&a, "first").unwrap();

        let mut detector = SaveDetector::new([a.clone()]);
        assert!(!detector.changed(&a));

        fs::write(&a, "second, longer").unwrap();
        assert!(detector.changed(&a));
        assert!(!detector.changed(&a));
    }

    #[test]
    fn test_save_detector_skips_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("gone.md");
        let mut detector = SaveDetector::new([gone.clone()]);
        assert!(!detector.changed(&gone));
    }

    #[cfg(unix)]
    #[test]
    fn test_watcher_reports_one_save_per_write() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.md");
        fs::write(&a, "").unwrap();

        let mut host = TerminalHost::new(&[a.clone()], None, None).unwrap();
        host.set_save_notifications(true).unwrap();
        fs::write(&a, "saved").unwrap();

        let event = wait_for_event(&mut host, Duration::from_secs(5));
        assert_eq!(event, Some(HostEvent::Saved(a.canonicalize().unwrap())));
        assert_eq!(saves_within(&mut host, Duration::from_secs(1)), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_watcher_ignores_reads() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.md");
        fs::write(&a, "content").unwrap();

        let mut host = TerminalHost::new(&[a.clone()], None, None).unwrap();
        host.set_save_notifications(true).unwrap();
        assert_eq!(fs::read_to_string(&a).unwrap(), "content");

        assert_eq!(saves_within(&mut host, Duration::from_secs(1)), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_filter_reading_document_does_not_refilter() {
        use crate::config::Settings;
        use crate::event_handler::handle_event;
        use crate::filter::{Filterer, TempArea};
        use crate::on_save::OnSaveController;
        use crate::testing::RecordingOpener;
        use crate::viewer::ViewerLauncher;

        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("fv.ini");
        fs::write(&config, "[Md]\nLanguage=Markdown\nExtension=.md\nCommand=cat \"%1\"\n").unwrap();
        let a = dir.path().join("a.md");
        fs::write(&a, "").unwrap();

        let settings = Settings {
            config_override: Some(config),
            ..Settings::default()
        };
        let mut controller = OnSaveController::new(
            settings.clone(),
            Filterer::new(TempArea::at(dir.path().join("out")), false).with_working_dir(dir.path()),
            ViewerLauncher::with_opener(RecordingOpener::default()),
        );
        let mut host = TerminalHost::new(&[a.clone()], None, None).unwrap();
        controller.register(&mut host).unwrap();
        assert!(controller.is_active());

        fs::write(&a, "one save").unwrap();

        // Each save runs `cat` over the document; those reads must not come back as saves
        let deadline = Instant::now() + Duration::from_secs(3);
        let mut saves = 0;
        while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
            let Some(event) = wait_for_event(&mut host, remaining) else {
                break;
            };
            if matches!(event, HostEvent::Saved(_)) {
                saves += 1;
            }
            handle_event(&mut controller, &mut host, &settings, event).unwrap();
        }
        assert_eq!(saves, 1);
    }
}
