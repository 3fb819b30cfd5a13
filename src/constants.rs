//! Names, file layout and timings shared by the filter flow
//!
//! Most of these are fixed by the config file format and the temp file naming
//! that viewers and older filter setups already rely on.

/// Config file location and bootstrap constants
pub mod config {
    /// Subdirectory of the plugin config root owned by this tool
    pub const APP_DIR: &str = "filtered-viewer";

    /// Config file name inside APP_DIR
    pub const FILENAME: &str = "filtered-viewer.ini";

    /// Legacy PreviewHTML plugin directory (sibling of APP_DIR)
    pub const LEGACY_DIR: &str = "PreviewHTML";

    /// Legacy PreviewHTML filter file, copied in on first run
    pub const LEGACY_FILENAME: &str = "Filters.ini";

    /// Section whose keys are inherited by every other section
    pub const DEFAULT_SECTION: &str = "DEFAULT";
}

/// Keys recognised inside a config section (always lowercase)
pub mod keys {
    pub const LANGUAGE: &str = "language";
    pub const EXTENSION: &str = "extension";
    pub const COMMAND: &str = "command";
}

/// Filter command and temp file constants
pub mod filter {
    /// Placeholder replaced by the source path in a command template
    pub const SOURCE_PLACEHOLDER: &str = "%1";

    /// Temp subdirectory under the system temp dir
    pub const TEMP_DIR: &str = "filtered-viewer";

    /// Suffix appended to every filtered output file
    pub const OUTPUT_SUFFIX: &str = "FILTERED.html";

    /// Checksum reserved for generated diagnostic pages
    pub const MESSAGE_PAGE_CHECKSUM: u32 = 0xFFFF_FFFF;

    /// Example filter shown in diagnostics
    #[cfg(windows)]
    pub const EXAMPLE_FILTER: &str = r"c:\some\path\to\filter";
    #[cfg(not(windows))]
    pub const EXAMPLE_FILTER: &str = "/some/path/to/filter";

    /// Delay before deleting a one-shot temp file (viewer needs time to load it)
    pub const DELETE_DELAY_SECS: u64 = 3;
}

/// Editor host conventions
pub mod host {
    /// User-defined languages are reported as "udf - <Name>"
    pub const UDL_PREFIX: &str = "udf";

    /// Separator between the UDL prefix and the real language name
    pub const UDL_SEPARATOR: &str = " - ";

    /// Language description used when the host knows no language
    pub const PLAIN_TEXT_DESC: &str = "Normal text file";

    /// Status bar marker shown while filter-on-save is active
    pub const FILTER_ON_SAVE_MARKER: &str = "\u{00A0}⇉📺⇉\u{00A0}";
}

/// Watch mode constants
pub mod watch {
    /// Debounce interval to coalesce the burst of writes an editor makes per save
    pub const DEBOUNCE_MS: u64 = 200;

    /// Poll interval for the event loop so shutdown signals are noticed
    pub const POLL_MS: u64 = 100;
}
