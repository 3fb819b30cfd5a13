//! Command-line interface

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

/// Command-line arguments accepted by the `filtered-viewer` binary.
#[derive(Parser, Debug)]
#[command(
    name = "filtered-viewer",
    version,
    about = "Filter a document to HTML and open the result in the default viewer"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short,
        long,
        global = true,
        value_name = "NAME",
        env = "FILTERED_VIEWER_LANGUAGE",
        help = "Language of the document, matched against Language= before the extension"
    )]
    pub language: Option<String>,

    #[arg(
        short,
        long,
        global = true,
        value_name = "FILE",
        env = "FILTERED_VIEWER_CONFIG",
        help = "Config file to use instead of the one in the user config directory"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long = "no-keep-temp",
        global = true,
        action = ArgAction::SetTrue,
        overrides_with = "keep_temp",
        help = "Delete one-shot output a few seconds after the viewer is launched"
    )]
    pub no_keep_temp: bool,

    #[arg(
        long = "keep-temp",
        global = true,
        action = ArgAction::SetTrue,
        overrides_with = "no_keep_temp",
        help = "Leave filtered output in the temp area (default)"
    )]
    pub keep_temp: bool,

    #[arg(long, global = true, help = "Treat a non-zero filter exit status as a failure")]
    pub strict: bool,

    #[arg(short = 'v', long, global = true, help = "Debug logging (overrides LOG_LEVEL)")]
    pub debug: bool,

    #[arg(long, global = true, help = "Trace logging (overrides LOG_LEVEL and --debug)")]
    pub trace: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Filter a file once and open the result
    View {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Open the filter config file for editing, creating it on first run
    EditConfig,

    /// Filter on every save until quit; reads control commands from stdin
    Watch {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Show which config section a file resolves to
    Resolve {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(long, help = "Print the result as JSON")]
        json: bool,
    },

    /// Delete everything in the temp area
    Clean,
}
