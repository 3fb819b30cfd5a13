//! Runtime switches for one session
//!
//! Replaces the debug/trace/keep-temp globals of a plugin script: everything
//! that changes behaviour at runtime is carried in one value and passed down.

use std::path::PathBuf;

use crate::cli::Cli;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Leave one-shot output in the temp area instead of deleting it after launch
    pub keep_temp: bool,
    /// Treat a non-zero filter exit status as a failure
    pub strict: bool,
    /// Config file to use instead of the bootstrapped one
    pub config_override: Option<PathBuf>,
    /// Language name reported for documents given on the command line
    pub language: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            keep_temp: true,
            strict: false,
            config_override: None,
            language: None,
        }
    }
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            keep_temp: !cli.no_keep_temp,
            strict: cli.strict,
            config_override: cli.config.clone(),
            language: cli.language.clone(),
        }
    }
}
