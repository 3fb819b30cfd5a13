#![forbid(unsafe_code)]

mod actions;
mod cli;
mod config;
mod constants;
mod error;
mod event_handler;
mod filter;
mod host;
mod on_save;
mod report;
mod resolver;
mod viewer;

#[cfg(test)]
mod testing;

use anyhow::Result;
use clap::Parser;
use tracing::{Level as TraceLevel, info, warn};
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands};
use config::Settings;
use filter::{Filterer, TempArea};
use host::TerminalHost;
use on_save::OnSaveController;
use viewer::ViewerLauncher;

fn log_level(cli: &Cli) -> TraceLevel {
    if cli.trace {
        return TraceLevel::TRACE;
    }
    if cli.debug {
        return TraceLevel::DEBUG;
    }
    match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    }
}

/// Leftovers from earlier sessions; a failure here never blocks viewing
fn clean_temp(temp: &TempArea) {
    if let Err(e) = actions::clean(temp) {
        warn!(error = %format!("{e:#}"), "Could not clean temp area");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout is reserved for `resolve` output
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level(&cli))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let settings = Settings::from_cli(&cli);
    let temp = TempArea::system();
    let config_root = dirs::config_dir();

    match &cli.command {
        Commands::View { file } => {
            clean_temp(&temp);
            let documents = std::slice::from_ref(file);
            let mut host = TerminalHost::new(documents, settings.language.clone(), config_root)?;
            let filterer = Filterer::new(temp, settings.strict);
            actions::view(&mut host, &settings, &filterer, &ViewerLauncher::system())?;
        }
        Commands::EditConfig => {
            let mut host = TerminalHost::config_only(config_root);
            actions::edit_config(&mut host, &settings)?;
        }
        Commands::Watch { files } => {
            clean_temp(&temp);
            let mut host = TerminalHost::new(files, settings.language.clone(), config_root)?;
            let filterer = Filterer::new(temp, settings.strict);
            let mut controller =
                OnSaveController::new(settings.clone(), filterer, ViewerLauncher::system());
            actions::watch(&mut host, &mut controller, &settings)?;
        }
        Commands::Resolve { file, json } => {
            let documents = std::slice::from_ref(file);
            let host = TerminalHost::new(documents, settings.language.clone(), config_root)?;
            let report = actions::resolve(&host, &settings)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render());
            }
        }
        Commands::Clean => {
            let removed = actions::clean(&temp)?;
            info!(removed, "Done");
        }
    }

    Ok(())
}
