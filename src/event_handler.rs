use anyhow::Result;
use tracing::{debug, info};

use crate::actions;
use crate::config::Settings;
use crate::host::{ControlCommand, EditorHost, HostEvent};
use crate::on_save::OnSaveController;

/// Whether the watch loop keeps running after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub fn handle_event(
    controller: &mut OnSaveController,
    host: &mut dyn EditorHost,
    settings: &Settings,
    event: HostEvent,
) -> Result<Flow> {
    match event {
        HostEvent::Saved(path) => {
            debug!(path = %path.display(), "Save event");
            controller.on_save(host)?;
        }
        HostEvent::Control(command) => {
            info!(command = %command, "Control command");
            match command {
                ControlCommand::Register if controller.is_active() => {
                    info!("Filter on save is already registered");
                }
                ControlCommand::Register => controller.register(host)?,
                ControlCommand::Unregister => controller.unregister(host)?,
                ControlCommand::Toggle => controller.toggle(host)?,
                ControlCommand::EditConfig => {
                    actions::edit_config(host, settings)?;
                }
                ControlCommand::Quit => return Ok(Flow::Quit),
            }
        }
    }
    Ok(Flow::Continue)
}
