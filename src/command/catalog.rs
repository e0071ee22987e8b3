use std::path::Path;

use config::{Config, File};
use log::debug;
use serde::Deserialize;

use super::{CommandDescriptor, OptionDescriptor, OptionKind};
use crate::error::SyncError;

/// The commands of the game bot, in registration order.
pub fn builtin() -> Vec<CommandDescriptor> {
    vec![
        CommandDescriptor::chat_input("create", "Creates a new game")
            .option(
                OptionDescriptor::new("language", "The game language", OptionKind::String)
                    .required(true)
                    .choice("Toki Pona", "toki_pona")
                    .choice("English", "english"),
            )
            .option(
                OptionDescriptor::new("speed", "The game speed", OptionKind::String)
                    .choice("Fast", "fast")
                    .choice("Normal", "normal")
                    .choice("Manual", "manual"),
            ),
        CommandDescriptor::chat_input("join", "Join a lobby"),
        CommandDescriptor::chat_input("leave", "Leave a lobby"),
        CommandDescriptor::chat_input("party", "View the current party"),
        CommandDescriptor::chat_input("roles", "Lists all roles"),
        CommandDescriptor::chat_input("continue", "Instantly completes the current wait"),
        CommandDescriptor::chat_input("role", "Gets information about a role").option(
            OptionDescriptor::new("role", "The role whose information to get", OptionKind::String)
                .required(true),
        ),
        CommandDescriptor::chat_input("remove", "Removes a user from the party").option(
            OptionDescriptor::new("user", "The user to remove from the party", OptionKind::User)
                .required(true),
        ),
        CommandDescriptor::chat_input("promote", "Promotes a user to party leader").option(
            OptionDescriptor::new("user", "The user to promote to party leader", OptionKind::User)
                .required(true),
        ),
    ]
}

#[derive(Deserialize)]
struct Table {
    #[serde(default)]
    commands: Vec<CommandDescriptor>,
}

/// Reads a `[[commands]]` table from a toml or json file.
pub fn load_table(path: &Path) -> Result<Vec<CommandDescriptor>, SyncError> {
    if !path.exists() {
        return Err(SyncError::ConfigMissing(path.display().to_string()));
    }

    let table: Table = Config::builder()
        .add_source(File::from(path))
        .build()
        .and_then(|settings| settings.try_deserialize())
        .map_err(|err| SyncError::ConfigMalformed(format!("{}: {}", path.display(), err)))?;

    debug!("loaded {} commands from {}", table.commands.len(), path.display());
    Ok(table.commands)
}
