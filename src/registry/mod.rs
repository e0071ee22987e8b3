use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{command::CommandDescriptor, error::SyncError};

pub mod http;
#[cfg(test)]
pub mod memory;

pub use self::http::HttpRegistry;

/// A command as stored by the remote registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredCommand {
    /// Server-assigned identifier, needed to delete the command.
    pub id: String,
    #[serde(flatten)]
    pub descriptor: CommandDescriptor,
}

/// The remote command registry of one application.
/// Every method maps to exactly one remote call.
#[async_trait]
pub trait Registry {
    /// Atomically replaces every registered command; returns the new snapshot.
    async fn overwrite(
        &self,
        commands: &[CommandDescriptor],
    ) -> Result<Vec<RegisteredCommand>, SyncError>;

    /// Creates the command, or overwrites the one with the same name.
    async fn upsert(&self, command: &CommandDescriptor) -> Result<RegisteredCommand, SyncError>;

    async fn delete(&self, id: &str) -> Result<(), SyncError>;

    async fn list(&self) -> Result<Vec<RegisteredCommand>, SyncError>;
}
