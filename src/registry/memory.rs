use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{RegisteredCommand, Registry};
use crate::{command::CommandDescriptor, error::SyncError};

#[derive(Default)]
struct State {
    commands: Vec<RegisteredCommand>,
    next_id: u64,
    calls: Vec<Instant>,
    failures: Vec<(String, SyncError)>,
}

/// Registry kept in memory, behaving like the remote one.
/// Names listed with `fail_on` make the matching call fail once.
#[derive(Default)]
pub struct MemoryRegistry {
    state: Mutex<State>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next call targeting `target` (a command name or id) fail with `error`.
    pub fn fail_on(&self, target: &str, error: SyncError) {
        let mut state = self.state.lock().unwrap();
        state.failures.push((target.to_string(), error));
    }

    pub fn snapshot(&self) -> Vec<RegisteredCommand> {
        self.state.lock().unwrap().commands.clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.snapshot()
            .into_iter()
            .map(|c| c.descriptor.name)
            .collect()
    }

    /// Start time of every call received so far.
    pub fn calls(&self) -> Vec<Instant> {
        self.state.lock().unwrap().calls.clone()
    }

    fn begin(state: &mut State, target: &str) -> Result<(), SyncError> {
        state.calls.push(Instant::now());

        match state.failures.iter().position(|(t, _)| t == target) {
            Some(i) => Err(state.failures.remove(i).1),
            None => Ok(()),
        }
    }

    fn assign(state: &mut State, descriptor: CommandDescriptor) -> RegisteredCommand {
        state.next_id += 1;
        RegisteredCommand {
            id: state.next_id.to_string(),
            descriptor,
        }
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn overwrite(
        &self,
        commands: &[CommandDescriptor],
    ) -> Result<Vec<RegisteredCommand>, SyncError> {
        let mut state = self.state.lock().unwrap();
        Self::begin(&mut state, "*")?;

        let mut registered = Vec::with_capacity(commands.len());
        for command in commands {
            // commands keeping their name keep their id
            let existing = state
                .commands
                .iter()
                .find(|c| c.descriptor.name == command.name)
                .map(|c| c.id.clone());

            registered.push(match existing {
                Some(id) => RegisteredCommand {
                    id,
                    descriptor: command.clone(),
                },
                None => Self::assign(&mut state, command.clone()),
            });
        }

        state.commands = registered.clone();
        Ok(registered)
    }

    async fn upsert(&self, command: &CommandDescriptor) -> Result<RegisteredCommand, SyncError> {
        let mut state = self.state.lock().unwrap();
        Self::begin(&mut state, &command.name)?;

        if let Some(existing) = state
            .commands
            .iter_mut()
            .find(|c| c.descriptor.name == command.name)
        {
            existing.descriptor = command.clone();
            return Ok(existing.clone());
        }

        let registered = Self::assign(&mut state, command.clone());
        state.commands.push(registered.clone());
        Ok(registered)
    }

    async fn delete(&self, id: &str) -> Result<(), SyncError> {
        let mut state = self.state.lock().unwrap();
        Self::begin(&mut state, id)?;

        match state.commands.iter().position(|c| c.id == id) {
            Some(i) => {
                state.commands.remove(i);
                Ok(())
            }
            None => Err(SyncError::RemoteRejected {
                status: 404,
                body: r#"{"message": "Unknown application command", "code": 10063}"#.to_string(),
            }),
        }
    }

    async fn list(&self) -> Result<Vec<RegisteredCommand>, SyncError> {
        let mut state = self.state.lock().unwrap();
        Self::begin(&mut state, "*")?;

        Ok(state.commands.clone())
    }
}
