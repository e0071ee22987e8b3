use std::future::Future;

use log::{error, info, warn};

use crate::{
    cfg::TransportPolicy,
    command::{validate_batch, CommandDescriptor},
    error::SyncError,
    registry::{RegisteredCommand, Registry},
};

pub mod pacing;

use self::pacing::Pacer;

/// Result of the remote call made for one item of a batch.
#[derive(Debug)]
pub struct Entry<T> {
    /// Command name, command id, or a description of the bulk call.
    pub target: String,
    pub result: Result<T, SyncError>,
}

/// Every outcome of a batch, in the order the items were given.
#[derive(Debug)]
pub struct SyncReport<T> {
    pub entries: Vec<Entry<T>>,
}

impl<T> SyncReport<T> {
    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.result.is_ok()).count()
    }

    pub fn skipped(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.result, Err(SyncError::Skipped)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.succeeded() - self.skipped()
    }

    pub fn is_success(&self) -> bool {
        self.succeeded() == self.entries.len()
    }

    /// 0 when every call went through, 2 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            2
        }
    }

    /// Targets whose call failed or never happened.
    pub fn unsuccessful(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.result.is_err())
            .map(|e| e.target.as_str())
            .collect()
    }

    pub fn log_summary(&self, operation: &str) {
        let message = format!(
            "{}: {} succeeded, {} failed, {} skipped",
            operation,
            self.succeeded(),
            self.failed(),
            self.skipped()
        );

        if self.is_success() {
            info!("{}", message);
        } else {
            warn!("{} ({})", message, self.unsuccessful().join(", "));
        }
    }
}

/// Pushes local command tables to a remote registry, one call at a time.
/// Holds no state between operations besides the pacer's clock.
pub struct Synchronizer<R, P> {
    registry: R,
    pacer: P,
    policy: TransportPolicy,
}

impl<R: Registry, P: Pacer> Synchronizer<R, P> {
    pub fn new(registry: R, pacer: P, policy: TransportPolicy) -> Self {
        Self {
            registry,
            pacer,
            policy,
        }
    }

    #[cfg(test)]
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Runs `call` for each item in order, paced, continuing past failures.
    /// Under `TransportPolicy::Abort` a transport failure skips the rest.
    async fn each<'a, I, U, F, Fut>(
        &'a self,
        items: &'a [I],
        label: fn(&I) -> String,
        call: F,
    ) -> SyncReport<U>
    where
        F: Fn(&'a I) -> Fut,
        Fut: Future<Output = Result<U, SyncError>>,
    {
        let mut entries = Vec::with_capacity(items.len());
        let mut aborted = false;

        for item in items {
            let target = label(item);

            if aborted {
                warn!("{}: skipped", target);
                entries.push(Entry {
                    target,
                    result: Err(SyncError::Skipped),
                });
                continue;
            }

            self.pacer.ready().await;
            let result = call(item).await;

            match &result {
                Ok(_) => info!("{}: ok", target),
                Err(err) => {
                    error!("{}: {}", target, err);
                    if err.is_transport() && self.policy == TransportPolicy::Abort {
                        error!("aborting the batch after a transport failure");
                        aborted = true;
                    }
                }
            }

            entries.push(Entry { target, result });
        }

        SyncReport { entries }
    }

    /// Replaces every registered command with `commands` in a single call.
    /// An empty table clears the registry.
    pub async fn bulk_replace(
        &self,
        commands: &[CommandDescriptor],
    ) -> Result<SyncReport<Vec<RegisteredCommand>>, SyncError> {
        validate_batch(commands)?;

        let batch = [commands];
        let report = self
            .each(
                &batch,
                |commands| format!("overwrite ({} commands)", commands.len()),
                |commands| self.registry.overwrite(commands),
            )
            .await;

        Ok(report)
    }

    /// Creates or updates each command with its own call.
    pub async fn upsert_all(
        &self,
        commands: &[CommandDescriptor],
    ) -> Result<SyncReport<RegisteredCommand>, SyncError> {
        validate_batch(commands)?;

        Ok(self
            .each(
                commands,
                |command| format!("upsert {}", command.name),
                |command| self.registry.upsert(command),
            )
            .await)
    }

    /// Deletes each command by its server-assigned identifier.
    pub async fn delete_all(&self, ids: &[String]) -> SyncReport<()> {
        self.each(
            ids,
            |id| format!("delete {}", id),
            |id| self.registry.delete(id),
        )
        .await
    }

    pub async fn list(&self) -> Result<Vec<RegisteredCommand>, SyncError> {
        self.pacer.ready().await;
        self.registry.list().await
    }
}
