use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("file {0} not found")]
    ConfigMissing(String),
    #[error("malformed configuration: {0}")]
    ConfigMalformed(String),
    #[error("invalid command table: {0}")]
    InvalidDescriptor(String),
    #[error("remote registry rejected the request with status {status}: {body}")]
    RemoteRejected { status: u16, body: String },
    #[error("transport failure: {0}")]
    TransportFailure(String),
    #[error("skipped after an earlier transport failure")]
    Skipped,
    #[error("unexpected response from the remote registry: {0}")]
    UnexpectedResponse(String),
}

impl SyncError {
    /// Network level failures usually mean every following call fails too.
    pub fn is_transport(&self) -> bool {
        matches!(self, SyncError::TransportFailure(_))
    }
}
