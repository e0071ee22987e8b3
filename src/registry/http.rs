use std::{error::Error as StdError, sync::Arc, time::Duration};

use async_trait::async_trait;
use log::{debug, trace};
use reqwest::{header::AUTHORIZATION, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::{RegisteredCommand, Registry};
use crate::{cfg::Credentials, command::CommandDescriptor, error::SyncError};

static USER_AGENT: &str = concat!(
    "DiscordBot (",
    env!("CARGO_PKG_NAME"),
    ", ",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// Registry reached through the platform's REST api.
pub struct HttpRegistry {
    client: Client,
    credentials: Arc<Credentials>,
    api_base: String,
}

/// Keeps the whole source chain, reqwest hides the interesting part in it.
fn transport_failure(err: reqwest::Error) -> SyncError {
    let mut message = err.to_string();
    let mut source = err.source();

    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }

    SyncError::TransportFailure(message)
}

impl HttpRegistry {
    /// `timeout` bounds every call, a stalled remote becomes a transport failure.
    pub fn new(
        credentials: Arc<Credentials>,
        api_base: &str,
        timeout: Duration,
    ) -> Result<Self, SyncError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(transport_failure)?;

        Ok(Self {
            client,
            credentials,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn commands_url(&self) -> String {
        format!(
            "{}/applications/{}/commands",
            self.api_base, self.credentials.application_id
        )
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        trace!("{} request to url {}", method, url);

        self.client
            .request(method, url)
            .header(AUTHORIZATION, format!("Bot {}", self.credentials.token))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, SyncError> {
        let response = request.send().await.map_err(transport_failure)?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!("remote registry answered {}: {}", status, body);

        Err(SyncError::RemoteRejected {
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, SyncError> {
        let bytes = response.bytes().await.map_err(transport_failure)?;

        serde_json::from_slice(&bytes).map_err(|err| SyncError::UnexpectedResponse(err.to_string()))
    }
}

#[async_trait]
impl Registry for HttpRegistry {
    async fn overwrite(
        &self,
        commands: &[CommandDescriptor],
    ) -> Result<Vec<RegisteredCommand>, SyncError> {
        let request = self.request(Method::PUT, self.commands_url()).json(commands);
        let response = self.send(request).await?;

        Self::decode(response).await
    }

    async fn upsert(&self, command: &CommandDescriptor) -> Result<RegisteredCommand, SyncError> {
        let request = self.request(Method::POST, self.commands_url()).json(command);
        let response = self.send(request).await?;

        Self::decode(response).await
    }

    async fn delete(&self, id: &str) -> Result<(), SyncError> {
        let url = format!("{}/{}", self.commands_url(), id);
        self.send(self.request(Method::DELETE, url)).await?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<RegisteredCommand>, SyncError> {
        let response = self
            .send(self.request(Method::GET, self.commands_url()))
            .await?;

        Self::decode(response).await
    }
}
