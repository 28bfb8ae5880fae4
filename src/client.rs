//! HTTP implementation of [`BugGateway`], speaking to the server in
//! [`crate::server`].

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::config::DEFAULT_API_ENDPOINT;
use crate::error::{BugError, Result};
use crate::gateway::BugGateway;
use crate::models::{
    BugReport, CreateBugRequest, Metadata, Priority, Status, UpdatePriorityRequest,
    UpdateStatusRequest,
};

/// Which kind of store failure a non-2xx, non-4xx answer maps to.
#[derive(Clone, Copy)]
enum Op {
    Read,
    Write,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    endpoint: String,
}

impl HttpGateway {
    /// `endpoint` is the collection URL, e.g. `http://localhost:8080/api/bugs`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        let endpoint = endpoint.trim_end_matches('/').to_string();
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn bug_url(&self, id: i64) -> String {
        format!("{}/{}", self.endpoint, id)
    }

    async fn decode<T: DeserializeOwned>(response: Response, id: Option<i64>, op: Op) -> Result<T> {
        let response = Self::check(response, id, op).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| BugError::Transport(format!("invalid response body: {}", e)))
    }

    async fn check(response: Response, id: Option<i64>, op: Op) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };
        debug!(%status, %message, "request rejected");

        Err(match (status, id) {
            (StatusCode::NOT_FOUND, Some(id)) => BugError::NotFound { id },
            (StatusCode::BAD_REQUEST, _) => BugError::Validation {
                field: "request",
                message,
            },
            (s, _) if s.is_server_error() => match op {
                Op::Read => BugError::Retrieval(message),
                Op::Write => BugError::Persistence(message),
            },
            _ => BugError::Transport(format!("{}: {}", status, message)),
        })
    }
}

impl Default for HttpGateway {
    fn default() -> Self {
        Self::new(DEFAULT_API_ENDPOINT)
    }
}

fn transport(err: reqwest::Error) -> BugError {
    BugError::Transport(err.to_string())
}

#[async_trait]
impl BugGateway for HttpGateway {
    async fn create(&self, request: CreateBugRequest) -> Result<BugReport> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(transport)?;
        Self::decode(response, None, Op::Write).await
    }

    async fn list(&self) -> Result<Vec<BugReport>> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(transport)?;
        Self::decode(response, None, Op::Read).await
    }

    async fn get(&self, id: i64) -> Result<BugReport> {
        let response = self
            .client
            .get(self.bug_url(id))
            .send()
            .await
            .map_err(transport)?;
        Self::decode(response, Some(id), Op::Read).await
    }

    async fn update_status(&self, id: i64, status: Status) -> Result<BugReport> {
        let response = self
            .client
            .put(format!("{}/status", self.bug_url(id)))
            .json(&UpdateStatusRequest { status })
            .send()
            .await
            .map_err(transport)?;
        Self::decode(response, Some(id), Op::Write).await
    }

    async fn update_priority(&self, id: i64, priority: Priority) -> Result<BugReport> {
        let response = self
            .client
            .put(format!("{}/priority", self.bug_url(id)))
            .json(&UpdatePriorityRequest { priority })
            .send()
            .await
            .map_err(transport)?;
        Self::decode(response, Some(id), Op::Write).await
    }

    async fn update_metadata(&self, id: i64, metadata: Metadata) -> Result<BugReport> {
        let response = self
            .client
            .put(format!("{}/metadata", self.bug_url(id)))
            .json(&metadata)
            .send()
            .await
            .map_err(transport)?;
        Self::decode(response, Some(id), Op::Write).await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let response = self
            .client
            .delete(self.bug_url(id))
            .send()
            .await
            .map_err(transport)?;
        Self::check(response, Some(id), Op::Write).await?;
        Ok(())
    }
}
