//! Backend HTTP client.
//!
//! Endpoints consumed:
//! - `POST /api/v1/chat/`: streamed answer (see [`crate::stream`])
//! - `GET  /api/v1/projects/{id}/structure`: file/folder graph
//! - `GET  /api/v1/projects/`: connected repositories
//! - `POST /api/v1/projects/?repo_url=...`: connect a repository
//!
//! Authenticated calls carry `Authorization: Bearer <token>` from the current
//! [`Session`]. Calls that require a session fail fast with
//! [`ApiError::Unauthenticated`] without touching the network.

mod models;

pub use models::{ApiLink, ApiNode, ChatRequest, NodeKind, Project, StructureResponse};

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::ApiError;
use crate::session::Session;

const API_PREFIX: &str = "/api/v1";

/// Client for the repository-intelligence backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ApiClient {
    /// Create a client for `base_url` (e.g. `http://localhost:8000`).
    ///
    /// `timeout` bounds non-streaming requests only; the chat stream is never timed out.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = base_url.trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::InvalidBaseUrl(base_url.to_string()));
        }
        let http = reqwest::Client::builder()
            .user_agent(concat!("repolens/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ApiError::Transport {
                url: base_url.to_string(),
                source,
            })?;
        Ok(Self {
            http,
            base_url: base_url.to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path such as `/chat/`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    /// Issue the chat request and return the response once its headers are in.
    ///
    /// The body is left unread for the caller to consume incrementally. A session is
    /// optional here: its bearer token is attached when present.
    pub async fn open_chat(
        &self,
        request: &ChatRequest,
        session: Option<&Session>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.endpoint("/chat/");
        debug!(%url, project_id = %request.project_id, "opening chat stream");

        let mut builder = self.http.post(&url).json(request);
        if let Some(session) = session {
            builder = builder.header(AUTHORIZATION, bearer_header(session)?);
        }

        let resp = builder.send().await.map_err(|source| ApiError::Transport {
            url: url.clone(),
            source,
        })?;
        check_status(resp, &url)
    }

    /// Fetch the file/folder graph of a project.
    pub async fn fetch_structure(
        &self,
        project_id: &str,
        session: Option<&Session>,
    ) -> Result<StructureResponse, ApiError> {
        let session = session.ok_or(ApiError::Unauthenticated {
            operation: "fetch_structure",
        })?;
        let url = self.endpoint(&format!("/projects/{}/structure", project_id));
        self.get_json(&url, session).await
    }

    /// List the projects owned by the session's user.
    pub async fn list_projects(&self, session: Option<&Session>) -> Result<Vec<Project>, ApiError> {
        let session = session.ok_or(ApiError::Unauthenticated {
            operation: "list_projects",
        })?;
        let url = self.endpoint("/projects/");
        self.get_json(&url, session).await
    }

    /// Connect a repository by URL. The backend starts ingestion in the background.
    pub async fn create_project(
        &self,
        repo_url: &str,
        session: Option<&Session>,
    ) -> Result<Project, ApiError> {
        let session = session.ok_or(ApiError::Unauthenticated {
            operation: "create_project",
        })?;
        let url = self.endpoint("/projects/");
        let resp = self
            .http
            .post(&url)
            .query(&[("repo_url", repo_url)])
            .header(AUTHORIZATION, bearer_header(session)?)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.clone(),
                source,
            })?;
        let resp = check_status(resp, &url)?;
        decode_json(resp, &url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, session: &Session) -> Result<T, ApiError> {
        let resp = self
            .http
            .get(url)
            .header(AUTHORIZATION, bearer_header(session)?)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.to_string(),
                source,
            })?;
        let resp = check_status(resp, url)?;
        decode_json(resp, url).await
    }
}

fn bearer_header(session: &Session) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(&session.bearer()).map_err(|_| ApiError::Unauthenticated {
        operation: "authorization header (token contains invalid characters)",
    })
}

fn check_status(resp: reqwest::Response, url: &str) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(ApiError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

async fn decode_json<T: DeserializeOwned>(resp: reqwest::Response, url: &str) -> Result<T, ApiError> {
    resp.json::<T>().await.map_err(|source| ApiError::Decode {
        url: url.to_string(),
        source,
    })
}
