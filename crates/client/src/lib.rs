#![forbid(unsafe_code)]

//! HTTP client for the Cloud Manager Commerce command-execution API.

use async_trait::async_trait;
use cloudmanager_core::{
    ApiBinding, ApiError, CommandExecutionBody, CommerceApi, Connector, EnvironmentId, Error,
    ExecutionHandle, ExecutionId, ExecutionStatus, ProgramId,
};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

pub const HEADER_API_KEY: &str = "x-api-key";
pub const HEADER_ORG_ID: &str = "x-gw-ims-org-id";

/// Client bound to one org, credential set and endpoint.
#[derive(Debug, Clone)]
pub struct CloudManagerClient {
    http: Client,
    base: Url,
    binding: ApiBinding,
}

impl CloudManagerClient {
    pub fn new(binding: ApiBinding) -> Result<Self, Error> {
        Self::with_http(Client::new(), binding)
    }

    /// Fails with [`Error::Config`] unless `binding.base_url` parses as an
    /// absolute, hierarchical URL.
    pub fn with_http(http: Client, binding: ApiBinding) -> Result<Self, Error> {
        let base = Url::parse(binding.base_url.trim())
            .map_err(|e| Error::Config(format!("invalid base URL {:?}: {e}", binding.base_url)))?;
        if base.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "invalid base URL {:?}: not a hierarchical URL",
                binding.base_url
            )));
        }
        Ok(Self {
            http,
            base,
            binding,
        })
    }

    /// `.../runtime/commerce/cli[/{execution_id}]`, each id percent-encoded
    /// as a single path segment.
    fn cli_url(
        &self,
        program_id: &ProgramId,
        environment_id: &EnvironmentId,
        execution_id: Option<&ExecutionId>,
    ) -> Url {
        let mut url = self.base.clone();
        // with_http rejected cannot-be-a-base URLs
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend([
                "api",
                "program",
                program_id.as_str(),
                "environment",
                environment_id.as_str(),
                "runtime",
                "commerce",
                "cli",
            ]);
            if let Some(id) = execution_id {
                path.push(id.as_str());
            }
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.binding.access_token)
            .header(HEADER_API_KEY, &self.binding.client_id)
            .header(HEADER_ORG_ID, &self.binding.org_id)
            .header(reqwest::header::ACCEPT, "application/json")
    }
}

#[async_trait]
impl CommerceApi for CloudManagerClient {
    async fn post_command_execution(
        &self,
        program_id: &ProgramId,
        environment_id: &EnvironmentId,
        body: &CommandExecutionBody,
    ) -> Result<ExecutionHandle, ApiError> {
        let url = self.cli_url(program_id, environment_id, None);
        debug!(%url, command = %body.command, "POST command execution");
        let resp = self
            .request(Method::POST, url)
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        decode(resp).await
    }

    async fn get_command_execution(
        &self,
        program_id: &ProgramId,
        environment_id: &EnvironmentId,
        execution_id: &ExecutionId,
    ) -> Result<ExecutionStatus, ApiError> {
        let url = self.cli_url(program_id, environment_id, Some(execution_id));
        debug!(%url, "GET command execution");
        let resp = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(transport)?;
        decode(resp).await
    }
}

/// Builds [`CloudManagerClient`]s sharing one connection pool.
#[derive(Debug, Clone, Default)]
pub struct HttpConnector {
    http: Client,
}

impl HttpConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Connector for HttpConnector {
    type Api = CloudManagerClient;

    fn connect(&self, binding: ApiBinding) -> Result<CloudManagerClient, Error> {
        CloudManagerClient::with_http(self.http.clone(), binding)
    }
}

/// Error payload shapes Cloud Manager uses.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    #[serde(default)]
    message: Option<String>,
}

fn transport(e: reqwest::Error) -> ApiError {
    ApiError::Transport(e.to_string())
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let status = resp.status();
    let text = resp.text().await.map_err(transport)?;
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            message: error_message(&text, status.as_u16()),
        });
    }
    serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
}

fn error_message(text: &str, status: u16) -> String {
    let body: ErrorBody = serde_json::from_str(text).unwrap_or_default();
    let nested: Vec<String> = body.errors.into_iter().filter_map(|e| e.message).collect();
    body.message
        .or(body.title)
        .or_else(|| (!nested.is_empty()).then(|| nested.join("; ")))
        .or_else(|| {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| format!("HTTP {status}"))
}
