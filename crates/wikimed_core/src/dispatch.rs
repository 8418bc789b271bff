//! Request dispatch to the WikiMed endpoint.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tracing::{debug, error};

use crate::normalize::{looks_like_xml, to_pretty, xml_to_json};
use crate::operation::{Arguments, CREDENTIAL_FIELD, OperationRequest, OperationSpec};
use crate::registry::ClientRegistry;
use crate::{CoreError, Result};

/// Upper bound on a single upstream round trip.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Successful upstream answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedResponse {
    /// XML body converted to indented JSON text
    Json(String),
    /// Non-XML body, returned verbatim
    Text(String),
}

impl NormalizedResponse {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Json(s) | Self::Text(s) => s,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            Self::Json(s) | Self::Text(s) => s,
        }
    }
}

impl fmt::Display for NormalizedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Funnels every operation into one GET against the caller's endpoint.
///
/// The dispatcher knows nothing about individual operations; their identity
/// lives entirely in the request fields (notably `MType`).
#[derive(Debug, Clone)]
pub struct Dispatcher {
    http: reqwest::Client,
    registry: Arc<ClientRegistry>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(registry: Arc<ClientRegistry>) -> Result<Self> {
        Self::with_timeout(registry, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(registry: Arc<ClientRegistry>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("wikimed-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|cause| CoreError::HttpClientInit { cause })?;

        Ok(Self {
            http,
            registry,
            timeout,
        })
    }

    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Validate `args` against `spec`, then dispatch.
    ///
    /// Validation failures return before any network activity.
    pub async fn invoke(
        &self,
        spec: &OperationSpec,
        args: &Arguments,
        client_id: &str,
    ) -> Result<NormalizedResponse> {
        let request = spec.build_request(args)?;
        self.dispatch(&request, client_id).await
    }

    /// Send `request` for `client_id` and normalize the answer.
    pub async fn dispatch(
        &self,
        request: &OperationRequest,
        client_id: &str,
    ) -> Result<NormalizedResponse> {
        let config = self.registry.resolve(client_id);

        let mut query = request.fields().clone();
        query
            .entry(CREDENTIAL_FIELD.to_string())
            .or_insert_with(|| config.credential_code.clone());

        let url = reqwest::Url::parse_with_params(&config.base_url, &query).map_err(|e| {
            error!("HTTP request failed: invalid base URL {}: {}", config.base_url, e);
            CoreError::RequestFailed {
                message: format!("invalid base URL '{}': {}", config.base_url, e),
            }
        })?;

        debug!(
            mtype = %request.code(),
            client_id,
            base_url = %config.base_url,
            "Dispatching WikiMed request"
        );

        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(request_error)?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(request_error)?;

        if !looks_like_xml(content_type.as_deref(), &body) {
            return Ok(NormalizedResponse::Text(body));
        }

        match xml_to_json(&body) {
            Ok(value) => Ok(NormalizedResponse::Json(to_pretty(&value))),
            Err(cause) => {
                error!("XML to JSON conversion failed: {}", cause);
                Err(CoreError::XmlParse { raw: body, cause })
            }
        }
    }
}

/// Map a reqwest failure onto the error taxonomy.
///
/// Builder errors here come from the request URL (an unsupported scheme, for
/// instance) and count as request failures like any network error. The URL is
/// dropped from the message since its query string carries the credential code.
fn request_error(e: reqwest::Error) -> CoreError {
    let message = error_chain(&e.without_url());
    error!("HTTP request failed: {}", message);
    CoreError::RequestFailed { message }
}

fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
