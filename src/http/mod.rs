//! HTTP request execution.
//!
//! Every remote call goes through an [`HttpExecutor`]. The executor sends the
//! request, decodes the JSON body, and folds every kind of failure (network
//! error, non-2xx status, undecodable body) into an [`HttpFailure`] value, so
//! callers branch on `Result` instead of handling transport errors.
//!
//! Failures are logged at `warn` with `status`, `url` and `message` fields.
//! That log is for operators only; callers decide what a failure means.

mod reqwest_executor;

pub use reqwest_executor::{ReqwestExecutor, USER_AGENT};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
pub use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use thiserror::Error;

/// Result of a single remote call.
pub type HttpResult<T> = std::result::Result<T, HttpFailure>;

/// HTTP verbs used against the source and destination hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
}

impl Method {
    /// Only mutating methods carry a serialized body.
    #[must_use]
    pub const fn has_body(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
        }
    }
}

/// Credentials attached to a request.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    /// `Authorization: Basic base64(user:secret)`.
    Basic { username: String, secret: String },
    /// `Authorization: Bearer <token>`.
    Bearer(String),
}

impl Auth {
    /// Value of the `Authorization` header.
    #[must_use]
    pub fn header_value(&self) -> String {
        match self {
            Self::Basic { username, secret } => {
                format!("Basic {}", STANDARD.encode(format!("{username}:{secret}")))
            }
            Self::Bearer(token) => format!("Bearer {token}"),
        }
    }
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic { username, .. } => write!(f, "Basic({username}:***)"),
            Self::Bearer(_) => write!(f, "Bearer(***)"),
        }
    }
}

/// A fully-described remote call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub auth: Auth,
    /// Ignored for methods without a body.
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>, auth: &Auth) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            auth: auth.clone(),
            body: None,
        }
    }

    pub fn with_body(method: Method, url: impl Into<String>, auth: &Auth, body: Value) -> Self {
        Self {
            method,
            url: url.into(),
            auth: auth.clone(),
            body: Some(body),
        }
    }

    /// The body that will actually be sent.
    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        if self.method.has_body() {
            self.body.as_ref()
        } else {
            None
        }
    }
}

/// Uniform failure of a remote call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpFailure {
    /// Network unreachable, TLS failure, timeout.
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The host answered with a non-2xx status.
    #[error("Request to {url} failed with status {status}{}", detail(.message))]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    /// The body was not the JSON shape we expected.
    #[error("Malformed response from {url}: {message}")]
    Decode { url: String, message: String },
}

fn detail(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(": \"{message}\"")
    }
}

impl HttpFailure {
    /// HTTP status, when the host answered at all.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { .. } | Self::Decode { .. } => None,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Transport { url, .. } | Self::Status { url, .. } | Self::Decode { url, .. } => {
                url
            }
        }
    }

    /// Emit the operator-facing log line for this failure.
    pub fn log(&self) {
        match self {
            Self::Status {
                url,
                status,
                message,
            } => tracing::warn!(status, url = %url, message = %message, "Request failed"),
            Self::Transport { url, message } | Self::Decode { url, message } => {
                tracing::warn!(url = %url, message = %message, "Request failed");
            }
        }
    }
}

/// Append path segments to an API base URL, percent-encoding each one.
///
/// `base` must be an `http(s)` URL; configuration rejects anything else.
#[must_use]
pub fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// Best-effort extraction of a server-provided error message.
///
/// GitHub, Bitbucket and Azure all answer errors with JSON, but in different
/// shapes (`message`, `error.message`). Anything else yields an empty string.
#[must_use]
pub fn extract_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return String::new();
    };

    value
        .get("message")
        .or_else(|| value.get("error").and_then(|e| e.get("message")))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}

/// Executes remote calls.
///
/// Implemented by [`ReqwestExecutor`] for real hosts and by in-memory fakes
/// in tests.
pub trait HttpExecutor: Send + Sync {
    /// Send the request and return the decoded JSON body.
    ///
    /// Never panics and never surfaces transport errors other than as
    /// [`HttpFailure`]. An empty 2xx body decodes to `Value::Null`.
    fn execute(&self, request: ApiRequest) -> impl Future<Output = HttpResult<Value>> + Send;
}

impl<E: HttpExecutor> HttpExecutor for &E {
    fn execute(&self, request: ApiRequest) -> impl Future<Output = HttpResult<Value>> + Send {
        (**self).execute(request)
    }
}

/// Execute a request and decode the body into `T`.
pub async fn fetch<E, T>(executor: &E, request: ApiRequest) -> HttpResult<T>
where
    E: HttpExecutor,
    T: DeserializeOwned,
{
    let url = request.url.clone();
    let value = executor.execute(request).await?;
    serde_json::from_value(value).map_err(|e| {
        let failure = HttpFailure::Decode {
            url,
            message: e.to_string(),
        };
        failure.log();
        failure
    })
}
