//! [`HttpExecutor`] backed by `reqwest`.

use serde_json::Value;

use super::{extract_message, ApiRequest, HttpExecutor, HttpFailure, HttpResult, Method};

/// `User-Agent` sent with every request.
pub const USER_AGENT: &str = concat!("shadowsync/", env!("CARGO_PKG_VERSION"));

/// Sends requests to real hosts.
#[derive(Clone)]
pub struct ReqwestExecutor {
    client: reqwest::Client,
}

impl ReqwestExecutor {
    /// Create an executor with the crate's user agent.
    ///
    /// GitHub rejects requests without a `User-Agent`.
    pub fn new() -> HttpResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| HttpFailure::Transport {
                url: String::new(),
                message: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self { client })
    }

    async fn send(&self, request: ApiRequest) -> HttpResult<Value> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
        };

        let mut builder = self
            .client
            .request(method, &request.url)
            .header(reqwest::header::AUTHORIZATION, request.auth.header_value())
            .header(reqwest::header::ACCEPT, "application/json");

        if let Some(body) = request.payload() {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| HttpFailure::Transport {
            url: request.url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| HttpFailure::Transport {
            url: request.url.clone(),
            message: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(HttpFailure::Status {
                url: request.url,
                status: status.as_u16(),
                message: extract_message(&text),
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| HttpFailure::Decode {
            url: request.url,
            message: e.to_string(),
        })
    }
}

impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, request: ApiRequest) -> HttpResult<Value> {
        tracing::trace!(method = request.method.as_str(), url = %request.url, "Sending request");

        let result = self.send(request).await;
        if let Err(failure) = &result {
            failure.log();
        }
        result
    }
}
