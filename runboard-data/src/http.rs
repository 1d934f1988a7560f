//! reqwest-backed [`RunClient`].

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::client::{ApiResult, BoxFuture, BulkRunClient, RunClient};
use crate::error::ApiError;
use crate::types::{BulkRunRequest, BulkRunResult, CreateRunRequest, Run, RunPage, UserIdentity};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const API_PREFIX: &str = "/api/v1";

/// HTTP client for the runs API.
pub struct HttpRunClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

/// Error body shape used by the API (`{"error": "...", "message": "..."}`).
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl HttpRunClient {
    pub fn new(base_url: &str, api_key: &str) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("runboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Network {
                operation: "build_client",
                target: base_url.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    /// Send a request, wrap transport failures and decode the JSON body.
    async fn send<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
        target: String,
    ) -> ApiResult<T> {
        let request_id = uuid::Uuid::new_v4().to_string();
        debug!(operation, target = %target, request_id = %request_id, "sending request");

        let response = request
            .bearer_auth(&self.api_key)
            .header("X-Request-Id", &request_id)
            .send()
            .await
            .map_err(|e| {
                warn!(operation, target = %target, request_id = %request_id, error = %e, "request failed");
                ApiError::Network {
                    operation,
                    target: target.clone(),
                    message: e.to_string(),
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| ApiError::Network {
            operation,
            target: target.clone(),
            message: e.to_string(),
        })?;

        if !status.is_success() {
            warn!(operation, status = status.as_u16(), request_id = %request_id, "api error");
            return Err(parse_error_body(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Decode {
            operation,
            message: e.to_string(),
        })
    }
}

/// Turn a non-2xx response body into a structured error.
pub fn parse_error_body(status: u16, body: &str) -> ApiError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("HTTP {}", status)
            } else {
                trimmed.chars().take(200).collect()
            }
        });
    ApiError::Api { status, message }
}

impl RunClient for HttpRunClient {
    fn create_run<'a>(&'a self, request: &'a CreateRunRequest) -> BoxFuture<'a, ApiResult<Run>> {
        Box::pin(async move {
            request.validate()?;
            let url = self.url("/runs");
            self.send("create_run", self.http.post(&url).json(request), url)
                .await
        })
    }

    fn get_run<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<Run>> {
        Box::pin(async move {
            let url = self.url(&format!("/runs/{}", id));
            self.send("get_run", self.http.get(&url), url).await
        })
    }

    fn list_runs(&self, limit: usize, offset: usize) -> BoxFuture<'_, ApiResult<RunPage>> {
        Box::pin(async move {
            let url = self.url("/runs");
            let request = self
                .http
                .get(&url)
                .query(&[("limit", limit), ("offset", offset)]);
            self.send("list_runs", request, url).await
        })
    }

    fn get_current_user(&self) -> BoxFuture<'_, ApiResult<UserIdentity>> {
        Box::pin(async move {
            let url = self.url("/users/me");
            self.send("get_current_user", self.http.get(&url), url)
                .await
        })
    }

    fn endpoint(&self) -> String {
        self.base_url.clone()
    }

    fn bulk(&self) -> Option<&dyn BulkRunClient> {
        Some(self)
    }
}

impl BulkRunClient for HttpRunClient {
    fn create_runs<'a>(
        &'a self,
        request: &'a BulkRunRequest,
    ) -> BoxFuture<'a, ApiResult<BulkRunResult>> {
        Box::pin(async move {
            request.validate()?;
            let url = self.url("/runs/bulk");
            self.send("create_runs", self.http.post(&url).json(request), url)
                .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_prefix_and_trims_slash() {
        let client = HttpRunClient::new("https://api.example.com/", "key").unwrap();
        assert_eq!(client.url("/runs"), "https://api.example.com/api/v1/runs");
        assert_eq!(client.endpoint(), "https://api.example.com");
    }

    #[test]
    fn test_parse_error_body_prefers_message() {
        let err = parse_error_body(404, r#"{"error":"not_found","message":"run missing"}"#);
        assert_eq!(
            err,
            ApiError::Api {
                status: 404,
                message: "run missing".to_string()
            }
        );
    }

    #[test]
    fn test_parse_error_body_falls_back_to_error_field() {
        let err = parse_error_body(400, r#"{"error":"bad request"}"#);
        assert_eq!(err.to_string(), "API error 400: bad request");
    }

    #[test]
    fn test_parse_error_body_handles_plain_text_and_empty() {
        let err = parse_error_body(502, "upstream unavailable");
        assert_eq!(err.to_string(), "API error 502: upstream unavailable");

        let err = parse_error_body(500, "");
        assert_eq!(err.to_string(), "API error 500: HTTP 500");
    }

    #[test]
    fn test_http_client_offers_bulk() {
        let client = HttpRunClient::new("http://localhost:9", "key").unwrap();
        assert!(client.bulk().is_some());
    }

    #[tokio::test]
    async fn test_create_run_validates_before_sending() {
        // Port 9 (discard) is never contacted: validation fails first.
        let client = HttpRunClient::new("http://127.0.0.1:9", "key").unwrap();
        let err = client
            .create_run(&CreateRunRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
