use futures::{Stream, StreamExt};
use http::{header, HeaderMap, Method};
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::config::BackendConfig;
use crate::stream::TransportError;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    /// Non-success status. `detail` is FastAPI's `detail` text when the body had one.
    #[error("{detail}")]
    Status { status: u16, detail: String },
    #[error("unexpected backend response: {0}")]
    Decode(String),
    #[error("failed to build http client: {0}")]
    Build(String),
}

impl BackendError {
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Pulls a readable message out of an error body.
///
/// FastAPI answers `{"detail": "..."}`, or `{"detail": [{"msg": ...}, ...]}` for validation errors.
pub fn error_detail(status: u16, body: &str) -> String {
    let fallback = || format!("request failed with status {}", status);

    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        let text = body.trim();
        return if text.is_empty() { fallback() } else { text.to_string() };
    };

    match value.get("detail") {
        Some(serde_json::Value::String(detail)) => detail.clone(),
        Some(serde_json::Value::Array(items)) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            if messages.is_empty() {
                fallback()
            } else {
                messages.join("; ")
            }
        }
        _ => fallback(),
    }
}

/// Thin client for the FastAPI backend, shared through `AppState`.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| BackendError::Build(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(builder: RequestBuilder) -> Result<Response, BackendError> {
        let response = builder
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = error_detail(status.as_u16(), &body);
        log::warn!("backend answered {}: {}", status, detail);
        Err(BackendError::Status {
            status: status.as_u16(),
            detail,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, token: Option<&str>) -> Result<T, BackendError> {
        let response = Self::send(self.request(Method::GET, path, token)).await?;
        Self::decode(response).await
    }

    /// POST or PUT a JSON body and decode the JSON answer.
    pub async fn send_json<B, T>(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = Self::send(self.request(method, path, token).json(body)).await?;
        Self::decode(response).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<(), BackendError> {
        Self::send(self.request(Method::DELETE, path, token)).await?;
        Ok(())
    }

    /// POSTs `body` and returns the response body as it arrives.
    pub async fn open_stream<B>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<impl Stream<Item = Result<impl AsRef<[u8]>, TransportError>>, TransportError>
    where
        B: Serialize + ?Sized,
    {
        let response = self
            .request(Method::POST, path, token)
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            log::error!("stream request to {} failed with {}", path, status);
            return Err(TransportError::RequestFailed {
                status: status.as_u16(),
            });
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransportError::Network(e.to_string()))))
    }

    /// Sends a request on behalf of the browser, keeping only the headers the backend needs.
    ///
    /// Every status is handed back as-is; only a failed connection is an error.
    pub async fn forward(
        &self,
        method: Method,
        path_and_query: &str,
        headers: &HeaderMap,
        body: reqwest::Body,
    ) -> Result<Response, BackendError> {
        let mut builder = self.http.request(method, self.url(path_and_query)).body(body);
        for name in [header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT] {
            if let Some(value) = headers.get(&name) {
                builder = builder.header(name, value.clone());
            }
        }
        builder
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Path,
        http::{HeaderMap as AxumHeaders, StatusCode},
        response::IntoResponse,
        routing::{delete, get, post},
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::time::Duration;

    async fn spawn_backend() -> BackendClient {
        async fn me(headers: AxumHeaders) -> impl IntoResponse {
            match headers.get("authorization").and_then(|v| v.to_str().ok()) {
                Some("Bearer good") => (
                    StatusCode::OK,
                    Json(json!({ "id": "u1", "prenom": "Ada", "nom": "Lovelace", "email": "ada@example.com" })),
                ),
                _ => (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "detail": "Could not validate credentials" })),
                ),
            }
        }

        async fn create(Json(body): Json<Value>) -> impl IntoResponse {
            if body["name"].as_str().unwrap_or_default().is_empty() {
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({ "detail": [{ "loc": ["body", "name"], "msg": "name is too short" }] })),
                );
            }
            (StatusCode::CREATED, Json(json!({ "name": body["name"] })))
        }

        async fn remove(Path(id): Path<String>) -> StatusCode {
            if id == "known" {
                StatusCode::NO_CONTENT
            } else {
                StatusCode::NOT_FOUND
            }
        }

        async fn stream() -> &'static str {
            "data: {\"type\":\"chunk\",\"content\":\"hi\"}\n\ndata: {\"type\":\"done\"}\n\n"
        }

        let app = Router::new()
            .route("/auth/me", get(me))
            .route("/chatbots", post(create))
            .route("/chatbots/:id", delete(remove))
            .route("/chatbots/:id/query/stream", post(stream));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        BackendClient::new(&BackendConfig {
            api_url: format!("http://{}", addr),
            connect_timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    #[test]
    fn detail_is_extracted_from_fastapi_bodies() {
        assert_eq!(error_detail(400, r#"{"detail":"Email already registered"}"#), "Email already registered");
        assert_eq!(
            error_detail(422, r#"{"detail":[{"msg":"a"},{"msg":"b"}]}"#),
            "a; b"
        );
        assert_eq!(error_detail(502, "Bad Gateway"), "Bad Gateway");
        assert_eq!(error_detail(500, ""), "request failed with status 500");
        assert_eq!(error_detail(500, r#"{"error":"x"}"#), "request failed with status 500");
    }

    #[tokio::test]
    async fn bearer_token_is_sent() {
        let client = spawn_backend().await;

        let user: Value = client.get_json("/auth/me", Some("good")).await.unwrap();
        assert_eq!(user["prenom"], "Ada");

        let err = client.get_json::<Value>("/auth/me", Some("bad")).await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.to_string(), "Could not validate credentials");
    }

    #[tokio::test]
    async fn validation_errors_carry_messages() {
        let client = spawn_backend().await;

        let created: Value = client
            .send_json(Method::POST, "/chatbots", None, &json!({ "name": "Docs" }))
            .await
            .unwrap();
        assert_eq!(created["name"], "Docs");

        let err = client
            .send_json::<_, Value>(Method::POST, "/chatbots", None, &json!({ "name": "" }))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(422));
        assert_eq!(err.to_string(), "name is too short");
    }

    #[tokio::test]
    async fn delete_maps_statuses() {
        let client = spawn_backend().await;
        client.delete("/chatbots/known", None).await.unwrap();
        assert_eq!(client.delete("/chatbots/other", None).await.unwrap_err().status(), Some(404));
    }

    #[tokio::test]
    async fn stream_body_is_readable() {
        let client = spawn_backend().await;
        let body = client
            .open_stream("/chatbots/abc/query/stream", None, &json!({ "question": "q", "k": 4 }))
            .await
            .unwrap();
        let bytes: Vec<u8> = body
            .map(|chunk| chunk.unwrap().as_ref().to_vec())
            .concat()
            .await;
        assert!(String::from_utf8(bytes).unwrap().contains("\"done\""));

        let err = client
            .open_stream("/chatbots/abc/nope", None, &json!({}))
            .await
            .err()
            .unwrap();
        assert_eq!(err, TransportError::RequestFailed { status: 404 });
    }

    #[tokio::test]
    async fn unreachable_backend_is_reported() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = BackendClient::new(&BackendConfig {
            api_url: format!("http://{}", addr),
            connect_timeout: Duration::from_secs(1),
        })
        .unwrap();
        let err = client.get_json::<Value>("/auth/me", None).await.unwrap_err();
        assert!(matches!(err, BackendError::Unreachable(_)));
    }
}
