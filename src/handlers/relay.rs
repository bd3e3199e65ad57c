use axum::{
    body::Body,
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::backend::BackendClient;

/// Rebuilds the backend path from the decoded wildcard, re-encoding each segment.
/// Dot segments are refused so a request cannot leave `/chatbots/`.
fn backend_path(path: &str, query: Option<&str>) -> Option<String> {
    let mut target = String::from("/chatbots");
    for segment in path.split('/') {
        if segment == "." || segment == ".." {
            return None;
        }
        target.push('/');
        target.push_str(&urlencoding::encode(segment));
    }
    match query {
        Some(query) if !query.is_empty() => Some(format!("{}?{}", target, query)),
        _ => Some(target),
    }
}

/// Passes browser calls under `/relay/chatbots/` through to the backend.
///
/// Used for the streaming query endpoints and for multipart document upload.
/// The response body is streamed back unbuffered so events reach the page as
/// the backend emits them.
pub async fn relay_handler(
    State(backend): State<BackendClient>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    method: Method,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let Some(target) = backend_path(&path, query.as_deref()) else {
        log::warn!("relay refused path {:?}", path);
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "invalid relay path" })),
        )
            .into_response();
    };
    let upstream_body = reqwest::Body::wrap_stream(body.into_data_stream());

    let upstream = match backend.forward(method.clone(), &target, &headers, upstream_body).await {
        Ok(response) => response,
        Err(e) => {
            log::error!("relay {} {} failed: {}", method, target, e);
            return (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "detail": format!("backend unavailable: {}", e) })),
            )
                .into_response();
        }
    };

    let status = upstream.status();
    log::debug!("relay {} {} -> {}", method, target, status);

    let mut response_headers = HeaderMap::new();
    for name in [header::CONTENT_TYPE, header::CACHE_CONTROL] {
        if let Some(value) = upstream.headers().get(&name) {
            response_headers.insert(name, value.clone());
        }
    }
    // keep reverse proxies in front of us from buffering event streams
    response_headers.insert("x-accel-buffering", HeaderValue::from_static("no"));

    (
        status,
        response_headers,
        Body::from_stream(upstream.bytes_stream()),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use axum::{routing::post, Router};
    use futures::StreamExt;
    use std::time::Duration;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn relay_to(api_url: String) -> String {
        let backend = BackendClient::new(&BackendConfig {
            api_url,
            connect_timeout: Duration::from_secs(1),
        })
        .unwrap();
        let app = Router::new()
            .route("/relay/chatbots/*path", post(relay_handler))
            .with_state(backend);
        serve(app).await
    }

    async fn fake_backend() -> String {
        async fn stream(headers: HeaderMap) -> Response {
            let auth = headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("none")
                .to_string();
            let chunks = vec![
                Ok::<_, std::io::Error>(format!("data: {{\"type\":\"chunk\",\"content\":\"{}\"}}\n\n", auth)),
                Ok("data: {\"type\":\"done\"}\n\n".to_string()),
            ];
            (
                [(header::CONTENT_TYPE, "text/event-stream")],
                Body::from_stream(futures::stream::iter(chunks)),
            )
                .into_response()
        }

        async fn missing() -> Response {
            (StatusCode::NOT_FOUND, Json(json!({ "detail": "Chatbot not found" }))).into_response()
        }

        let app = Router::new()
            .route("/chatbots/:id/query/stream", post(stream))
            .route("/chatbots/public/:token/query", post(missing));
        serve(app).await
    }

    #[test]
    fn query_string_is_kept() {
        assert_eq!(
            backend_path("abc/documents", Some("x=1")).as_deref(),
            Some("/chatbots/abc/documents?x=1")
        );
        assert_eq!(backend_path("abc/query", Some("")).as_deref(), Some("/chatbots/abc/query"));
        assert_eq!(backend_path("abc/query", None).as_deref(), Some("/chatbots/abc/query"));
    }

    #[test]
    fn segments_are_reencoded_and_dot_segments_refused() {
        assert_eq!(
            backend_path("abc 1?/query/stream", None).as_deref(),
            Some("/chatbots/abc%201%3F/query/stream")
        );
        assert_eq!(backend_path("../auth/me", None), None);
        assert_eq!(backend_path("abc/./query", None), None);
    }

    #[tokio::test]
    async fn escaping_paths_are_rejected() {
        let relay = relay_to(fake_backend().await).await;

        let response = reqwest::Client::new()
            .post(format!("{}/relay/chatbots/..%2Fauth%2Fme", relay))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["detail"], "invalid relay path");
    }

    #[tokio::test]
    async fn streams_backend_body_with_auth_forwarded() {
        let relay = relay_to(fake_backend().await).await;

        let response = reqwest::Client::new()
            .post(format!("{}/relay/chatbots/abc/query/stream", relay))
            .bearer_auth("t0k")
            .json(&json!({ "question": "q", "k": 4 }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );
        let body: Vec<u8> = response
            .bytes_stream()
            .map(|chunk| chunk.unwrap().to_vec())
            .concat()
            .await;
        let body = String::from_utf8(body).unwrap();
        assert!(body.contains("Bearer t0k"));
        assert!(body.ends_with("data: {\"type\":\"done\"}\n\n"));
    }

    #[tokio::test]
    async fn backend_status_is_preserved() {
        let relay = relay_to(fake_backend().await).await;

        let response = reqwest::Client::new()
            .post(format!("{}/relay/chatbots/public/nope/query", relay))
            .json(&json!({ "question": "q", "k": 4 }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["detail"], "Chatbot not found");
    }

    #[tokio::test]
    async fn unreachable_backend_is_bad_gateway() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        let relay = relay_to(dead).await;

        let response = reqwest::Client::new()
            .post(format!("{}/relay/chatbots/abc/query/stream", relay))
            .json(&json!({ "question": "q", "k": 4 }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body["detail"].as_str().unwrap().starts_with("backend unavailable"));
    }
}
