use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{self, LocalBoxStream, Stream, StreamExt};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, FormData, Headers, ReadableStreamDefaultReader, Request, RequestInit, Response};

use super::error::TransportError;

fn network(e: JsValue) -> TransportError {
    TransportError::Network(
        e.as_string()
            .or_else(|| e.dyn_ref::<js_sys::Error>().map(|err| String::from(err.message())))
            .unwrap_or_else(|| format!("{:?}", e)),
    )
}

/// Response body of an in-flight fetch. Dropping it aborts the request.
pub struct ResponseBody {
    inner: LocalBoxStream<'static, Result<Vec<u8>, TransportError>>,
    abort: AbortController,
}

impl Stream for ResponseBody {
    type Item = Result<Vec<u8>, TransportError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl Drop for ResponseBody {
    fn drop(&mut self) {
        self.abort.abort();
    }
}

async fn read_chunk(reader: &ReadableStreamDefaultReader) -> Result<Option<Vec<u8>>, TransportError> {
    let result = JsFuture::from(reader.read()).await.map_err(network)?;
    let done = js_sys::Reflect::get(&result, &JsValue::from_str("done"))
        .map_err(network)?
        .as_bool()
        .unwrap_or(false);
    if done {
        return Ok(None);
    }
    let value = js_sys::Reflect::get(&result, &JsValue::from_str("value")).map_err(network)?;
    Ok(Some(js_sys::Uint8Array::new(&value).to_vec()))
}

fn headers(token: Option<&str>, content_type: Option<&str>) -> Result<Headers, TransportError> {
    let headers = Headers::new().map_err(network)?;
    if let Some(token) = token {
        headers
            .set("Authorization", &format!("Bearer {}", token))
            .map_err(network)?;
    }
    if let Some(content_type) = content_type {
        headers.set("Content-Type", content_type).map_err(network)?;
    }
    Ok(headers)
}

async fn send(url: &str, init: &RequestInit) -> Result<Response, TransportError> {
    let window = web_sys::window().ok_or_else(|| TransportError::Network("no window".to_string()))?;
    let request = Request::new_with_str_and_init(url, init).map_err(network)?;
    let response = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(network)?;
    response.dyn_into::<Response>().map_err(network)
}

/// POSTs `body` as JSON and hands back the response body as a byte stream.
///
/// Non-2xx statuses are reported before any of the body is read.
pub async fn open_stream(
    url: &str,
    body: &impl serde::Serialize,
    token: Option<&str>,
) -> Result<ResponseBody, TransportError> {
    let payload = serde_json::to_string(body).map_err(|e| TransportError::Network(e.to_string()))?;
    let abort = AbortController::new().map_err(network)?;

    let init = RequestInit::new();
    init.set_method("POST");
    init.set_headers(&headers(token, Some("application/json"))?);
    init.set_body(&JsValue::from_str(&payload));
    init.set_signal(Some(&abort.signal()));

    let response = send(url, &init).await?;
    if !response.ok() {
        return Err(TransportError::RequestFailed {
            status: response.status(),
        });
    }
    let reader = response
        .body()
        .ok_or(TransportError::MissingBody)?
        .get_reader()
        .unchecked_into::<ReadableStreamDefaultReader>();

    let inner = stream::unfold(Some(reader), |reader| async move {
        let reader = reader?;
        match read_chunk(&reader).await {
            Ok(Some(bytes)) => Some((Ok(bytes), Some(reader))),
            Ok(None) => None,
            Err(e) => Some((Err(e), None)),
        }
    })
    .boxed_local();

    Ok(ResponseBody { inner, abort })
}

/// POSTs a multipart form and returns the response text.
pub async fn post_form(url: &str, form: &FormData, token: Option<&str>) -> Result<String, TransportError> {
    let init = RequestInit::new();
    init.set_method("POST");
    init.set_headers(&headers(token, None)?);
    init.set_body(form);

    let response = send(url, &init).await?;
    let text = JsFuture::from(response.text().map_err(network)?)
        .await
        .map_err(network)?
        .as_string()
        .unwrap_or_default();

    if !response.ok() {
        log::warn!("form upload to {} failed with {}: {}", url, response.status(), text);
        return Err(TransportError::RequestFailed {
            status: response.status(),
        });
    }
    Ok(text)
}
