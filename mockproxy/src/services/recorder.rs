//! Response capture for diagnostic logging
//!
//! The middleware tags each request with a `RequestId`. With debug logging
//! on, it also keeps a dump of the request and wraps the response body in a
//! `ResponseRecorder`. The recorder copies every frame as it passes and logs
//! the full exchange once the body is finished or dropped. The client gets
//! exactly the bytes the handler produced.

use axum::body::Body;
use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, Response, StatusCode, header};
use axum::middleware::Next;
use bytes::Bytes;
use http_body::{Body as HttpBody, Frame, SizeHint};
use std::fmt::Write as _;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::types::RequestId;
use shared::request_debug;

const RULE_WIDTH: usize = 80;

/// Axum middleware: assign the request id and, at debug level, record the exchange
pub async fn record_exchange(mut request: Request, next: Next) -> Response<Body> {
    let request_id = RequestId::new();
    request.extensions_mut().insert(request_id);

    if !tracing::enabled!(tracing::Level::DEBUG) {
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            request_debug!(request_id, err = %e, "could not dump request");
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::BAD_REQUEST;
            return response;
        }
    };
    let request_dump = dump_request(&parts, &body);
    let request = Request::from_parts(parts, Body::from(body));

    let response = next.run(request).await;
    let (parts, body) = response.into_parts();
    let recorder = ResponseRecorder::new(
        request_id,
        request_dump,
        parts.status,
        parts.headers.clone(),
        body,
    );
    Response::from_parts(parts, Body::new(recorder))
}

/// Pass-through body that keeps a copy of everything written to the client
pub struct ResponseRecorder {
    inner: Body,
    request_id: RequestId,
    request_dump: String,
    status: StatusCode,
    headers: HeaderMap,
    data: Vec<u8>,
    logged: bool,
}

impl ResponseRecorder {
    pub fn new(
        request_id: RequestId,
        request_dump: String,
        status: StatusCode,
        headers: HeaderMap,
        inner: Body,
    ) -> Self {
        Self {
            inner,
            request_id,
            request_dump,
            status,
            headers,
            data: Vec::new(),
            logged: false,
        }
    }

    /// Bytes seen so far
    pub fn captured(&self) -> &[u8] {
        &self.data
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn finish(&mut self) {
        if self.logged {
            return;
        }
        self.logged = true;
        let exchange = render_exchange(&self.request_dump, self.status, &self.headers, &self.data);
        request_debug!(self.request_id, "{}", exchange);
    }
}

impl HttpBody for ResponseRecorder {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.data.extend_from_slice(data);
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(None) => {
                this.finish();
                Poll::Ready(None)
            }
            other => other,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for ResponseRecorder {
    fn drop(&mut self) {
        // empty bodies are never polled and aborted ones never finish
        self.finish();
    }
}

/// Request line, headers and body in HTTP/1 wire layout
pub fn dump_request(parts: &Parts, body: &[u8]) -> String {
    let mut dump = String::new();
    let _ = write!(dump, "{} {} {:?}\r\n", parts.method, parts.uri, parts.version);
    for (name, value) in parts.headers.iter() {
        let _ = write!(dump, "{}: {}\r\n", name, String::from_utf8_lossy(value.as_bytes()));
    }
    dump.push_str("\r\n");
    dump.push_str(&String::from_utf8_lossy(body));
    dump
}

/// `application/json` and `+json` media types, parameters ignored
pub fn is_json_media_type(content_type: Option<&HeaderValue>) -> bool {
    let Some(value) = content_type.and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let essence = value.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

/// Body for the log: indented JSON when it parses as JSON, otherwise the raw bytes
pub fn pretty_body(content_type: Option<&HeaderValue>, body: &[u8]) -> String {
    if is_json_media_type(content_type) {
        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
            if let Ok(pretty) = serde_json::to_string_pretty(&value) {
                return pretty;
            }
        }
    }
    String::from_utf8_lossy(body).into_owned()
}

/// The full framed exchange as written to the debug log
pub fn render_exchange(
    request_dump: &str,
    status: StatusCode,
    headers: &HeaderMap,
    body: &[u8],
) -> String {
    let mut out = String::new();
    out.push_str("HTTP Request:\n");
    out.push_str(&"=".repeat(RULE_WIDTH));
    out.push_str("\n📥 incoming request\n");
    out.push_str(request_dump);
    out.push('\n');
    out.push_str(&"-".repeat(RULE_WIDTH));
    out.push_str("\n📤 outgoing response\n");
    let _ = writeln!(out, "Status: {}", status.as_u16());
    for (name, value) in headers.iter() {
        let _ = writeln!(out, "{}: {}", name, String::from_utf8_lossy(value.as_bytes()));
    }
    out.push_str(&pretty_body(headers.get(header::CONTENT_TYPE), body));
    out.push('\n');
    out.push_str(&"=".repeat(RULE_WIDTH));
    out
}
