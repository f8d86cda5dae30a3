//! Upstream forwarding over reqwest
//!
//! Rewrites scheme and host to the upstream, keeps method, path, query,
//! headers and body, and streams the upstream answer back untouched.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::request::Parts;
use axum::http::{HeaderMap, Request, Response, StatusCode, Uri, header};
use bytes::Bytes;
use url::Url;

use crate::error::{ProxyError, ProxyResult};
use crate::traits::Forwarder;
use crate::types::RequestId;
use shared::{request_debug, request_warn};

/// Connection-scoped headers that must not cross the proxy
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

#[derive(Clone)]
pub struct RealForwarder {
    client: reqwest::Client,
    upstream: Url,
}

impl RealForwarder {
    /// `insecure` turns off certificate verification towards the upstream
    pub fn new(upstream: Url, insecure: bool) -> ProxyResult<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(insecure)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ProxyError::UpstreamClient {
                message: e.to_string(),
            })?;
        Ok(Self { client, upstream })
    }

    /// Upstream scheme and authority with the request's path and query
    pub fn target_url(&self, uri: &Uri) -> Url {
        let mut url = self.upstream.clone();
        url.set_path(uri.path());
        url.set_query(uri.query());
        url
    }

    async fn send(&self, parts: Parts, body: Bytes) -> Result<Response<Body>, reqwest::Error> {
        let url = self.target_url(&parts.uri);

        // reqwest derives Host and Content-Length from the target and body
        let mut headers = strip_hop_by_hop(parts.headers);
        headers.remove(header::HOST);
        headers.remove(header::CONTENT_LENGTH);

        let upstream_response = self
            .client
            .request(parts.method, url)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = upstream_response.status();
        let headers = strip_hop_by_hop(upstream_response.headers().clone());

        let mut response = Response::new(Body::from_stream(upstream_response.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

#[async_trait]
impl Forwarder for RealForwarder {
    async fn forward(&self, request: Request<Body>) -> Response<Body> {
        let request_id = RequestId::of(&request);
        let (parts, body) = request.into_parts();
        let method = parts.method.clone();
        let uri = parts.uri.clone();

        // a truncated body must never reach the upstream as a shorter write
        let body = match axum::body::to_bytes(body, usize::MAX).await {
            Ok(bytes) => bytes,
            Err(e) => {
                request_warn!(
                    request_id,
                    method = %method,
                    uri = %uri,
                    err = %e,
                    "could not read request body, not forwarding"
                );
                return status_only(StatusCode::BAD_REQUEST);
            }
        };

        request_debug!(
            request_id,
            method = %method,
            target = %self.target_url(&uri),
            "➡️ forwarding to upstream"
        );

        match self.send(parts, body).await {
            Ok(response) => response,
            Err(e) => {
                request_warn!(
                    request_id,
                    method = %method,
                    uri = %uri,
                    err = %e,
                    "upstream request failed"
                );
                status_only(StatusCode::BAD_GATEWAY)
            }
        }
    }
}

fn status_only(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

fn strip_hop_by_hop(mut headers: HeaderMap) -> HeaderMap {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use futures_util::stream;
    use wiremock::matchers::{body_string, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn forwarder(upstream: &str) -> RealForwarder {
        RealForwarder::new(shared::parse_domain(upstream).unwrap(), false).unwrap()
    }

    #[test]
    fn test_target_url_keeps_path_and_query() {
        let forwarder = forwarder("api.example.com");
        let uri: Uri = "http://localhost:8080/v1/users?page=2&sort=asc".parse().unwrap();
        assert_eq!(
            forwarder.target_url(&uri).as_str(),
            "https://api.example.com/v1/users?page=2&sort=asc"
        );
    }

    #[test]
    fn test_target_url_ignores_upstream_path() {
        let forwarder = forwarder("http://127.0.0.1:3000/base");
        let uri: Uri = "/items".parse().unwrap();
        assert_eq!(
            forwarder.target_url(&uri).as_str(),
            "http://127.0.0.1:3000/items"
        );
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));

        let headers = strip_hop_by_hop(headers);
        assert!(!headers.contains_key(header::CONNECTION));
        assert!(!headers.contains_key(header::TRANSFER_ENCODING));
        assert_eq!(headers[header::ACCEPT], "*/*");
    }

    #[tokio::test]
    async fn test_broken_request_body_is_not_forwarded() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&upstream)
            .await;

        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(std::io::Error::from(std::io::ErrorKind::ConnectionReset)),
        ];
        let request = Request::builder()
            .method("POST")
            .uri("/orders")
            .body(Body::from_stream(stream::iter(chunks)))
            .unwrap();

        let response = forwarder(&upstream.uri()).forward(request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_request_body_reaches_upstream_intact() {
        let upstream = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/orders/7"))
            .and(body_string("full payload"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&upstream)
            .await;

        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"full ")),
            Ok(Bytes::from_static(b"payload")),
        ];
        let request = Request::builder()
            .method("PUT")
            .uri("/orders/7")
            .body(Body::from_stream(stream::iter(chunks)))
            .unwrap();

        let response = forwarder(&upstream.uri()).forward(request).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_bad_gateway() {
        // nothing listens on port 9 of the loopback interface
        let forwarder = forwarder("http://127.0.0.1:9");
        let request = Request::builder().uri("/down").body(Body::empty()).unwrap();
        let response = forwarder.forward(request).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
