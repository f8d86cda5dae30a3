//! Canned responses

use axum::body::Body;
use axum::http::{HeaderValue, Response, StatusCode, header};
use bytes::Bytes;

use shared::{ConfigError, ConfigResult, ResponseConfig};

pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Static content type, status and body
///
/// Unset fields are filled in when the response is rendered, so the same
/// mock can serve as a 200 mock or as a 500/400 error answer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MockResponse {
    content_type: Option<HeaderValue>,
    status: Option<StatusCode>,
    body: Bytes,
}

impl MockResponse {
    pub fn from_config(endpoint: &str, config: &ResponseConfig) -> ConfigResult<Self> {
        let content_type = match config.content_type.as_deref() {
            None | Some("") => None,
            Some(value) => Some(HeaderValue::from_str(value).map_err(|_| {
                ConfigError::InvalidContentType {
                    endpoint: endpoint.to_string(),
                    value: value.to_string(),
                }
            })?),
        };

        let status = match config.status {
            None | Some(0) => None,
            Some(code) => Some(StatusCode::from_u16(code).map_err(|_| ConfigError::InvalidStatus {
                endpoint: endpoint.to_string(),
                status: code,
            })?),
        };

        Ok(Self {
            content_type,
            status,
            body: Bytes::from(config.body.clone().unwrap_or_default()),
        })
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn content_type(&self) -> HeaderValue {
        self.content_type
            .clone()
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE))
    }

    /// Build the HTTP response, using `default_status` when none is configured
    pub fn render(&self, default_status: StatusCode) -> Response<Body> {
        let body = if self.body.is_empty() {
            Body::empty()
        } else {
            Body::from(self.body.clone())
        };

        let mut response = Response::new(body);
        *response.status_mut() = self.status.unwrap_or(default_status);
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, self.content_type());
        response
    }
}
