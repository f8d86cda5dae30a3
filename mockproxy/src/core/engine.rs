//! Request disposition engine
//!
//! Looks up the rule for the request path and either answers the request
//! itself (error or mock) or hands it to the forwarder.

use axum::body::Body;
use axum::http::{Request, Response};
use std::collections::HashMap;

use super::rule::{Disposition, EndpointRule};
use crate::traits::Forwarder;
use crate::types::RequestId;
use shared::{ConfigResult, EndpointTable, request_debug, request_info};

pub struct DispositionEngine<F: Forwarder> {
    routes: HashMap<String, EndpointRule>,
    forwarder: F,
}

impl<F: Forwarder> DispositionEngine<F> {
    pub fn new(routes: HashMap<String, EndpointRule>, forwarder: F) -> Self {
        Self { routes, forwarder }
    }

    /// Build every rule of the table; the first invalid route aborts the build
    pub fn from_table(table: &EndpointTable, forwarder: F) -> ConfigResult<Self> {
        let mut routes = HashMap::with_capacity(table.len());
        for (endpoint, config) in table {
            tracing::debug!(endpoint = %endpoint, "📖 parsing endpoint configuration");
            let rule = EndpointRule::from_config(endpoint, config)?;
            tracing::debug!(endpoint = %endpoint, config = %rule, "🧐 parsed endpoint");
            routes.insert(endpoint.clone(), rule);
        }
        Ok(Self::new(routes, forwarder))
    }

    /// Exact path match only
    pub fn rule(&self, path: &str) -> Option<&EndpointRule> {
        self.routes.get(path)
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Resolve the disposition for this request
    pub async fn dispose(&self, request_id: RequestId, path: &str) -> Disposition {
        let Some(rule) = self.rule(path) else {
            return Disposition::Forward;
        };

        request_debug!(
            request_id,
            endpoint = %path,
            config = %rule,
            "✍️ applying endpoint configuration"
        );

        let disposition = rule.evaluate().await;
        if let Disposition::Error { fault, .. } = &disposition {
            request_info!(
                request_id,
                endpoint = %path,
                kind = fault.kind(),
                err = %fault,
                "💥 simulated error"
            );
        }
        disposition
    }

    /// Answer the request, forwarding it when no rule produces a response
    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let request_id = RequestId::of(&request);
        let path = request.uri().path().to_string();

        let disposition = self.dispose(request_id, &path).await;
        let label = disposition.label();

        match disposition.into_response() {
            Some(response) => {
                request_debug!(
                    request_id,
                    endpoint = %path,
                    disposition = label,
                    status = response.status().as_u16(),
                    "🤡 responding with mock response"
                );
                response
            }
            None => self.forwarder.forward(request).await,
        }
    }
}
