//! Executes `HttpRequest`s against the network.
//!
//! # Design
//! `Transport` is the only I/O seam of the crate. `UreqTransport` is the
//! blocking implementation used in production; tests substitute recording
//! stubs. ureq is configured not to treat 4xx/5xx as errors, so every HTTP
//! answer comes back as data and status interpretation stays in
//! `RestClient`. Only failures below HTTP become `ApiError::Network`.

use std::time::Duration;

use tracing::debug;
use ureq::{Agent, RequestBuilder};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Runs one HTTP round-trip.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by a shared `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
    max_body_bytes: u64,
}

impl UreqTransport {
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_limits(config.timeout, config.max_download_bytes)
    }

    pub fn with_limits(timeout: Duration, max_body_bytes: u64) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent, max_body_bytes }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let result = match (request.method, &request.body) {
            (HttpMethod::Get, _) => with_headers(self.agent.get(&request.url), &request.headers).call(),
            (HttpMethod::Post, Some(body)) => {
                with_headers(self.agent.post(&request.url), &request.headers).send(body.as_bytes())
            }
            (HttpMethod::Post, None) => with_headers(self.agent.post(&request.url), &request.headers).send_empty(),
        };
        let mut response = result.map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        debug!(method = ?request.method, url = %request.url, status, "request finished");

        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(self.max_body_bytes)
            .read_to_vec()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(HttpResponse { status, headers, body })
    }
}

fn with_headers<B>(mut builder: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}
