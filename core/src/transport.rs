//! Executing `HttpRequest` values over the network.
//!
//! # Design
//! `Transport` is the I/O seam of the client: `BangumiClient` builds
//! requests and interprets responses, a `Transport` performs the round trip.
//! Status codes come back as data, never as errors, so that the client owns
//! status interpretation. `UreqTransport` is the blocking implementation
//! used in production; tests install their own.
//!
//! A `ureq` call cannot be interrupted, so each attempt runs on its own
//! worker thread while the calling thread waits on a channel and watches the
//! cancellation token. A cancelled attempt is abandoned; its worker finishes
//! (bounded by the agent timeout) and the result is dropped.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;

use ureq::typestate::WithBody;
use ureq::{Agent, Body, Proxy, RequestBuilder};

use crate::cancel::{CancellationToken, POLL_INTERVAL};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub trait Transport: Send + Sync {
    /// Perform one HTTP round trip, trying at most `attempts` times (at least
    /// once) when the transport itself fails.
    fn execute(
        &self,
        request: &HttpRequest,
        attempts: u32,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(
        &self,
        request: &HttpRequest,
        attempts: u32,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, ApiError> {
        (**self).execute(request, attempts, cancel)
    }
}

/// Blocking transport backed by a `ureq` agent.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    /// Agent with the proxy and timeout of `config`.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut builder = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(config.timeout);
        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(Some(Proxy::new(proxy)?));
        }
        Ok(Self {
            agent: builder.build().new_agent(),
        })
    }

    pub fn with_agent(agent: Agent) -> Self {
        Self { agent }
    }

    fn send(&self, request: &HttpRequest, url: &str) -> Result<HttpResponse, ureq::Error> {
        let headers = &request.headers;
        let body = request.body.encode();
        let mut response = match request.method {
            HttpMethod::Get => with_headers(self.agent.get(url), headers).call(),
            HttpMethod::Delete => with_headers(self.agent.delete(url), headers).call(),
            HttpMethod::Post => send_body(with_headers(self.agent.post(url), headers), body),
            HttpMethod::Put => send_body(with_headers(self.agent.put(url), headers), body),
        }?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.body_mut().read_to_string()?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    /// Run one attempt on a worker thread, returning `Cancelled` as soon as
    /// `cancel` fires.
    fn send_cancellable(
        &self,
        request: &HttpRequest,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Result<HttpResponse, ureq::Error>, ApiError> {
        let (tx, rx) = mpsc::channel();
        let worker = self.clone();
        let request = request.clone();
        let url = url.to_string();
        thread::spawn(move || {
            // The receiver is gone when the caller cancelled.
            let _ = tx.send(worker.send(&request, &url));
        });

        loop {
            cancel.check()?;
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(result) => return Ok(result),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Ok(Err(ureq::Error::Io(std::io::Error::other(
                        "transport worker exited without a response",
                    ))));
                }
            }
        }
    }
}

impl Transport for UreqTransport {
    fn execute(
        &self,
        request: &HttpRequest,
        attempts: u32,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, ApiError> {
        let url = request.full_url()?;
        let attempts = attempts.max(1);
        let mut attempt = 1;
        loop {
            cancel.check()?;
            let result = self.send_cancellable(request, url.as_str(), cancel)?;
            // A failure or response that raced with cancellation is dropped.
            cancel.check()?;
            match result {
                Ok(response) => return Ok(response),
                Err(err) if attempt < attempts => {
                    tracing::trace!(attempt, error = %err, url = %url, "retrying request");
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn with_headers<B>(
    mut builder: RequestBuilder<B>,
    headers: &[(String, String)],
) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send_body(
    builder: RequestBuilder<WithBody>,
    body: Option<Vec<u8>>,
) -> Result<ureq::http::Response<Body>, ureq::Error> {
    match body {
        Some(bytes) => builder.send(&bytes[..]),
        None => builder.send_empty(),
    }
}
