//! Blocking client for the bangumi catalog API.
//!
//! # Design
//! Each domain operation is split the same way: a `build_*` method checks
//! the arguments and produces an `HttpRequest` without any I/O, and `send`
//! runs it through the limiter and the `Transport`, then decodes the
//! envelope. The client holds no mutable state apart from the limiter's
//! permit count, so one instance can be shared across threads.

use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::cancel::CancellationToken;
use crate::config::ClientConfig;
use crate::envelope::parse_response;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, RequestBody};
use crate::limiter::ConcurrencyLimiter;
use crate::transport::{Transport, UreqTransport};
use crate::types::{JsonMap, SearchRequest};

/// Client bound to one host, proxy and optional concurrency cap.
pub struct BangumiClient<T = UreqTransport> {
    config: ClientConfig,
    transport: T,
    limiter: Option<ConcurrencyLimiter>,
}

impl BangumiClient<UreqTransport> {
    /// Client for `host`, going through `proxy` unless it is empty.
    pub fn new(caller: &str, host: &str, proxy: &str) -> Result<Self, ApiError> {
        Self::from_config(ClientConfig::new(caller, host, proxy))
    }

    pub fn from_config(config: ClientConfig) -> Result<Self, ApiError> {
        let transport = UreqTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> BangumiClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        let limiter = config.max_concurrency.map(ConcurrencyLimiter::new);
        Self {
            config,
            transport,
            limiter,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn caller(&self) -> &str {
        &self.config.caller
    }

    pub fn limiter(&self) -> Option<&ConcurrencyLimiter> {
        self.limiter.as_ref()
    }

    // --- domain operations ---

    /// Fetch one subject by id. GET /v0/subjects/{subject_id}
    pub fn get_subject(
        &self,
        cancel: &CancellationToken,
        token: Option<&str>,
        subject_id: &str,
    ) -> Result<JsonMap, ApiError> {
        self.ensure_enabled()?;
        let request = self.build_get_subject(token, subject_id)?;
        self.send(cancel, request)
    }

    /// Keyword search. POST /search/subject/{keywords}
    pub fn search_subjects_by_keywords(
        &self,
        cancel: &CancellationToken,
        token: Option<&str>,
        search: &SearchRequest,
    ) -> Result<JsonMap, ApiError> {
        self.ensure_enabled()?;
        let request = self.build_search_subjects(token, search)?;
        self.send(cancel, request)
    }

    pub fn build_get_subject(
        &self,
        token: Option<&str>,
        subject_id: &str,
    ) -> Result<HttpRequest, ApiError> {
        if subject_id.is_empty() {
            return Err(ApiError::MissingField("subject_id"));
        }
        let url = self.endpoint(&format!("/v0/subjects/{subject_id}"))?;
        Ok(self.request(HttpMethod::Get, url, token, Vec::new(), RequestBody::Empty))
    }

    pub fn build_search_subjects(
        &self,
        token: Option<&str>,
        search: &SearchRequest,
    ) -> Result<HttpRequest, ApiError> {
        let query = non_empty(search.to_query()?);
        let url = self.endpoint(&format!("/search/subject/{}", search.keywords))?;
        Ok(self.request(HttpMethod::Post, url, token, query, RequestBody::Empty))
    }

    // --- generic calls ---

    /// GET `path` (relative to the host) with query parameters.
    pub fn get_json<O: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        path: &str,
        token: Option<&str>,
        params: &[(&str, &str)],
    ) -> Result<O, ApiError> {
        self.ensure_enabled()?;
        let query = to_owned_pairs(params);
        let url = self.url_for(path);
        let request = self.request(HttpMethod::Get, url, token, query, RequestBody::Empty);
        self.send(cancel, request)
    }

    /// POST `path` with query parameters and an optional JSON body. Empty
    /// parameter values are not sent.
    pub fn post_json<O: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        cancel: &CancellationToken,
        path: &str,
        token: Option<&str>,
        params: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<O, ApiError> {
        self.ensure_enabled()?;
        let body = match body {
            Some(body) => RequestBody::Json(serde_json::to_vec(body)?),
            None => RequestBody::Empty,
        };
        let query = non_empty(to_owned_pairs(params));
        let request = self.request(HttpMethod::Post, self.url_for(path), token, query, body);
        self.send(cancel, request)
    }

    /// POST `path` with an `application/x-www-form-urlencoded` body.
    pub fn post_form<O: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        path: &str,
        token: Option<&str>,
        form: &[(&str, &str)],
    ) -> Result<O, ApiError> {
        self.ensure_enabled()?;
        let body = RequestBody::Form(to_owned_pairs(form));
        let url = self.url_for(path);
        let request = self.request(HttpMethod::Post, url, token, Vec::new(), body);
        self.send(cancel, request)
    }

    /// Execute a built request and decode its payload.
    ///
    /// Holds a limiter slot for the duration of the transport call only.
    pub fn send<O: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        request: HttpRequest,
    ) -> Result<O, ApiError> {
        self.ensure_enabled()?;
        cancel.check()?;

        let permit = match &self.limiter {
            Some(limiter) => Some(limiter.acquire(cancel)?),
            None => None,
        };
        let started = Instant::now();
        let response = self
            .transport
            .execute(&request, self.config.attempts, cancel)?;
        drop(permit);

        tracing::debug!(
            caller = %self.config.caller,
            method = request.method.as_str(),
            url = %request.url,
            status = response.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "bangumi request finished"
        );
        parse_response(response)
    }

    fn ensure_enabled(&self) -> Result<(), ApiError> {
        if self.config.skip {
            return Err(ApiError::Disabled);
        }
        Ok(())
    }

    fn request(
        &self,
        method: HttpMethod,
        url: String,
        token: Option<&str>,
        query: Vec<(String, String)>,
        body: RequestBody,
    ) -> HttpRequest {
        let mut headers = vec![
            ("Content-Type".to_string(), body.content_type().to_string()),
            ("User-Agent".to_string(), self.config.user_agent.clone()),
        ];
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        HttpRequest {
            method,
            url,
            query,
            headers,
            body,
        }
    }

    /// Host URL followed by `path` as given. Parsing escapes only what a URL
    /// cannot hold (spaces, non-ASCII); `/` in `path` stays a separator.
    fn endpoint(&self, path: &str) -> Result<String, ApiError> {
        let url = self.url_for(path);
        match Url::parse(&url) {
            Ok(parsed) => Ok(parsed.into()),
            Err(e) => Err(ApiError::InvalidUrl {
                url,
                reason: e.to_string(),
            }),
        }
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url(), path)
    }
}

fn to_owned_pairs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn non_empty(pairs: Vec<(String, String)>) -> Vec<(String, String)> {
    pairs.into_iter().filter(|(_, v)| !v.is_empty()).collect()
}
