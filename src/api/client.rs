//! HTTP transport for the course-management API
//!
//! Performs one request/response cycle per call and hands back the status
//! and parsed body. Business meaning is left to the caller.

use reqwest::{Method, Url};
use serde::Serialize;
use serde_json::Value;

use crate::common::config::ServerConfig;
use crate::common::{Error, Result};

use super::protocol::Token;

/// A single API call, relative to the client's base URL
#[derive(Debug)]
pub struct Request<'a> {
    method: Method,
    path: String,
    query: Vec<(&'static str, String)>,
    body: Option<Value>,
    token: Option<&'a Token>,
}

impl<'a> Request<'a> {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            token: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Append a query parameter (URL-encoded when sent)
    pub fn query(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    /// Attach a JSON body
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Attach a bearer token
    pub fn bearer(mut self, token: &'a Token) -> Self {
        self.token = Some(token);
        self
    }
}

/// Raw outcome of an HTTP call
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    /// Parsed JSON body; `None` when the body was empty or not JSON on an error status
    pub body: Option<Value>,
    /// Body text as received, for diagnostics
    pub raw: String,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Client for the service under test
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client from the server configuration
    pub fn new(config: &ServerConfig) -> Result<Self> {
        Url::parse(&config.base_url).map_err(|_| Error::InvalidUrl(config.base_url.clone()))?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::transport(&config.base_url, e))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, request: &Request<'_>) -> Result<Url> {
        let raw = format!("{}{}", self.base_url, request.path);
        let mut url = Url::parse(&raw).map_err(|_| Error::InvalidUrl(raw.clone()))?;
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Send a request and wait for the response
    ///
    /// Connection failures, timeouts and a non-JSON body on a success status
    /// are errors. A non-JSON body on an error status is returned with
    /// `body: None` so the caller can report the rejection.
    pub async fn send(&self, request: Request<'_>) -> Result<Response> {
        let url = self.url_for(&request)?;
        tracing::debug!(method = %request.method, url = %url, body = ?request.body, "Sending request");

        let mut builder = self.http.request(request.method.clone(), url.clone());
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = request.token {
            builder = builder.bearer_auth(token.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::transport(url.as_str(), e))?;

        let status = response.status().as_u16();
        let raw = response
            .text()
            .await
            .map_err(|e| Error::transport(url.as_str(), e))?;

        tracing::debug!(status, body = %raw, "Received response");

        let body = if raw.trim().is_empty() {
            None
        } else {
            match serde_json::from_str::<Value>(&raw) {
                Ok(value) => Some(value),
                Err(e) if (200..300).contains(&status) => {
                    return Err(Error::decode(format!("response from {}", url), e));
                }
                Err(_) => None,
            }
        };

        Ok(Response { status, body, raw })
    }
}
