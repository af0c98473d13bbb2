//! HTTP transport for the CalDAV and webcal backends.
//!
//! Requests go out unauthenticated first. On `401` the challenge decides
//! between Digest and Basic and the request is retried once.

use reqwest::{Client, Method, Response, StatusCode};
use tracing::{debug, trace, warn};

use crate::error::{SourceError, SourceResult};

use super::auth::{DigestChallenge, basic_auth};
use super::config::DavConfig;

/// HTTP client bound to one [`DavConfig`].
pub struct DavHttpClient {
    client: Client,
    config: DavConfig,
    /// Kept across requests so later ones can answer the same challenge.
    digest: Option<DigestChallenge>,
}

impl DavHttpClient {
    /// Builds the underlying HTTP client.
    pub fn new(config: DavConfig) -> SourceResult<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                SourceError::connection(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            config,
            digest: None,
        })
    }

    /// The configured URL.
    pub fn url(&self) -> &str {
        self.config.url_str()
    }

    /// Sends a `REPORT` with `Depth: 1` to the configured URL.
    pub async fn report(&mut self, body: &str) -> SourceResult<String> {
        self.request("REPORT", Some(body), Some(1)).await
    }

    /// Sends a `GET` to the configured URL.
    pub async fn get(&mut self) -> SourceResult<String> {
        self.request("GET", None, None).await
    }

    async fn request(
        &mut self,
        method: &str,
        body: Option<&str>,
        depth: Option<u8>,
    ) -> SourceResult<String> {
        let authorization = self.authorization(method);
        let response = self.send(method, body, depth, authorization).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return handle_response(response).await;
        }

        let challenge = response
            .headers()
            .get(reqwest::header::WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let Some(challenge) = challenge else {
            return Err(SourceError::authentication(
                "server rejected the request without an authentication challenge",
            ));
        };
        if !self.config.has_credentials() {
            return Err(SourceError::authentication(
                "server requires authentication but no credentials are configured",
            ));
        }

        debug!(url = %self.url(), "Received 401, retrying with credentials");
        if let Some(digest) = DigestChallenge::parse(&challenge) {
            self.digest = Some(digest);
        } else if !challenge.starts_with("Basic") {
            return Err(SourceError::authentication(format!(
                "unsupported authentication scheme: {}",
                challenge
            )));
        }

        let authorization = self
            .authorization(method)
            .or_else(|| self.basic_authorization());
        let response = self.send(method, body, depth, authorization).await?;
        handle_response(response).await
    }

    /// The header for an already negotiated Digest session, if any.
    fn authorization(&mut self, method: &str) -> Option<String> {
        let username = self.config.username.as_deref()?;
        let password = self.config.password.as_deref()?;
        let uri = self.config.url.path();
        self.digest
            .as_mut()
            .map(|digest| digest.respond(method, uri, username, password))
    }

    fn basic_authorization(&self) -> Option<String> {
        Some(basic_auth(
            self.config.username.as_deref()?,
            self.config.password.as_deref()?,
        ))
    }

    async fn send(
        &self,
        method: &str,
        body: Option<&str>,
        depth: Option<u8>,
        authorization: Option<String>,
    ) -> SourceResult<Response> {
        let http_method = Method::from_bytes(method.as_bytes())
            .map_err(|_| SourceError::internal(format!("invalid HTTP method: {}", method)))?;

        let mut request = self.client.request(http_method, self.config.url.clone());
        if let Some(d) = depth {
            request = request.header("Depth", d.to_string());
        }
        if let Some(value) = authorization {
            request = request.header(reqwest::header::AUTHORIZATION, value);
        }
        if let Some(b) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/xml; charset=utf-8")
                .body(b.to_string());
        }

        trace!(method, url = %self.url(), "Sending request");
        request.send().await.map_err(|e| {
            let message = format!("{} {} failed", method, self.url());
            if e.is_timeout() {
                SourceError::timeout(message).with_cause(e)
            } else {
                SourceError::connection(message).with_cause(e)
            }
        })
    }
}

async fn handle_response(response: Response) -> SourceResult<String> {
    let status = response.status();
    trace!(status = %status, "Received response");

    match status {
        StatusCode::OK | StatusCode::MULTI_STATUS => response.text().await.map_err(|e| {
            SourceError::connection(format!("failed to read response: {}", e))
        }),
        StatusCode::UNAUTHORIZED => Err(SourceError::authentication(
            "authentication failed: invalid credentials",
        )),
        StatusCode::FORBIDDEN => Err(SourceError::authorization("access denied to calendar")),
        StatusCode::NOT_FOUND => Err(SourceError::not_found("calendar not found")),
        s if s.is_server_error() => {
            let body = response.text().await.unwrap_or_default();
            Err(SourceError::server(format!("server error ({}): {}", s, body)))
        }
        s => {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %s, body = %body, "Unexpected response status");
            Err(SourceError::invalid_response(format!(
                "unexpected status {}",
                s
            )))
        }
    }
}
