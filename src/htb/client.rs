//! `reqwest` implementation of [`Backend`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{redirect, Client, Method, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::htb::error::{BackendError, BackendResult};
use crate::htb::Backend;
use crate::mcp::protocol::{SERVER_NAME, SERVER_VERSION};

/// Path probed by [`Backend::health_check`].
const HEALTH_CHECK_PATH: &str = "/user/info";

/// Authenticated client for the HackTheBox labs API.
#[derive(Debug, Clone)]
pub struct HtbClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl HtbClient {
    /// Creates a client for `base_url` authenticating with `token`.
    ///
    /// Redirects are not followed: the API answers expired tokens with a
    /// redirect to the login page, which is reported as
    /// [`BackendError::InvalidToken`].
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be used as a header value or the
    /// underlying HTTP client cannot be built.
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> BackendResult<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            BackendError::Configuration("token contains invalid header characters".to_string())
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(format!("{SERVER_NAME}/{SERVER_VERSION}"))
            .default_headers(headers)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(BackendError::Http)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Creates a client from the loaded configuration.
    ///
    /// # Errors
    ///
    /// See [`HtbClient::new`].
    pub fn from_config(config: &Config) -> BackendResult<Self> {
        Self::new(&config.htb_base_url, &config.htb_token, config.request_timeout)
    }

    /// Builds the absolute URL for an API path.
    fn endpoint(&self, path: &str) -> BackendResult<Url> {
        Ok(Url::parse(&format!("{}{path}", self.base_url))?)
    }

    fn classify(&self, error: reqwest::Error) -> BackendError {
        if error.is_timeout() {
            BackendError::Timeout(self.timeout)
        } else {
            BackendError::Http(error)
        }
    }

    /// Sends a request and screens out authentication failures.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> BackendResult<Response> {
        let url = self.endpoint(path)?;
        debug!(method = %method, path, "HTB API request");

        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();

        if status.is_redirection() && response.headers().contains_key(header::LOCATION) {
            warn!(status = status.as_u16(), path, "HTB API redirected, token rejected");
            return Err(BackendError::InvalidToken);
        }

        if status == StatusCode::UNAUTHORIZED {
            warn!(path, "HTB API rejected token");
            return Err(BackendError::Unauthorized);
        }

        Ok(response)
    }
}

#[async_trait]
impl Backend for HtbClient {
    async fn authenticated_request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> BackendResult<Value> {
        let response = self.send(method, path, body).await?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes);
            return Err(BackendError::from_response(status.as_u16(), &body));
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn health_check(&self) -> BackendResult<()> {
        let response = self.send(Method::GET, HEALTH_CHECK_PATH, None).await?;
        let status = response.status();

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::from_response(status.as_u16(), &body));
        }

        Ok(())
    }
}
