use std::sync::Arc;

use http::{Method, StatusCode};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::storage::{Storage, ACCESS_TOKEN_KEY};

/// Path fragments reachable without a bearer token.
pub const PUBLIC_ENDPOINTS: &[&str] = &["/register/", "/token/", "/token/refresh/"];

/// Whether `path` (relative to the base URL) is on the public allow-list.
pub fn is_public_path(path: &str) -> bool {
    let path = if path.starts_with('/') {
        path.to_owned()
    } else {
        format!("/{path}")
    };
    PUBLIC_ENDPOINTS.iter().any(|fragment| path.contains(fragment))
}

/// A successful (2xx) response. Empty bodies decode as `Value::Null`.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(self) -> Result<T, TransportError> {
        serde_json::from_value(self.body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

/// The single way the core talks to the remote service.
#[derive(Clone)]
pub struct Transport {
    client: Client,
    base: Url,
    storage: Arc<dyn Storage>,
}

impl Transport {
    pub fn new(cfg: &ClientConfig, storage: Arc<dyn Storage>) -> Result<Self, TransportError> {
        let base_url = cfg.normalized_base_url();
        let base =
            Url::parse(&base_url).map_err(|_| TransportError::InvalidPath(base_url.clone()))?;
        let client = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base,
            storage,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve a relative endpoint path (which may carry a query) against the base.
    pub fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|_| TransportError::InvalidPath(path.to_owned()))
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<ApiResponse, TransportError> {
        let url = self.endpoint(path)?;
        self.send(method, url, body).await
    }

    /// Dispatch to an already-resolved URL. The bearer policy is applied here,
    /// so every call the core makes goes through it.
    pub async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<ApiResponse, TransportError> {
        let relative = self.relative_path(&url);
        let token = if is_public_path(&relative) {
            None
        } else {
            self.storage.get(ACCESS_TOKEN_KEY)
        };

        debug!(%method, path = %relative, authenticated = token.is_some(), "dispatching request");

        let mut req = self.client.request(method, url);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        let payload = if text.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str(&text).unwrap_or(Value::String(text)))
        };

        if status.is_success() {
            Ok(ApiResponse {
                status,
                body: payload.unwrap_or(Value::Null),
            })
        } else {
            debug!(%status, path = %relative, "request failed");
            Err(TransportError::from_status(status, payload))
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        self.request(Method::GET, path, None).await?.json()
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<T, TransportError> {
        self.request(Method::POST, path, Some(body)).await?.json()
    }

    fn relative_path(&self, url: &Url) -> String {
        let base = self.base.path();
        let path = url.path();
        match path.strip_prefix(base) {
            Some(rest) => format!("/{rest}"),
            None => path.to_owned(),
        }
    }
}
