use http::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Coarse classification callers branch on when surfacing a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Service unreachable or timed out. Retryable by the user.
    Network,
    /// 401/403: credentials missing, expired or rejected.
    Auth,
    /// 4xx carrying a field-keyed payload.
    Validation,
    Unknown,
}

/// Every failure of a remote call, normalized at the transport boundary.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("could not reach the server: {0}")]
    Network(String),

    #[error("not authorized ({status})")]
    Auth {
        status: StatusCode,
        payload: Option<Value>,
    },

    #[error("request rejected ({status})")]
    Validation { status: StatusCode, payload: Value },

    #[error("request failed ({status})")]
    Unknown {
        status: StatusCode,
        payload: Option<Value>,
    },

    #[error("invalid endpoint path `{0}`")]
    InvalidPath(String),

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl TransportError {
    /// Classify a non-2xx response.
    pub fn from_status(status: StatusCode, payload: Option<Value>) -> Self {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return TransportError::Auth { status, payload };
        }
        match payload {
            Some(payload) if status.is_client_error() && is_field_keyed(&payload) => {
                TransportError::Validation { status, payload }
            }
            payload => TransportError::Unknown { status, payload },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::Network(_) => ErrorKind::Network,
            TransportError::Auth { .. } => ErrorKind::Auth,
            TransportError::Validation { .. } => ErrorKind::Validation,
            TransportError::Unknown { .. }
            | TransportError::InvalidPath(_)
            | TransportError::Decode(_) => ErrorKind::Unknown,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TransportError::Auth { status, .. }
            | TransportError::Validation { status, .. }
            | TransportError::Unknown { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The body the server sent with the failure, if any.
    pub fn server_payload(&self) -> Option<&Value> {
        match self {
            TransportError::Auth { payload, .. } | TransportError::Unknown { payload, .. } => {
                payload.as_ref()
            }
            TransportError::Validation { payload, .. } => Some(payload),
            _ => None,
        }
    }

    /// The server's `detail` (or `error`) message, if it sent one.
    pub fn detail(&self) -> Option<&str> {
        let payload = self.server_payload()?;
        payload
            .get("detail")
            .or_else(|| payload.get("error"))
            .and_then(Value::as_str)
    }

    /// Text suitable for showing a user.
    pub fn describe(&self, fallback: &str) -> String {
        match self {
            TransportError::Network(_) => {
                "Could not reach the server. Check your connection and try again.".to_owned()
            }
            _ => self.detail().unwrap_or(fallback).to_owned(),
        }
    }
}

/// An object keyed by something other than just `detail`.
fn is_field_keyed(payload: &Value) -> bool {
    payload
        .as_object()
        .is_some_and(|fields| fields.keys().any(|k| k != "detail"))
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            TransportError::Decode(e.to_string())
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum LoginError {
    /// Carries the server's `detail` or the generic fallback.
    #[error("{0}")]
    Rejected(String),

    #[error("could not persist the session: {0}")]
    Storage(#[from] StorageError),
}

impl LoginError {
    pub const FALLBACK: &'static str = "Login failed";
}

#[derive(Debug, Error)]
pub enum RegisterError {
    /// Field-keyed payload exactly as the server sent it.
    #[error("registration rejected")]
    Rejected(Value),

    #[error("{0}")]
    Failed(String),
}

impl RegisterError {
    pub const FALLBACK: &'static str = "Registration failed";

    pub fn payload(&self) -> Option<&Value> {
        match self {
            RegisterError::Rejected(v) => Some(v),
            RegisterError::Failed(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("no refresh token is stored")]
    MissingToken,

    /// The session was logged out or replaced before the new token arrived.
    #[error("session ended during token refresh")]
    Superseded,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
