use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::error::{
    ErrorKind, LoginError, RefreshError, RegisterError, StorageError, TransportError,
};
use crate::storage::{
    Storage, Token, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, SESSION_KEYS, USERNAME_KEY,
};
use crate::transport::Transport;

const TOKEN: &str = "token/";
const TOKEN_REFRESH: &str = "token/refresh/";
const REGISTER: &str = "register/";

/// Who is signed in. Replaced wholesale on each login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Persisted state has not been read yet. Access decisions must wait.
    Bootstrapping,
    Anonymous,
    Authenticated(Identity),
}

#[derive(Deserialize)]
struct TokenPair {
    access: String,
    refresh: String,
}

#[derive(Deserialize)]
struct RefreshedToken {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

/// Invariant: `access` is present exactly when `identity` is.
#[derive(Default)]
struct Session {
    identity: Option<Identity>,
    access: Option<Token>,
    refresh: Option<Token>,
    bootstrapped: bool,
}

/// Owns the authenticated-identity lifecycle and is the sole writer of the
/// persisted session keys.
pub struct SessionManager {
    transport: Transport,
    storage: Arc<dyn Storage>,
    session: RwLock<Session>,
}

impl SessionManager {
    pub fn new(transport: Transport, storage: Arc<dyn Storage>) -> Self {
        Self {
            transport,
            storage,
            session: RwLock::new(Session::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> SessionState {
        let session = self.read();
        if !session.bootstrapped {
            return SessionState::Bootstrapping;
        }
        match &session.identity {
            Some(identity) => SessionState::Authenticated(identity.clone()),
            None => SessionState::Anonymous,
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        self.read().identity.clone()
    }

    pub fn access_token(&self) -> Option<Token> {
        self.read().access.clone()
    }

    pub fn is_bootstrapping(&self) -> bool {
        !self.read().bootstrapped
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().identity.is_some()
    }

    /// Adopt whatever session storage holds. A stored access token is trusted
    /// until a later call rejects it; no request is made. Runs once; later
    /// calls return the current state.
    pub fn bootstrap(&self) -> SessionState {
        {
            let mut session = self.write();
            if !session.bootstrapped {
                if let Some(access) = self.storage.get(ACCESS_TOKEN_KEY) {
                    let username = self.storage.get(USERNAME_KEY).unwrap_or_default();
                    session.identity = Some(Identity { username });
                    session.access = Some(Token::new(access));
                    session.refresh = self.storage.get(REFRESH_TOKEN_KEY).map(Token::new);
                }
                session.bootstrapped = true;
            }
        }
        let state = self.state();
        info!(
            authenticated = matches!(state, SessionState::Authenticated(_)),
            "session bootstrapped"
        );
        state
    }

    /// Exchange credentials for a token pair and persist it.
    ///
    /// A rejected login leaves the session exactly as it was. No retry.
    pub async fn login(&self, username: &str, password: &str) -> Result<Identity, LoginError> {
        let body = json!({ "username": username, "password": password });
        let pair: TokenPair = self.transport.post(TOKEN, &body).await.map_err(|e| {
            info!(username, error = %e, "login rejected");
            LoginError::Rejected(e.detail().unwrap_or(LoginError::FALLBACK).to_owned())
        })?;

        let identity = Identity {
            username: username.to_owned(),
        };
        {
            // Storage and memory change under one lock so a concurrent logout
            // cannot interleave with the writes.
            let mut session = self.write();
            if let Err(e) = self.persist(&pair.access, &pair.refresh, username) {
                // A half-written session must not survive to the next bootstrap.
                self.clear_storage();
                *session = Session {
                    bootstrapped: true,
                    ..Session::default()
                };
                return Err(e.into());
            }
            session.identity = Some(identity.clone());
            session.access = Some(Token::new(pair.access));
            session.refresh = Some(Token::new(pair.refresh));
            session.bootstrapped = true;
        }
        info!(username, "logged in");
        Ok(identity)
    }

    fn persist(&self, access: &str, refresh: &str, username: &str) -> Result<(), StorageError> {
        self.storage.set(ACCESS_TOKEN_KEY, access)?;
        self.storage.set(REFRESH_TOKEN_KEY, refresh)?;
        self.storage.set(USERNAME_KEY, username)?;
        Ok(())
    }

    /// Create an account. The session is not touched; the user still has to log in.
    pub async fn register<T: Serialize>(&self, user: &T) -> Result<(), RegisterError> {
        let body = serde_json::to_value(user)
            .map_err(|_| RegisterError::Failed(RegisterError::FALLBACK.to_owned()))?;
        match self.transport.request(http::Method::POST, REGISTER, Some(&body)).await {
            Ok(_) => {
                info!("account registered");
                Ok(())
            }
            Err(e) => {
                info!(error = %e, "registration rejected");
                Err(match e.server_payload() {
                    Some(payload) => RegisterError::Rejected(payload.clone()),
                    None => RegisterError::Failed(RegisterError::FALLBACK.to_owned()),
                })
            }
        }
    }

    /// Forget the session everywhere. Never fails; storage errors are logged.
    pub fn logout(&self) {
        {
            let mut session = self.write();
            self.clear_storage();
            *session = Session {
                bootstrapped: true,
                ..Session::default()
            };
        }
        info!("logged out");
    }

    fn clear_storage(&self) {
        for key in SESSION_KEYS {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "failed to clear persisted session key");
            }
        }
    }

    /// Trade the refresh token for a new access token. Only ever called
    /// explicitly; a 401 elsewhere does not trigger it.
    pub async fn refresh_access_token(&self) -> Result<(), RefreshError> {
        let refresh = self
            .read()
            .refresh
            .as_ref()
            .map(|t| t.expose().to_owned())
            .ok_or(RefreshError::MissingToken)?;

        let body = json!({ "refresh": &refresh });
        let fresh: RefreshedToken = self.transport.post(TOKEN_REFRESH, &body).await?;

        // The session may have ended or been replaced while the request was out.
        let mut session = self.write();
        let current = session.refresh.as_ref().map(Token::expose);
        if session.identity.is_none() || current != Some(refresh.as_str()) {
            info!("session changed during token refresh, discarding new token");
            return Err(RefreshError::Superseded);
        }

        self.storage.set(ACCESS_TOKEN_KEY, &fresh.access)?;
        if let Some(rotated) = &fresh.refresh {
            self.storage.set(REFRESH_TOKEN_KEY, rotated)?;
        }
        session.access = Some(Token::new(fresh.access));
        if let Some(rotated) = fresh.refresh {
            session.refresh = Some(Token::new(rotated));
        }
        drop(session);

        info!("access token refreshed");
        Ok(())
    }

    /// Drop the session if `err` says the credentials are no longer accepted.
    /// Returns whether the session was cleared.
    pub fn handle_auth_failure(&self, err: &TransportError) -> bool {
        if err.kind() != ErrorKind::Auth || !self.is_authenticated() {
            return false;
        }
        warn!(status = ?err.status(), "session rejected by server, clearing");
        self.logout();
        true
    }
}
