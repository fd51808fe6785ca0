//! Credential state for the single active session.
//!
//! The manager is either unauthenticated (no token) or authenticated (a
//! non-empty token for a known server). Every transition writes through to
//! the [`AuthStorage`] first; when the write fails the in-memory state stays
//! as it was, so memory and storage never disagree.

use serde::{Deserialize, Serialize};

use crate::util::path::normalize_server_url;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Invalid credentials (HTTP {status})")]
    InvalidCredentials { status: u16 },

    #[error("No server URL known yet; log in first")]
    NoServer,

    #[error("Token must not be empty")]
    EmptyToken,

    #[error("Credential exchange failed: {0}")]
    Exchange(String),

    #[error("Credential storage failed: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCredentials {
    pub server_url: String,
    pub token: String,
}

/// Where credentials live between sessions.
#[cfg_attr(test, mockall::automock)]
pub trait AuthStorage: Send {
    fn load(&self) -> Result<Option<ServerCredentials>, AuthError>;

    fn save(&self, credentials: &ServerCredentials) -> Result<(), AuthError>;

    fn clear(&self) -> Result<(), AuthError>;
}

/// Trades a username and password for a token.
#[allow(async_fn_in_trait)]
pub trait CredentialExchange {
    async fn exchange_token(&self, username: &str, password: &str) -> Result<String, AuthError>;
}

pub struct AuthManager {
    storage: Box<dyn AuthStorage>,
    server_url: Option<String>,
    credentials: Option<ServerCredentials>,
}

impl AuthManager {
    pub fn new(storage: Box<dyn AuthStorage>) -> Self {
        Self {
            storage,
            server_url: None,
            credentials: None,
        }
    }

    /// A manager that already knows which server it talks to, so a bare
    /// token can be installed without a prior login.
    pub fn for_server(storage: Box<dyn AuthStorage>, server_url: &str) -> Self {
        Self {
            storage,
            server_url: Some(normalize_server_url(server_url)),
            credentials: None,
        }
    }

    pub async fn login<E: CredentialExchange>(
        &mut self,
        exchange: &E,
        server_url: &str,
        username: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        let token = exchange.exchange_token(username, password).await?;
        if token.is_empty() {
            return Err(AuthError::EmptyToken);
        }

        let credentials = ServerCredentials {
            server_url: normalize_server_url(server_url),
            token,
        };
        self.storage.save(&credentials)?;

        log::debug!("[AUTH] Logged in to {}", credentials.server_url);
        self.server_url = Some(credentials.server_url.clone());
        self.credentials = Some(credentials);
        Ok(())
    }

    pub fn set_token(&mut self, token: &str) -> Result<(), AuthError> {
        if token.is_empty() {
            return Err(AuthError::EmptyToken);
        }

        let server_url = self
            .credentials
            .as_ref()
            .map(|c| c.server_url.clone())
            .or_else(|| self.server_url.clone())
            .ok_or(AuthError::NoServer)?;

        let credentials = ServerCredentials {
            server_url,
            token: token.to_string(),
        };
        self.storage.save(&credentials)?;

        self.credentials = Some(credentials);
        Ok(())
    }

    pub fn logout(&mut self) -> Result<(), AuthError> {
        self.storage.clear()?;
        if self.credentials.take().is_some() {
            log::debug!("[AUTH] Logged out");
        }
        Ok(())
    }

    /// Loads stored credentials for the bound server. Returns whether a
    /// session was restored.
    pub fn restore(&mut self) -> Result<bool, AuthError> {
        let stored = match self.storage.load()? {
            Some(stored) if !stored.token.is_empty() => stored,
            _ => return Ok(false),
        };

        let stored_url = normalize_server_url(&stored.server_url);
        if let Some(bound) = &self.server_url {
            if *bound != stored_url {
                log::debug!(
                    "[AUTH] Stored credentials belong to {}, not {}",
                    stored_url,
                    bound
                );
                return Ok(false);
            }
        }

        self.server_url = Some(stored_url.clone());
        self.credentials = Some(ServerCredentials {
            server_url: stored_url,
            token: stored.token,
        });
        Ok(true)
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.credentials
            .as_ref()
            .map(|c| c.token.as_str())
            .filter(|t| !t.is_empty())
    }

    pub fn credentials(&self) -> Option<&ServerCredentials> {
        self.credentials.as_ref()
    }

    pub fn server_url(&self) -> Option<&str> {
        self.server_url.as_deref()
    }
}
