use anyhow::{anyhow, bail, Result};
use filebridge::auth::{FileAuthStorage, MemoryAuthStorage};
use filebridge::boundary::adapter;
use filebridge::config::settings::Config;
use serde::de::DeserializeOwned;

/// Server and token given on the command line, if any.
pub struct Target {
    pub server: Option<String>,
    pub token: Option<String>,
}

impl Target {
    /// Picks the server from the flag, the config file or the last login,
    /// in that order.
    pub fn server_url(&self, config: &Config, storage: &FileAuthStorage) -> Result<String> {
        if let Some(server) = self.server.clone().or_else(|| config.server_url.clone()) {
            return Ok(server);
        }

        storage.default_server()?.ok_or_else(|| {
            anyhow!("No server given. Pass --server, set server_url with `filebridge config`, or log in first.")
        })
    }
}

/// Creates the boundary client for the chosen server and installs a token:
/// the `--token` one for this run only, otherwise the stored one if any.
/// Returns the server URL.
pub fn open(target: &Target) -> Result<String> {
    let config = Config::load_or_default();
    let storage = FileAuthStorage::new(config.auth_file_path()?);
    let server = target.server_url(&config, &storage)?;

    match &target.token {
        Some(token) => {
            adapter::create_client_with(&server, config, Box::new(MemoryAuthStorage::default()));
            created()?;
            check(adapter::set_token(token))?;
        }
        None => {
            adapter::create_client(&server);
            created()?;
            if !adapter::restore_session() {
                if let Some(e) = adapter::get_last_error() {
                    bail!(e);
                }
                log::debug!("[SESSION] No stored token for {}", server);
            }
        }
    }
    Ok(server)
}

/// Like [`open`] but fails early when there is no token to use.
pub fn open_authenticated(target: &Target) -> Result<String> {
    let server = open(target)?;
    if !adapter::is_authenticated() {
        bail!("Not logged in to {}. Run `filebridge login` first.", server);
    }
    Ok(server)
}

/// Turns a boolean boundary result into the recorded error.
pub fn check(ok: bool) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(last_error())
    }
}

/// Decodes a JSON boundary result, or returns the recorded error.
pub fn decode<T: DeserializeOwned>(json: Option<String>) -> Result<T> {
    let json = json.ok_or_else(last_error)?;
    Ok(serde_json::from_str(&json)?)
}

fn created() -> Result<()> {
    match adapter::get_last_error() {
        Some(e) => Err(anyhow!(e)),
        None => Ok(()),
    }
}

fn last_error() -> anyhow::Error {
    anyhow!(adapter::get_last_error().unwrap_or_else(|| "Unknown error".to_string()))
}
