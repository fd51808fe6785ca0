//! The single live session and its last-error slot.
//!
//! Every entry point takes the process-wide lock for the whole call, so
//! callers are serialized and `destroy_client` waits for whatever is in
//! flight. Each call except [`get_last_error`] overwrites the slot: success
//! clears it, failure stores the error text.

use serde::Serialize;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use tokio::runtime::{Builder, Handle, Runtime};

use super::BoundaryError;
use crate::api::client::FilebrowserClient;
use crate::auth::{AuthStorage, FileAuthStorage};
use crate::config::settings::Config;
use crate::util::path::normalize_server_url;

pub const NOT_INITIALIZED: &str = "Client not initialized. Call createClient() first.";

// Field order matters: the client drops before the runtime it was built on.
struct Session {
    client: FilebrowserClient,
    runtime: Runtime,
}

impl Session {
    // Never blocks, so a host may tear down from any thread.
    fn shutdown(self) {
        let Session { mut client, runtime } = self;
        client.close();
        drop(client);
        runtime.shutdown_background();
    }
}

struct Bridge {
    session: Option<Session>,
    last_error: Option<String>,
}

impl Bridge {
    fn record<T>(&mut self, result: Result<T, BoundaryError>) -> Option<T> {
        match result {
            Ok(value) => {
                self.last_error = None;
                Some(value)
            }
            Err(e) => {
                log::warn!("[BOUNDARY] {}", e);
                self.last_error = Some(e.to_string());
                None
            }
        }
    }
}

static BRIDGE: Mutex<Bridge> = Mutex::new(Bridge {
    session: None,
    last_error: None,
});

fn lock() -> MutexGuard<'static, Bridge> {
    BRIDGE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn with_session<T>(
    op: impl FnOnce(&mut FilebrowserClient, &Runtime) -> Result<T, BoundaryError>,
) -> Option<T> {
    let mut bridge = lock();
    let result = match bridge.session.as_mut() {
        Some(Session { client, runtime }) => op(client, runtime),
        None => Err(BoundaryError::NotInitialized),
    };
    bridge.record(result)
}

/// Runs `future` on the session runtime. A thread that already drives a
/// Tokio runtime cannot block on another one, so that case is an error.
fn block_on<F: Future>(runtime: &Runtime, future: F) -> Result<F::Output, BoundaryError> {
    if Handle::try_current().is_ok() {
        return Err(BoundaryError::NestedRuntime);
    }
    Ok(runtime.block_on(future))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, BoundaryError> {
    Ok(serde_json::to_string(value)?)
}

/// Stores `error` as the latest failure without touching the session.
pub(crate) fn reject(error: BoundaryError) {
    lock().record::<()>(Err(error));
}

/// Builds the live client for `base_url`, replacing any previous one.
/// Configuration comes from the config file and credentials persist in the
/// configured auth file.
pub fn create_client(base_url: &str) {
    let config = Config::load_or_default();
    let storage = config
        .auth_file_path()
        .map(|path| Box::new(FileAuthStorage::new(path)) as Box<dyn AuthStorage>);

    match storage {
        Ok(storage) => create_client_with(base_url, config, storage),
        Err(e) => {
            let mut bridge = lock();
            if let Some(previous) = bridge.session.take() {
                previous.shutdown();
            }
            bridge.record::<()>(Err(e.into()));
        }
    }
}

pub fn create_client_with(base_url: &str, config: Config, storage: Box<dyn AuthStorage>) {
    let mut bridge = lock();
    if let Some(previous) = bridge.session.take() {
        previous.shutdown();
    }

    let result = open_session(base_url, &config, storage);
    if let Some(session) = bridge.record(result) {
        log::debug!("[BOUNDARY] Client created for {}", session.client.base_url());
        bridge.session = Some(session);
    }
}

fn open_session(
    base_url: &str,
    config: &Config,
    storage: Box<dyn AuthStorage>,
) -> Result<Session, BoundaryError> {
    let base_url = normalize_server_url(base_url);
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(BoundaryError::InvalidArgument(format!(
            "base URL must start with http:// or https://, got `{}`",
            base_url
        )));
    }

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(BoundaryError::Runtime)?;

    let client = {
        let _guard = runtime.enter();
        FilebrowserClient::new(&base_url, config, storage)?
    };

    Ok(Session { client, runtime })
}

/// Tears down the live client. Safe to call when there is none.
pub fn destroy_client() {
    let mut bridge = lock();
    if let Some(session) = bridge.session.take() {
        session.shutdown();
        log::debug!("[BOUNDARY] Client destroyed");
    }
    bridge.last_error = None;
}

/// Creation failed before a URL was even read: drop the old client but
/// record `error` instead of clearing the slot.
pub(crate) fn discard_session(error: BoundaryError) {
    let mut bridge = lock();
    if let Some(session) = bridge.session.take() {
        session.shutdown();
    }
    bridge.record::<()>(Err(error));
}

/// The most recent failure message. Reading it leaves the slot unchanged.
pub fn get_last_error() -> Option<String> {
    lock().last_error.clone()
}

/// Logs in and returns the stored credentials as JSON.
pub fn login(username: &str, password: &str) -> Option<String> {
    with_session(|client, runtime| {
        let credentials = block_on(runtime, client.login(username, password))??;
        to_json(&credentials)
    })
}

pub fn set_token(token: &str) -> bool {
    with_session(|client, _| Ok(client.set_token(token)?)).is_some()
}

pub fn logout() -> bool {
    with_session(|client, _| Ok(client.logout()?)).is_some()
}

/// `false` without a token is an answer, not a failure; the slot only
/// holds an error when there is no client to ask.
pub fn is_authenticated() -> bool {
    with_session(|client, _| Ok(client.is_authenticated())).unwrap_or(false)
}

/// Picks up credentials stored by an earlier session for the same server.
pub fn restore_session() -> bool {
    with_session(|client, _| Ok(client.restore_session()?)).unwrap_or(false)
}

pub fn get_resource(path: &str) -> Option<String> {
    with_session(|client, runtime| {
        let resource = block_on(runtime, client.get_resource(path))??;
        to_json(&resource)
    })
}

pub fn list_directory(path: &str) -> Option<String> {
    with_session(|client, runtime| {
        let listing = block_on(runtime, client.list_directory(path))??;
        to_json(&listing)
    })
}

pub fn search(query: &str, path: &str) -> Option<String> {
    with_session(|client, runtime| {
        let results = block_on(runtime, client.search(query, path))??;
        to_json(&results)
    })
}

pub fn download_to_file(remote_path: &str, local_path: &str) -> bool {
    with_session(|client, runtime| {
        Ok(block_on(runtime, client.download(remote_path, local_path))??)
    })
    .is_some()
}

pub fn upload_from_file(remote_path: &str, local_path: &str, overwrite: bool) -> bool {
    with_session(|client, runtime| {
        Ok(block_on(runtime, client.upload(remote_path, local_path, overwrite))??)
    })
    .is_some()
}

pub fn create_directory(path: &str) -> bool {
    with_session(|client, runtime| Ok(block_on(runtime, client.create_directory(path))??)).is_some()
}

pub fn delete(path: &str) -> bool {
    with_session(|client, runtime| Ok(block_on(runtime, client.delete(path))??)).is_some()
}

pub fn rename(source: &str, destination: &str, overwrite: bool) -> bool {
    with_session(|client, runtime| {
        Ok(block_on(runtime, client.rename(source, destination, overwrite))??)
    })
    .is_some()
}

pub fn copy(source: &str, destination: &str, overwrite: bool) -> bool {
    with_session(|client, runtime| {
        Ok(block_on(runtime, client.copy(source, destination, overwrite))??)
    })
    .is_some()
}

/// Directory completions for a partial remote path, as a JSON array.
pub fn completions(partial_path: &str) -> Option<String> {
    with_session(|client, runtime| {
        let matches = block_on(runtime, client.completions(partial_path))??;
        to_json(&matches)
    })
}
