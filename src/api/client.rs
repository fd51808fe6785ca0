use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio_util::io::ReaderStream;

use crate::api::models::*;
use crate::auth::{AuthError, AuthManager, AuthStorage, CredentialExchange, ServerCredentials};
use crate::config::settings::Config;
use crate::util::path::{
    encode_url_path, get_file_name, get_parent_path, join_path, normalize_remote_path,
    normalize_server_url,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Not authenticated. Call login() or setToken() first.")]
    Unauthenticated,

    #[error("File not found: {path}")]
    NotFound { path: String },

    #[error("Not a directory: {path}")]
    NotADirectory { path: String },

    #[error("Conflict: {path} already exists")]
    Conflict { path: String },

    #[error("Client is closed")]
    Closed,

    #[error("Unexpected server response (HTTP {status}){}", describe_body(.body))]
    Transport { status: u16, body: Option<String> },

    #[error(transparent)]
    Filebrowser(#[from] FilebrowserException),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Local file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid response payload: {0}")]
    Decode(#[from] serde_json::Error),
}

fn describe_body(body: &Option<String>) -> String {
    match body {
        Some(text) => format!(": {}", text),
        None => String::new(),
    }
}

/// The HTTP side of a session. Dropping it releases the connection pool.
struct Transport {
    base_url: String,
    http: reqwest::Client,
}

impl Transport {
    fn url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }
}

impl CredentialExchange for Transport {
    async fn exchange_token(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let request = LoginRequest {
            username,
            password,
            recaptcha: "",
        };

        let response = self
            .http
            .post(self.url("/api/login"))
            .json(&request)
            .send()
            .await
            .map_err(|e| AuthError::Exchange(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("[LOGIN] Rejected by server: HTTP {}", status.as_u16());
            return Err(match status.as_u16() {
                400 | 401 | 403 => AuthError::InvalidCredentials {
                    status: status.as_u16(),
                },
                code => {
                    let body = response.text().await.unwrap_or_default();
                    AuthError::Exchange(format!("HTTP {}{}", code, describe_body(&non_empty(body))))
                }
            });
        }

        let token = response
            .text()
            .await
            .map_err(|e| AuthError::Exchange(e.to_string()))?;
        Ok(token.trim().to_string())
    }
}

/// A session against one Filebrowser server.
///
/// Every resource operation needs a token (from [`login`](Self::login),
/// [`set_token`](Self::set_token) or [`restore_session`](Self::restore_session))
/// and fails with [`ClientError::Unauthenticated`] before touching the
/// network otherwise. After [`close`](Self::close) everything fails with
/// [`ClientError::Closed`].
pub struct FilebrowserClient {
    base_url: String,
    transport: Option<Transport>,
    auth: AuthManager,
}

impl FilebrowserClient {
    pub fn new(
        base_url: &str,
        config: &Config,
        storage: Box<dyn AuthStorage>,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self::with_http_client(base_url, http, storage))
    }

    pub fn with_http_client(
        base_url: &str,
        http: reqwest::Client,
        storage: Box<dyn AuthStorage>,
    ) -> Self {
        let base_url = normalize_server_url(base_url);
        Self {
            auth: AuthManager::for_server(storage, &base_url),
            transport: Some(Transport {
                base_url: base_url.clone(),
                http,
            }),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<ServerCredentials, ClientError> {
        let transport = self.transport.as_ref().ok_or(ClientError::Closed)?;
        self.auth
            .login(transport, &self.base_url, username, password)
            .await?;

        self.auth
            .credentials()
            .cloned()
            .ok_or(ClientError::Unauthenticated)
    }

    pub fn set_token(&mut self, token: &str) -> Result<(), ClientError> {
        Ok(self.auth.set_token(token)?)
    }

    pub fn logout(&mut self) -> Result<(), ClientError> {
        Ok(self.auth.logout()?)
    }

    pub fn restore_session(&mut self) -> Result<bool, ClientError> {
        Ok(self.auth.restore()?)
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated()
    }

    pub fn credentials(&self) -> Option<&ServerCredentials> {
        self.auth.credentials()
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_none()
    }

    pub async fn get_resource(&self, path: &str) -> Result<Resource, ClientError> {
        let path = normalize_remote_path(path);
        let route = format!("/api/resources{}", encode_url_path(&path));

        let mut resource: Resource = self.get_json(&route, &path).await?;
        resource.normalize_listing();
        Ok(resource)
    }

    pub async fn list_directory(&self, path: &str) -> Result<Resource, ClientError> {
        let resource = self.get_resource(path).await?;
        if !resource.is_dir {
            return Err(ClientError::NotADirectory {
                path: normalize_remote_path(path),
            });
        }
        Ok(resource)
    }

    pub async fn search(&self, query: &str, path: &str) -> Result<Vec<SearchResult>, ClientError> {
        let path = normalize_remote_path(path);
        let route = format!("/api/search{}", encode_url_path(&path));

        let response = self
            .request(Method::GET, &route)?
            .query(&[("query", query)])
            .send()
            .await?;
        let body = Self::check(response, &path).await?.text().await?;

        parse_search_results(&body)
    }

    /// Completes a partial remote path against its parent directory.
    /// Directories come back with a trailing `/`.
    pub async fn completions(&self, partial_path: &str) -> Result<Vec<String>, ClientError> {
        let normalized = normalize_remote_path(partial_path);
        let (parent, prefix) = if normalized.ends_with('/') {
            (normalized.trim_end_matches('/').to_string(), String::new())
        } else {
            (
                get_parent_path(&normalized),
                get_file_name(&normalized).to_lowercase(),
            )
        };

        let listing = self.list_directory(&parent).await?;
        let mut matches: Vec<String> = listing
            .children()
            .iter()
            .filter(|item| item.name.to_lowercase().starts_with(&prefix))
            .map(|item| {
                let path = join_path(&parent, &item.name);
                if item.is_dir {
                    format!("{}/", path)
                } else {
                    path
                }
            })
            .collect();
        matches.sort();
        Ok(matches)
    }

    /// Streams a remote file into `local_path`. The data lands in a temporary
    /// file next to the target and only replaces it once the body is complete.
    pub async fn download(
        &self,
        remote_path: &str,
        local_path: impl AsRef<Path>,
    ) -> Result<(), ClientError> {
        let remote_path = normalize_remote_path(remote_path);
        let local_path = local_path.as_ref();
        let route = format!("/api/raw{}", encode_url_path(&remote_path));

        let response = self.request(Method::GET, &route)?.send().await?;
        let response = Self::check(response, &remote_path).await?;

        let dir = match local_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut sink = tempfile::NamedTempFile::new_in(&dir)?;

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    log::warn!(
                        "[DOWNLOAD] Transfer of {} aborted after {} bytes: {}",
                        remote_path,
                        written,
                        e
                    );
                    return Err(ClientError::Http(e));
                }
            };
            sink.write_all(&chunk)?;
            written += chunk.len() as u64;
        }

        sink.as_file().sync_all()?;
        sink.persist(local_path).map_err(|e| ClientError::Io(e.error))?;

        log::debug!(
            "[DOWNLOAD] {} -> {} ({} bytes)",
            remote_path,
            local_path.display(),
            written
        );
        Ok(())
    }

    /// Streams a local file to `remote_path`. Without `overwrite` an existing
    /// remote file is reported as [`ClientError::Conflict`] before any data is
    /// sent.
    pub async fn upload(
        &self,
        remote_path: &str,
        local_path: impl AsRef<Path>,
        overwrite: bool,
    ) -> Result<(), ClientError> {
        let remote_path = normalize_remote_path(remote_path);
        let local_path = local_path.as_ref();
        self.session()?;

        let file = tokio::fs::File::open(local_path).await?;

        if !overwrite {
            self.ensure_absent(&remote_path).await?;
        }

        let route = format!("/api/resources{}", encode_url_path(&remote_path));
        let response = self
            .request(Method::POST, &route)?
            .query(&[("override", overwrite)])
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(reqwest::Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await?;
        Self::check(response, &remote_path).await?;

        log::debug!("[UPLOAD] {} -> {}", local_path.display(), remote_path);
        Ok(())
    }

    pub async fn create_directory(&self, path: &str) -> Result<(), ClientError> {
        let path = normalize_remote_path(path);
        let route = format!(
            "/api/resources{}/",
            encode_url_path(path.trim_end_matches('/'))
        );

        let response = self.request(Method::POST, &route)?.send().await?;
        Self::check(response, &path).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        let path = normalize_remote_path(path);
        let route = format!("/api/resources{}", encode_url_path(&path));

        let response = self.request(Method::DELETE, &route)?.send().await?;
        Self::check(response, &path).await?;
        Ok(())
    }

    pub async fn rename(
        &self,
        source: &str,
        destination: &str,
        overwrite: bool,
    ) -> Result<(), ClientError> {
        self.patch_action("rename", source, destination, overwrite)
            .await
    }

    pub async fn copy(
        &self,
        source: &str,
        destination: &str,
        overwrite: bool,
    ) -> Result<(), ClientError> {
        self.patch_action("copy", source, destination, overwrite)
            .await
    }

    pub async fn list_users(&self) -> Result<Vec<User>, ClientError> {
        self.get_json("/api/users", "/api/users").await
    }

    pub async fn get_user(&self, id: u32) -> Result<User, ClientError> {
        let route = format!("/api/users/{}", id);
        self.get_json(&route, &route).await
    }

    pub async fn create_user(&self, user: &UserData) -> Result<(), ClientError> {
        let body = CreateUserRequest {
            what: "user",
            which: Vec::new(),
            data: user,
        };

        let response = self
            .request(Method::POST, "/api/users")?
            .json(&body)
            .send()
            .await?;
        Self::check(response, "/api/users").await?;
        Ok(())
    }

    pub async fn update_user(&self, id: u32, user: &UserData) -> Result<(), ClientError> {
        let route = format!("/api/users/{}", id);
        let body = CreateUserRequest {
            what: "user",
            which: vec!["all".to_string()],
            data: user,
        };

        let response = self.request(Method::PUT, &route)?.json(&body).send().await?;
        Self::check(response, &route).await?;
        Ok(())
    }

    pub async fn delete_user(&self, id: u32) -> Result<(), ClientError> {
        let route = format!("/api/users/{}", id);

        let response = self.request(Method::DELETE, &route)?.send().await?;
        Self::check(response, &route).await?;
        Ok(())
    }

    /// Releases the transport. Later operations fail with [`ClientError::Closed`].
    pub fn close(&mut self) {
        if self.transport.take().is_some() {
            log::debug!("[CLOSE] Session with {} closed", self.base_url);
        }
    }

    fn session(&self) -> Result<(&Transport, &str), ClientError> {
        let transport = self.transport.as_ref().ok_or(ClientError::Closed)?;
        let token = self.auth.token().ok_or(ClientError::Unauthenticated)?;
        Ok((transport, token))
    }

    fn request(&self, method: Method, route: &str) -> Result<RequestBuilder, ClientError> {
        let (transport, token) = self.session()?;
        Ok(transport
            .http
            .request(method, transport.url(route))
            .header("X-Auth", token))
    }

    async fn get_json<T: DeserializeOwned>(&self, route: &str, path: &str) -> Result<T, ClientError> {
        let response = self.request(Method::GET, route)?.send().await?;
        let body = Self::check(response, path).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn patch_action(
        &self,
        action: &str,
        source: &str,
        destination: &str,
        overwrite: bool,
    ) -> Result<(), ClientError> {
        let source = normalize_remote_path(source);
        let destination = normalize_remote_path(destination);
        self.session()?;

        if !overwrite {
            self.ensure_absent(&destination).await?;
        }

        let route = format!("/api/resources{}", encode_url_path(&source));
        let response = self
            .request(Method::PATCH, &route)?
            .query(&[
                ("action", action),
                ("destination", destination.as_str()),
                ("override", if overwrite { "true" } else { "false" }),
            ])
            .send()
            .await?;

        match Self::check(response, &source).await {
            Ok(_) => {
                log::debug!("[{}] {} -> {}", action.to_uppercase(), source, destination);
                Ok(())
            }
            Err(ClientError::Conflict { .. }) => Err(ClientError::Conflict { path: destination }),
            Err(e) => Err(e),
        }
    }

    async fn ensure_absent(&self, path: &str) -> Result<(), ClientError> {
        match self.get_resource(path).await {
            Ok(_) => {
                log::debug!("[PREFLIGHT] {} already exists", path);
                Err(ClientError::Conflict {
                    path: path.to_string(),
                })
            }
            Err(ClientError::NotFound { .. }) => Ok(()),
            Err(ClientError::Filebrowser(e)) if e.status_code == 404 => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn check(response: Response, path: &str) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        log::debug!("[HTTP] {} for {}", status, path);
        Err(map_http_error(status.as_u16(), body, path))
    }
}

fn non_empty(body: String) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Server-reported errors win over status-based classification.
pub(crate) fn map_http_error(status: u16, body: String, path: &str) -> ClientError {
    if body.trim_start().starts_with('{') {
        if let Ok(error) = serde_json::from_str::<FilebrowserError>(&body) {
            return ClientError::Filebrowser(FilebrowserException {
                status_code: status,
                error_message: error.message,
            });
        }
    }

    match status {
        404 => ClientError::NotFound {
            path: path.to_string(),
        },
        409 => ClientError::Conflict {
            path: path.to_string(),
        },
        _ => ClientError::Transport {
            status,
            body: non_empty(body),
        },
    }
}

// Older servers answer with a JSON array, newer ones stream one object per line.
fn parse_search_results(body: &str) -> Result<Vec<SearchResult>, ClientError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }

    trimmed
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(ClientError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_error_bodies_become_exceptions() {
        let err = map_http_error(
            403,
            r#"{"message":"permission denied","status":403}"#.to_string(),
            "/secret",
        );
        match err {
            ClientError::Filebrowser(e) => {
                assert_eq!(e.status_code, 403);
                assert_eq!(e.error_message, "permission denied");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn plain_bodies_fall_back_to_status() {
        assert!(matches!(
            map_http_error(404, "404 Not Found".to_string(), "/x"),
            ClientError::NotFound { path } if path == "/x"
        ));
        assert!(matches!(
            map_http_error(409, "409 Conflict".to_string(), "/x"),
            ClientError::Conflict { .. }
        ));
        let err = map_http_error(502, "  ".to_string(), "/x");
        assert!(matches!(err, ClientError::Transport { status: 502, body: None }));
        assert_eq!(err.to_string(), "Unexpected server response (HTTP 502)");
    }

    #[test]
    fn search_results_accept_arrays_and_lines() {
        let array = parse_search_results(r#"[{"path":"/b","dir":true},{"path":"/a"}]"#).unwrap();
        assert_eq!(array[0].path, "/b");
        assert!(!array[1].dir);

        let lines = parse_search_results("{\"path\":\"/z\",\"dir\":false}\n{\"path\":\"/y\",\"dir\":true}\n").unwrap();
        assert_eq!(
            lines.iter().map(|r| r.path.as_str()).collect::<Vec<_>>(),
            vec!["/z", "/y"]
        );
        assert!(parse_search_results("").unwrap().is_empty());
    }
}
