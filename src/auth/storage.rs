use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::manager::{AuthError, AuthStorage, ServerCredentials};
use crate::util::path::normalize_server_url;

/// Keeps credentials for the lifetime of the process only.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuthStorage {
    slot: Arc<Mutex<Option<ServerCredentials>>>,
}

impl AuthStorage for MemoryAuthStorage {
    fn load(&self) -> Result<Option<ServerCredentials>, AuthError> {
        Ok(self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, credentials: &ServerCredentials) -> Result<(), AuthError> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(credentials.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).take();
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AuthData {
    tokens: BTreeMap<String, String>,
    default_server: Option<String>,
}

/// Stores tokens for any number of servers in a JSON file; the most recently
/// saved server becomes the default that [`AuthStorage::load`] returns.
#[derive(Debug, Clone)]
pub struct FileAuthStorage {
    path: PathBuf,
}

impl FileAuthStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Servers that have a stored token.
    pub fn servers(&self) -> Result<Vec<String>, AuthError> {
        Ok(self.read_data()?.tokens.into_keys().collect())
    }

    pub fn default_server(&self) -> Result<Option<String>, AuthError> {
        Ok(self.read_data()?.default_server)
    }

    fn read_data(&self) -> Result<AuthData, AuthError> {
        self.read_raw().map(|(data, _)| data)
    }

    // The flag is set when a file exists but does not parse.
    fn read_raw(&self) -> Result<(AuthData, bool), AuthError> {
        if !self.path.exists() {
            return Ok((AuthData::default(), false));
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| AuthError::Storage(format!("{}: {}", self.path.display(), e)))?;

        match serde_json::from_str(&content) {
            Ok(data) => Ok((data, false)),
            Err(e) => {
                log::warn!(
                    "[AUTH] Unreadable credentials file {}, starting empty: {}",
                    self.path.display(),
                    e
                );
                Ok((AuthData::default(), true))
            }
        }
    }

    /// Reads before a write. An unreadable file is moved to
    /// [`corrupt_path`](Self::corrupt_path) so the write cannot destroy it.
    fn read_for_update(&self) -> Result<AuthData, AuthError> {
        let (data, corrupt) = self.read_raw()?;
        if corrupt {
            let aside = self.corrupt_path();
            fs::rename(&self.path, &aside)
                .map_err(|e| AuthError::Storage(format!("{}: {}", aside.display(), e)))?;
            log::warn!(
                "[AUTH] Kept unreadable credentials as {}",
                aside.display()
            );
        }
        Ok(data)
    }

    /// Where an unreadable credentials file is kept, next to the real one.
    pub fn corrupt_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".corrupt");
        PathBuf::from(name)
    }

    fn write_data(&self, data: &AuthData) -> Result<(), AuthError> {
        let storage_err = |e: std::io::Error| AuthError::Storage(format!("{}: {}", self.path.display(), e));

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(storage_err)?;
        }

        let content =
            serde_json::to_string_pretty(data).map_err(|e| AuthError::Storage(e.to_string()))?;
        fs::write(&self.path, content).map_err(storage_err)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
                .map_err(storage_err)?;
        }

        Ok(())
    }
}

impl AuthStorage for FileAuthStorage {
    fn load(&self) -> Result<Option<ServerCredentials>, AuthError> {
        let data = self.read_data()?;
        let credentials = data.default_server.and_then(|server_url| {
            data.tokens.get(&server_url).map(|token| ServerCredentials {
                server_url: server_url.clone(),
                token: token.clone(),
            })
        });
        Ok(credentials)
    }

    fn save(&self, credentials: &ServerCredentials) -> Result<(), AuthError> {
        let mut data = self.read_for_update()?;
        let server_url = normalize_server_url(&credentials.server_url);
        data.tokens
            .insert(server_url.clone(), credentials.token.clone());
        data.default_server = Some(server_url);
        self.write_data(&data)
    }

    fn clear(&self) -> Result<(), AuthError> {
        let mut data = self.read_for_update()?;
        let server_url = match data.default_server.take() {
            Some(url) => url,
            None => return Ok(()),
        };
        data.tokens.remove(&server_url);

        if data.tokens.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path)
                    .map_err(|e| AuthError::Storage(format!("{}: {}", self.path.display(), e)))?;
            }
            Ok(())
        } else {
            self.write_data(&data)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(url: &str, token: &str) -> ServerCredentials {
        ServerCredentials {
            server_url: url.to_string(),
            token: token.to_string(),
        }
    }

    #[test]
    fn missing_file_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileAuthStorage::new(dir.path().join("auth.json"));
        assert_eq!(storage.load().unwrap(), None);
        storage.clear().unwrap();
    }

    #[test]
    fn save_then_load_returns_the_default_server() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileAuthStorage::new(dir.path().join("nested").join("auth.json"));

        storage.save(&creds("https://a.example.com/", "tok-a")).unwrap();
        storage.save(&creds("https://b.example.com", "tok-b")).unwrap();

        assert_eq!(
            storage.load().unwrap(),
            Some(creds("https://b.example.com", "tok-b"))
        );
        assert_eq!(
            storage.servers().unwrap(),
            vec!["https://a.example.com", "https://b.example.com"]
        );
    }

    #[test]
    fn clear_forgets_only_the_default_server() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        let storage = FileAuthStorage::new(&path);

        storage.save(&creds("https://a.example.com", "tok-a")).unwrap();
        storage.save(&creds("https://b.example.com", "tok-b")).unwrap();
        storage.clear().unwrap();

        assert_eq!(storage.load().unwrap(), None);
        assert_eq!(storage.default_server().unwrap(), None);
        assert_eq!(storage.servers().unwrap(), vec!["https://a.example.com"]);

        storage.save(&creds("https://a.example.com", "tok-a2")).unwrap();
        storage.clear().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn corrupt_file_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        fs::write(&path, "{not json").unwrap();

        let storage = FileAuthStorage::new(&path);
        assert_eq!(storage.load().unwrap(), None);
        storage.save(&creds("http://a", "tok")).unwrap();
        assert_eq!(storage.load().unwrap(), Some(creds("http://a", "tok")));
    }

    #[test]
    fn corrupt_file_is_kept_aside_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        fs::write(&path, "{\"tokens\": {\"http://other\": ").unwrap();

        let storage = FileAuthStorage::new(&path);
        storage.save(&creds("http://a", "tok")).unwrap();

        assert_eq!(
            fs::read_to_string(storage.corrupt_path()).unwrap(),
            "{\"tokens\": {\"http://other\": "
        );
        assert_eq!(storage.servers().unwrap(), vec!["http://a"]);
    }

    #[test]
    fn file_uses_wire_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        FileAuthStorage::new(&path)
            .save(&creds("http://a", "tok"))
            .unwrap();

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["defaultServer"], "http://a");
        assert_eq!(raw["tokens"]["http://a"], "tok");
    }

    #[test]
    fn memory_storage_is_shared_between_clones() {
        let storage = MemoryAuthStorage::default();
        let other = storage.clone();
        storage.save(&creds("http://a", "tok")).unwrap();
        assert_eq!(other.load().unwrap(), Some(creds("http://a", "tok")));
        other.clear().unwrap();
        assert_eq!(storage.load().unwrap(), None);
    }
}
