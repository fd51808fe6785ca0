use serde::{Deserialize, Serialize};

/// A file or directory as reported by the Filebrowser server.
///
/// `size` and `mode` are `f64` so the JSON shape stays identical for hosts
/// whose only number type is a double.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Resource {
    pub name: String,
    pub size: f64,
    pub extension: String,
    pub modified: String,
    pub mode: f64,
    pub is_dir: bool,
    pub is_symlink: bool,
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Resource>>,
    pub num_dirs: i32,
    pub num_files: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sorting: Option<Sorting>,
}

impl Resource {
    /// Enforces the listing invariants: files carry no children and the
    /// counters match the children actually present.
    pub fn normalize_listing(&mut self) {
        if !self.is_dir {
            self.items = None;
            return;
        }

        if let Some(items) = &self.items {
            let dirs = items.iter().filter(|item| item.is_dir).count() as i32;
            let files = items.len() as i32 - dirs;
            if dirs != self.num_dirs || files != self.num_files {
                log::debug!(
                    "[LISTING] counters for {} adjusted: {}/{} -> {}/{}",
                    self.path,
                    self.num_dirs,
                    self.num_files,
                    dirs,
                    files
                );
            }
            self.num_dirs = dirs;
            self.num_files = files;
        }
    }

    pub fn children(&self) -> &[Resource] {
        self.items.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sorting {
    pub by: String,
    pub asc: bool,
}

impl Default for Sorting {
    fn default() -> Self {
        Sorting {
            by: "name".to_string(),
            asc: true,
        }
    }
}

/// One hit returned by the search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub path: String,
    #[serde(default)]
    pub dir: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u32,
    pub username: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default)]
    pub perm: Permissions,
    #[serde(default)]
    pub lock_password: bool,
    #[serde(default = "default_view_mode")]
    pub view_mode: String,
    #[serde(default)]
    pub single_click: bool,
    #[serde(default)]
    pub hide_dotfiles: bool,
    #[serde(default)]
    pub date_format: bool,
}

/// User fields accepted by the create and update endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub username: String,
    pub password: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default)]
    pub perm: Permissions,
}

impl UserData {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        UserData {
            username: username.into(),
            password: password.into(),
            scope: default_scope(),
            locale: default_locale(),
            perm: Permissions::default(),
        }
    }
}

/// Capability flags of a user. The server checks them, the client only relays them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Permissions {
    pub admin: bool,
    pub execute: bool,
    pub create: bool,
    pub rename: bool,
    pub modify: bool,
    pub delete: bool,
    pub share: bool,
    pub download: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Permissions {
            admin: false,
            execute: false,
            create: true,
            rename: true,
            modify: true,
            delete: true,
            share: true,
            download: true,
        }
    }
}

/// Error body some Filebrowser endpoints return alongside a failing status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilebrowserError {
    pub message: String,
    pub status: i32,
}

impl Default for FilebrowserError {
    fn default() -> Self {
        FilebrowserError {
            message: "Unknown error".to_string(),
            status: 0,
        }
    }
}

/// A failure reported by the server itself, as opposed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Filebrowser error ({status_code}): {error_message}")]
pub struct FilebrowserException {
    pub status_code: u16,
    pub error_message: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub recaptcha: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateUserRequest<'a> {
    pub what: &'a str,
    pub which: Vec<String>,
    pub data: &'a UserData,
}

fn default_scope() -> String {
    "/".to_string()
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_view_mode() -> String {
    "list".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_listing() -> Resource {
        Resource {
            name: "docs".to_string(),
            is_dir: true,
            path: "/docs".to_string(),
            modified: "2024-03-01T10:00:00Z".to_string(),
            mode: 2147484141.0,
            items: Some(vec![
                Resource {
                    name: "readme.md".to_string(),
                    size: 1024.0,
                    extension: ".md".to_string(),
                    kind: "text".to_string(),
                    path: "/docs/readme.md".to_string(),
                    mode: 420.0,
                    ..Default::default()
                },
                Resource {
                    name: "images".to_string(),
                    is_dir: true,
                    path: "/docs/images".to_string(),
                    ..Default::default()
                },
            ]),
            num_dirs: 1,
            num_files: 1,
            sorting: Some(Sorting {
                by: "size".to_string(),
                asc: false,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn resource_survives_a_json_round_trip() {
        let original = sample_listing();
        let encoded = serde_json::to_string(&original).unwrap();
        let decoded: Resource = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn resource_uses_wire_field_names() {
        let value = serde_json::to_value(sample_listing()).unwrap();
        for field in [
            "name", "size", "extension", "modified", "mode", "isDir", "isSymlink", "type",
            "path", "items", "numDirs", "numFiles", "sorting",
        ] {
            assert!(value.get(field).is_some(), "missing field {}", field);
        }
        assert_eq!(value["items"][0]["type"], "text");
        assert!(value["items"][0].get("items").is_none());
    }

    #[test]
    fn resource_tolerates_sparse_server_payloads() {
        let resource: Resource = serde_json::from_value(json!({
            "name": "",
            "size": 0,
            "isDir": true,
            "path": "/",
            "numDirs": 2,
            "numFiles": 3,
            "unknownField": 7
        }))
        .unwrap();

        assert!(resource.is_dir);
        assert_eq!(resource.num_dirs, 2);
        assert_eq!(resource.num_files, 3);
        assert!(resource.items.is_none());
        assert_eq!(resource.kind, "");
    }

    #[test]
    fn normalize_listing_recounts_children() {
        let mut listing = sample_listing();
        listing.num_dirs = 7;
        listing.num_files = 0;
        listing.normalize_listing();
        assert_eq!(listing.num_dirs, 1);
        assert_eq!(listing.num_files, 1);
        assert_eq!(
            (listing.num_dirs + listing.num_files) as usize,
            listing.children().len()
        );
    }

    #[test]
    fn normalize_listing_drops_children_of_files() {
        let mut file = Resource {
            name: "a.txt".to_string(),
            items: Some(vec![Resource::default()]),
            ..Default::default()
        };
        file.normalize_listing();
        assert!(file.items.is_none());
        assert!(file.children().is_empty());
    }

    #[test]
    fn search_results_and_permissions_round_trip() {
        let hits = vec![
            SearchResult {
                path: "/docs/a.txt".to_string(),
                dir: false,
            },
            SearchResult {
                path: "/docs/archive".to_string(),
                dir: true,
            },
        ];
        let encoded = serde_json::to_string(&hits).unwrap();
        assert_eq!(serde_json::from_str::<Vec<SearchResult>>(&encoded).unwrap(), hits);

        let perm = Permissions {
            admin: true,
            share: false,
            ..Default::default()
        };
        let encoded = serde_json::to_value(perm).unwrap();
        assert_eq!(encoded.as_object().unwrap().len(), 8);
        assert_eq!(serde_json::from_value::<Permissions>(encoded).unwrap(), perm);
    }

    #[test]
    fn permissions_default_to_a_regular_user() {
        let perm: Permissions = serde_json::from_str("{}").unwrap();
        assert!(!perm.admin);
        assert!(!perm.execute);
        assert!(perm.create && perm.rename && perm.modify);
        assert!(perm.delete && perm.share && perm.download);
    }

    #[test]
    fn user_fills_defaults() {
        let user: User = serde_json::from_value(json!({"id": 3, "username": "alice"})).unwrap();
        assert_eq!(user.scope, "/");
        assert_eq!(user.locale, "en");
        assert_eq!(user.view_mode, "list");
        assert_eq!(user.perm, Permissions::default());
    }

    #[test]
    fn exception_message_embeds_status() {
        let e = FilebrowserException {
            status_code: 403,
            error_message: "forbidden".to_string(),
        };
        assert_eq!(e.to_string(), "Filebrowser error (403): forbidden");
    }
}
