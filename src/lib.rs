//! Client for a Filebrowser server, usable from Rust directly or from
//! foreign code through the string-and-boolean boundary in [`boundary`].

pub mod api;
pub mod auth;
pub mod boundary;
pub mod config;
pub mod util;

pub use api::client::{ClientError, FilebrowserClient};
pub use api::models::{FilebrowserException, Resource, SearchResult, User, UserData};
pub use auth::{AuthStorage, FileAuthStorage, MemoryAuthStorage, ServerCredentials};
pub use config::settings::Config;
