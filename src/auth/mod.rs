pub mod manager;
pub mod storage;

pub use manager::{AuthError, AuthManager, AuthStorage, CredentialExchange, ServerCredentials};
pub use storage::{FileAuthStorage, MemoryAuthStorage};
