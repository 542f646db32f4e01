//! Session Credential Module
//!
//! Resolves a valid bearer credential for each network call:
//! - Stored credential with an explicit age-based expiry check
//! - Lazy refresh exchange when expired, persisted back to the store
//! - Empty resolution when nothing is stored, so callers fail fast as
//!   unauthenticated instead of attempting the network call

pub mod session;
pub mod store;
pub mod token;

pub use session::SessionClient;
pub use store::{CredentialStore, FileStore, MemoryStore};
pub use token::{AuthError, Credential, HttpRefresher, TokenRefresher};
