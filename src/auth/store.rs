//! Credential Stores
//!
//! Persistence for the single shared credential. A missing credential loads
//! as `None` rather than an error; that is the unauthenticated state.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::token::{AuthError, Credential};

// ============================================================================
// Store Trait
// ============================================================================

/// Storage backend for the stored credential.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the stored credential, if any.
    async fn load(&self) -> Result<Option<Credential>, AuthError>;

    /// Persist a credential, replacing any previous one.
    async fn save(&self, credential: &Credential) -> Result<(), AuthError>;
}

// ============================================================================
// File Store
// ============================================================================

/// Credential stored as JSON on disk.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CredentialStore for FileStore {
    async fn load(&self) -> Result<Option<Credential>, AuthError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AuthError::Store(e)),
        };
        let credential = serde_json::from_slice(&raw)?;
        Ok(Some(credential))
    }

    async fn save(&self, credential: &Credential) -> Result<(), AuthError> {
        let raw = serde_json::to_vec_pretty(credential)?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }
}

// ============================================================================
// Memory Store
// ============================================================================

/// In-process credential store (tests, embedded callers).
pub struct MemoryStore {
    inner: RwLock<Option<Credential>>,
}

impl MemoryStore {
    pub fn empty() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }

    pub fn with(credential: Credential) -> Self {
        Self {
            inner: RwLock::new(Some(credential)),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn load(&self) -> Result<Option<Credential>, AuthError> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, credential: &Credential) -> Result<(), AuthError> {
        *self.inner.write().await = Some(credential.clone());
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
