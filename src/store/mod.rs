//! Backend lookups the gate depends on.
//!
//! # Data Flow
//! ```text
//! session token (cookie / bearer)
//!     → SessionResolver (auth provider)  → Session { user_id }
//! user_id
//!     → RoleLookup (profiles.role)       → Role
//!     → SubscriptionLookup (latest row)  → Subscription
//! ```
//!
//! # Design Decisions
//! - Each lookup is a separate capability so tests can stub one at a time
//! - Lookups report errors; the gate decides what an error means (fail closed)
//! - Two implementations: in-memory (dev, tests) and REST (BaaS)

pub mod memory;
pub mod rest;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{BackendConfig, BackendKind};
use crate::gate::types::{Role, Session, Subscription};

pub use memory::MemoryStore;
pub use rest::RestStore;

/// A failed backend read.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Failure while constructing a backend at startup.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read seed file: {0}")]
    Seed(#[from] std::io::Error),
    #[error("invalid backend URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Resolves an opaque session token to the caller it belongs to.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    /// `Ok(None)` means the token is unknown or expired.
    async fn resolve(&self, token: &str) -> Result<Option<Session>, LookupError>;
}

/// Reads `profiles.role`.
#[async_trait]
pub trait RoleLookup: Send + Sync {
    /// `Ok(None)` means the user has no profile row.
    async fn role(&self, user_id: Uuid) -> Result<Option<Role>, LookupError>;
}

/// Reads the most recent subscription row.
#[async_trait]
pub trait SubscriptionLookup: Send + Sync {
    async fn latest_subscription(&self, user_id: Uuid) -> Result<Option<Subscription>, LookupError>;
}

/// The three capabilities, shared across request tasks.
#[derive(Clone)]
pub struct Backends {
    pub sessions: Arc<dyn SessionResolver>,
    pub roles: Arc<dyn RoleLookup>,
    pub subscriptions: Arc<dyn SubscriptionLookup>,
}

impl Backends {
    /// Build backends from configuration.
    pub fn from_config(config: &BackendConfig) -> Result<Self, StoreError> {
        match config.kind {
            BackendKind::Memory => {
                let store = match &config.seed_path {
                    Some(path) => MemoryStore::load_from_file(path)?,
                    None => MemoryStore::new(),
                };
                tracing::info!(seeded = config.seed_path.is_some(), "Using in-memory backend");
                Ok(Self::memory(Arc::new(store)))
            }
            BackendKind::Rest => {
                let store = RestStore::new(
                    &config.base_url,
                    &config.api_key,
                    std::time::Duration::from_secs(config.timeout_secs),
                )?;
                tracing::info!(base_url = %config.base_url, "Using REST backend");
                Ok(Self::rest(Arc::new(store)))
            }
        }
    }

    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            sessions: store.clone(),
            roles: store.clone(),
            subscriptions: store,
        }
    }

    pub fn rest(store: Arc<RestStore>) -> Self {
        Self {
            sessions: store.clone(),
            roles: store.clone(),
            subscriptions: store,
        }
    }
}
