//! In-memory backend, seeded from a JSON file at startup.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::gate::types::{Role, Session, Subscription};
use crate::store::{LookupError, RoleLookup, SessionResolver, SubscriptionLookup};

/// On-disk layout of a seed file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Seed {
    /// Session token → user id.
    pub sessions: HashMap<String, Uuid>,
    pub profiles: HashMap<Uuid, Role>,
    pub subscriptions: HashMap<Uuid, Subscription>,
}

/// A thread-safe store of sessions, profiles and subscriptions.
#[derive(Clone, Default)]
pub struct MemoryStore {
    sessions: Arc<DashMap<String, Uuid>>,
    profiles: Arc<DashMap<Uuid, Role>>,
    subscriptions: Arc<DashMap<Uuid, Subscription>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a seed file. A missing file yields an empty store.
    pub fn load_from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let store = Self::new();
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let seed: Seed = serde_json::from_reader(reader)?;

            for (token, user) in seed.sessions {
                store.sessions.insert(token, user);
            }
            for (user, role) in seed.profiles {
                store.profiles.insert(user, role);
            }
            for (user, sub) in seed.subscriptions {
                store.subscriptions.insert(user, sub);
            }
            tracing::info!(
                sessions = store.sessions.len(),
                profiles = store.profiles.len(),
                subscriptions = store.subscriptions.len(),
                "Loaded seed data"
            );
        } else {
            tracing::warn!(path = %path.display(), "Seed file not found, starting empty");
        }
        Ok(store)
    }

    pub fn insert_session(&self, token: impl Into<String>, user_id: Uuid) {
        self.sessions.insert(token.into(), user_id);
    }

    pub fn set_role(&self, user_id: Uuid, role: Role) {
        self.profiles.insert(user_id, role);
    }

    /// Replace the user's latest subscription.
    pub fn set_subscription(&self, user_id: Uuid, subscription: Subscription) {
        self.subscriptions.insert(user_id, subscription);
    }
}

#[async_trait]
impl SessionResolver for MemoryStore {
    async fn resolve(&self, token: &str) -> Result<Option<Session>, LookupError> {
        Ok(self.sessions.get(token).map(|r| Session::new(*r.value())))
    }
}

#[async_trait]
impl RoleLookup for MemoryStore {
    async fn role(&self, user_id: Uuid) -> Result<Option<Role>, LookupError> {
        Ok(self.profiles.get(&user_id).map(|r| *r.value()))
    }
}

#[async_trait]
impl SubscriptionLookup for MemoryStore {
    async fn latest_subscription(&self, user_id: Uuid) -> Result<Option<Subscription>, LookupError> {
        Ok(self.subscriptions.get(&user_id).map(|r| r.value().clone()))
    }
}
