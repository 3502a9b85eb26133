//! REST backend for a hosted auth + Postgres service.
//!
//! Sessions are resolved with `GET /auth/v1/user`; profiles and subscriptions
//! are read through the PostgREST interface under `/rest/v1/`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use crate::gate::types::{Role, Session, Subscription};
use crate::store::{LookupError, RoleLookup, SessionResolver, StoreError, SubscriptionLookup};

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: Uuid,
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    role: Role,
}

/// Client for the hosted backend.
#[derive(Clone)]
pub struct RestStore {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        // Url::join replaces the last segment unless the base ends in '/'.
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, LookupError> {
        self.base_url
            .join(path)
            .map_err(|e| LookupError::Decode(format!("bad endpoint {path}: {e}")))
    }

    async fn rows<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, LookupError> {
        let res = self
            .client
            .get(self.endpoint(&format!("rest/v1/{table}"))?)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(query)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }
        Ok(res.json().await?)
    }
}

#[async_trait]
impl SessionResolver for RestStore {
    async fn resolve(&self, token: &str) -> Result<Option<Session>, LookupError> {
        let res = self
            .client
            .get(self.endpoint("auth/v1/user")?)
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await?;

        match res.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status if status.is_success() => {
                let user: UserResponse = res.json().await?;
                Ok(Some(Session::new(user.id)))
            }
            status => Err(LookupError::Status(status.as_u16())),
        }
    }
}

#[async_trait]
impl RoleLookup for RestStore {
    async fn role(&self, user_id: Uuid) -> Result<Option<Role>, LookupError> {
        let rows: Vec<ProfileRow> = self
            .rows(
                "profiles",
                &[("select", "role".to_string()), ("id", format!("eq.{user_id}"))],
            )
            .await?;
        Ok(rows.into_iter().next().map(|r| r.role))
    }
}

#[async_trait]
impl SubscriptionLookup for RestStore {
    async fn latest_subscription(&self, user_id: Uuid) -> Result<Option<Subscription>, LookupError> {
        let rows: Vec<Subscription> = self
            .rows(
                "subscriptions",
                &[
                    ("select", "status,trial_end_date,subscription_end_date".to_string()),
                    ("user_id", format!("eq.{user_id}")),
                    ("status", "in.(active,trial)".to_string()),
                    ("order", "created_at.desc".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }
}
