//! Records the gate reads: sessions, profile roles and subscriptions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authenticated caller, as resolved by the auth provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Uuid,
}

impl Session {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

/// Role stored on a user's profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Instructor,
    /// Also used when the profile row is missing or unreadable.
    #[default]
    User,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Instructor => "instructor",
            Role::User => "user",
        }
    }
}

/// Status column of a subscription row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Trial,
    Expired,
    /// Any status string this service does not know about. Never grants access.
    #[serde(other)]
    Unknown,
}

/// A user's paid or trial access window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub trial_end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub subscription_end_date: Option<DateTime<Utc>>,
}

impl Subscription {
    pub fn active_until(end: DateTime<Utc>) -> Self {
        Self {
            status: SubscriptionStatus::Active,
            trial_end_date: None,
            subscription_end_date: Some(end),
        }
    }

    pub fn trial_until(end: DateTime<Utc>) -> Self {
        Self {
            status: SubscriptionStatus::Trial,
            trial_end_date: Some(end),
            subscription_end_date: None,
        }
    }
}
