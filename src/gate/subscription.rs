//! Subscription validity.

use chrono::{DateTime, Utc};

use crate::gate::types::{Subscription, SubscriptionStatus};

/// Whether `subscription` grants access at `now`.
///
/// Valid iff the status is `active` with `subscription_end_date` in the future,
/// or `trial` with `trial_end_date` in the future. A missing end date, an
/// expired/unknown status or no subscription at all never grants access.
pub fn is_subscription_valid(subscription: Option<&Subscription>, now: DateTime<Utc>) -> bool {
    let Some(sub) = subscription else {
        return false;
    };

    let end = match sub.status {
        SubscriptionStatus::Active => sub.subscription_end_date,
        SubscriptionStatus::Trial => sub.trial_end_date,
        SubscriptionStatus::Expired | SubscriptionStatus::Unknown => None,
    };

    end.is_some_and(|end| end > now)
}
