//! Decision counters for the admin API.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::gate::outcome::Outcome;

#[derive(Debug, Default)]
pub struct DecisionStats {
    allowed: AtomicU64,
    login: AtomicU64,
    paywall: AtomicU64,
    landing: AtomicU64,
}

/// Point-in-time copy of [`DecisionStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct StatsSnapshot {
    pub total: u64,
    pub allowed: u64,
    pub redirected_to_login: u64,
    pub redirected_to_paywall: u64,
    pub redirected_to_landing: u64,
}

impl DecisionStats {
    pub fn record(&self, outcome: &Outcome) {
        let counter = match outcome {
            Outcome::Allow => &self.allowed,
            Outcome::RedirectToLogin { .. } => &self.login,
            Outcome::RedirectToPaywall => &self.paywall,
            Outcome::RedirectToLanding => &self.landing,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let allowed = self.allowed.load(Ordering::Relaxed);
        let login = self.login.load(Ordering::Relaxed);
        let paywall = self.paywall.load(Ordering::Relaxed);
        let landing = self.landing.load(Ordering::Relaxed);
        StatsSnapshot {
            total: allowed + login + paywall + landing,
            allowed,
            redirected_to_login: login,
            redirected_to_paywall: paywall,
            redirected_to_landing: landing,
        }
    }
}
