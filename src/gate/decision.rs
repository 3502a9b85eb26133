//! The per-request access decision.
//!
//! # Responsibilities
//! - Classify the path against the route table
//! - Read role and subscription only when the path needs them
//! - Fold every lookup failure into a denial (fail closed)
//!
//! # Design Decisions
//! - No state is mutated: the same inputs always give the same outcome
//! - At most two backend reads per evaluation
//! - Missing profile row = `user` role, so a subscription is still required

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::GateSettings;
use crate::gate::outcome::{GatePaths, Outcome};
use crate::gate::subscription::is_subscription_valid;
use crate::gate::types::{Role, Session};
use crate::observability::metrics;
use crate::routing::{AccessLevel, RouteTable};
use crate::store::{RoleLookup, SubscriptionLookup};

/// How the reads for a protected path are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupMode {
    /// Read the subscription only when the role is not admin.
    #[default]
    Lazy,
    /// Read role and subscription together and wait for both.
    Concurrent,
}

/// Route policy plus redirect targets. Immutable; replaced whole on reload.
#[derive(Debug, Clone)]
pub struct AccessGate {
    table: RouteTable,
    paths: GatePaths,
    lookup_mode: LookupMode,
}

impl AccessGate {
    pub fn new(table: RouteTable, paths: GatePaths, lookup_mode: LookupMode) -> Self {
        Self {
            table,
            paths,
            lookup_mode,
        }
    }

    pub fn from_settings(settings: &GateSettings) -> Self {
        Self::new(
            RouteTable::from_config(&settings.routes, &settings.checkout_paths),
            GatePaths::from_settings(settings),
            settings.lookup_mode,
        )
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn paths(&self) -> &GatePaths {
        &self.paths
    }

    pub fn lookup_mode(&self) -> LookupMode {
        self.lookup_mode
    }

    pub fn classify(&self, path: &str) -> Option<AccessLevel> {
        self.table.classify(path)
    }

    /// Whether the outcome for `path` can depend on the caller's session.
    /// Public and unclassified non-checkout paths never need one resolved.
    pub fn needs_session(&self, path: &str) -> bool {
        match self.classify(path) {
            Some(AccessLevel::Public) => false,
            Some(_) => true,
            None => self.table.is_checkout(path),
        }
    }

    /// Decide what happens to a request for `path`.
    pub async fn decide(
        &self,
        path: &str,
        session: Option<Session>,
        roles: &dyn RoleLookup,
        subscriptions: &dyn SubscriptionLookup,
        now: DateTime<Utc>,
    ) -> Outcome {
        let level = self.classify(path);

        if level == Some(AccessLevel::Public) {
            return Outcome::Allow;
        }

        let Some(session) = session else {
            if level.is_some_and(AccessLevel::requires_session) {
                return Outcome::RedirectToLogin {
                    return_to: path.to_string(),
                };
            }
            return Outcome::Allow;
        };
        let user_id = session.user_id;

        match level {
            Some(AccessLevel::Auth) => return Outcome::RedirectToLanding,
            Some(AccessLevel::Protected) => {
                return self
                    .decide_protected(user_id, roles, subscriptions, now)
                    .await;
            }
            Some(AccessLevel::Admin) => {
                let role = role_or_default(roles, user_id).await;
                return if role.is_admin() {
                    Outcome::Allow
                } else {
                    Outcome::RedirectToLanding
                };
            }
            Some(AccessLevel::AuthOnly) | Some(AccessLevel::Public) | None => {}
        }

        // Subscribers have no business on checkout pages.
        if self.table.is_checkout(path) && subscription_valid(subscriptions, user_id, now).await {
            return Outcome::RedirectToLanding;
        }

        Outcome::Allow
    }

    async fn decide_protected(
        &self,
        user_id: Uuid,
        roles: &dyn RoleLookup,
        subscriptions: &dyn SubscriptionLookup,
        now: DateTime<Utc>,
    ) -> Outcome {
        let allowed = match self.lookup_mode {
            LookupMode::Lazy => {
                role_or_default(roles, user_id).await.is_admin()
                    || subscription_valid(subscriptions, user_id, now).await
            }
            LookupMode::Concurrent => {
                let (role, valid) = tokio::join!(
                    role_or_default(roles, user_id),
                    subscription_valid(subscriptions, user_id, now)
                );
                role.is_admin() || valid
            }
        };

        if allowed {
            Outcome::Allow
        } else {
            Outcome::RedirectToPaywall
        }
    }
}

impl Default for AccessGate {
    fn default() -> Self {
        Self::from_settings(&GateSettings::default())
    }
}

async fn role_or_default(roles: &dyn RoleLookup, user_id: Uuid) -> Role {
    match roles.role(user_id).await {
        Ok(Some(role)) => role,
        Ok(None) => {
            tracing::debug!(%user_id, "No profile row, assuming user role");
            Role::User
        }
        Err(e) => {
            tracing::warn!(%user_id, error = %e, "Profile lookup failed, assuming user role");
            metrics::record_lookup_failure("profile");
            Role::User
        }
    }
}

async fn subscription_valid(
    subscriptions: &dyn SubscriptionLookup,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> bool {
    match subscriptions.latest_subscription(user_id).await {
        Ok(sub) => is_subscription_valid(sub.as_ref(), now),
        Err(e) => {
            tracing::warn!(%user_id, error = %e, "Subscription lookup failed, treating as invalid");
            metrics::record_lookup_failure("subscription");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::types::Subscription;
    use crate::store::{LookupError, MemoryStore};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PROTECTED: &[&str] = &[
        "/mi-santuario",
        "/dashboard",
        "/clases",
        "/clase/respiracion-consciente",
        "/programas/30-dias",
        "/perfil",
        "/ajustes",
        "/historial",
        "/explorar",
        "/pilares/movimiento",
        "/instructores/ana",
        "/favoritos",
    ];
    const PUBLIC: &[&str] = &[
        "/",
        "/auth/callback",
        "/auth/auth-code-error",
        "/auth/logout",
        "/auth/registro-exitoso",
        "/api/health",
    ];
    const AUTH_ONLY: &[&str] = &["/acceso-fundador", "/prueba", "/paywall", "/suscripcion"];

    /// Counts reads and can be told to fail.
    #[derive(Default)]
    struct CountingLookups {
        store: MemoryStore,
        fail_roles: bool,
        fail_subscriptions: bool,
        role_reads: AtomicUsize,
        subscription_reads: AtomicUsize,
    }

    #[async_trait]
    impl RoleLookup for CountingLookups {
        async fn role(&self, user_id: Uuid) -> Result<Option<Role>, LookupError> {
            self.role_reads.fetch_add(1, Ordering::SeqCst);
            if self.fail_roles {
                return Err(LookupError::Unavailable("profiles down".into()));
            }
            self.store.role(user_id).await
        }
    }

    #[async_trait]
    impl SubscriptionLookup for CountingLookups {
        async fn latest_subscription(&self, user_id: Uuid) -> Result<Option<Subscription>, LookupError> {
            self.subscription_reads.fetch_add(1, Ordering::SeqCst);
            if self.fail_subscriptions {
                return Err(LookupError::Unavailable("subscriptions down".into()));
            }
            self.store.latest_subscription(user_id).await
        }
    }

    impl CountingLookups {
        fn reads(&self) -> usize {
            self.role_reads.load(Ordering::SeqCst) + self.subscription_reads.load(Ordering::SeqCst)
        }
    }

    fn user_with(lookups: &CountingLookups, role: Option<Role>, sub: Option<Subscription>) -> Session {
        let user = Uuid::new_v4();
        if let Some(role) = role {
            lookups.store.set_role(user, role);
        }
        if let Some(sub) = sub {
            lookups.store.set_subscription(user, sub);
        }
        Session::new(user)
    }

    async fn run(gate: &AccessGate, lookups: &CountingLookups, path: &str, session: Option<Session>) -> Outcome {
        gate.decide(path, session, lookups, lookups, Utc::now()).await
    }

    #[tokio::test]
    async fn test_public_always_allowed() {
        let gate = AccessGate::default();
        let lookups = CountingLookups::default();
        let now = Utc::now();
        let expired = user_with(&lookups, Some(Role::User), Some(Subscription::active_until(now - Duration::days(1))));
        let admin = user_with(&lookups, Some(Role::Admin), None);

        for path in PUBLIC {
            for session in [None, Some(expired), Some(admin)] {
                assert_eq!(run(&gate, &lookups, path, session).await, Outcome::Allow, "{path}");
            }
        }
        assert_eq!(lookups.reads(), 0);
    }

    #[tokio::test]
    async fn test_anonymous_sent_to_login() {
        let gate = AccessGate::default();
        let lookups = CountingLookups::default();

        for path in PROTECTED.iter().chain(AUTH_ONLY).chain(&["/admin", "/admin/clases"]) {
            assert_eq!(
                run(&gate, &lookups, path, None).await,
                Outcome::RedirectToLogin { return_to: path.to_string() },
                "{path}"
            );
        }
        assert_eq!(lookups.reads(), 0);
    }

    #[tokio::test]
    async fn test_admin_without_subscription_allowed() {
        let gate = AccessGate::default();
        let lookups = CountingLookups::default();
        let admin = user_with(&lookups, Some(Role::Admin), None);

        for path in PROTECTED {
            assert_eq!(run(&gate, &lookups, path, Some(admin)).await, Outcome::Allow, "{path}");
        }
        // Lazy mode never reads the subscription for admins.
        assert_eq!(lookups.subscription_reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_subscription_windows() {
        let gate = AccessGate::default();
        let lookups = CountingLookups::default();
        let now = Utc::now();

        let active = user_with(&lookups, Some(Role::User), Some(Subscription::active_until(now + Duration::days(1))));
        let lapsed = user_with(&lookups, Some(Role::User), Some(Subscription::active_until(now - Duration::days(1))));
        let trial = user_with(&lookups, Some(Role::User), Some(Subscription::trial_until(now + Duration::hours(1))));
        let old_trial = user_with(&lookups, Some(Role::User), Some(Subscription::trial_until(now - Duration::hours(1))));
        let none = user_with(&lookups, Some(Role::Instructor), None);

        for path in PROTECTED {
            assert_eq!(run(&gate, &lookups, path, Some(active)).await, Outcome::Allow);
            assert_eq!(run(&gate, &lookups, path, Some(trial)).await, Outcome::Allow);
            assert_eq!(run(&gate, &lookups, path, Some(lapsed)).await, Outcome::RedirectToPaywall);
            assert_eq!(run(&gate, &lookups, path, Some(old_trial)).await, Outcome::RedirectToPaywall);
            assert_eq!(run(&gate, &lookups, path, Some(none)).await, Outcome::RedirectToPaywall);
        }
    }

    #[tokio::test]
    async fn test_admin_routes() {
        let gate = AccessGate::default();
        let lookups = CountingLookups::default();
        let now = Utc::now();
        let subscriber = user_with(&lookups, Some(Role::User), Some(Subscription::active_until(now + Duration::days(30))));
        let instructor = user_with(&lookups, Some(Role::Instructor), None);
        let admin = user_with(&lookups, Some(Role::Admin), None);

        assert_eq!(run(&gate, &lookups, "/admin/clases", Some(subscriber)).await, Outcome::RedirectToLanding);
        assert_eq!(run(&gate, &lookups, "/admin/clases", Some(instructor)).await, Outcome::RedirectToLanding);
        assert_eq!(run(&gate, &lookups, "/admin/clases", Some(admin)).await, Outcome::Allow);
        assert_eq!(run(&gate, &lookups, "/admin", Some(admin)).await, Outcome::Allow);
    }

    #[tokio::test]
    async fn test_missing_profile_is_user() {
        let gate = AccessGate::default();
        let lookups = CountingLookups::default();
        let now = Utc::now();
        let no_profile = user_with(&lookups, None, None);
        let no_profile_subscribed = user_with(&lookups, None, Some(Subscription::active_until(now + Duration::days(1))));

        assert_eq!(run(&gate, &lookups, "/admin/clases", Some(no_profile)).await, Outcome::RedirectToLanding);
        assert_eq!(run(&gate, &lookups, "/clases", Some(no_profile)).await, Outcome::RedirectToPaywall);
        assert_eq!(run(&gate, &lookups, "/clases", Some(no_profile_subscribed)).await, Outcome::Allow);
    }

    #[tokio::test]
    async fn test_signed_in_leaves_auth_pages() {
        let gate = AccessGate::default();
        let lookups = CountingLookups::default();
        let nobody = user_with(&lookups, None, None);
        let admin = user_with(&lookups, Some(Role::Admin), None);

        for session in [nobody, admin] {
            assert_eq!(run(&gate, &lookups, "/auth/login", Some(session)).await, Outcome::RedirectToLanding);
            assert_eq!(run(&gate, &lookups, "/auth/register", Some(session)).await, Outcome::RedirectToLanding);
        }
        assert_eq!(run(&gate, &lookups, "/auth/login", None).await, Outcome::Allow);
        assert_eq!(run(&gate, &lookups, "/auth/register", None).await, Outcome::Allow);
        assert_eq!(lookups.reads(), 0);
    }

    #[tokio::test]
    async fn test_checkout_pages() {
        let gate = AccessGate::default();
        let lookups = CountingLookups::default();
        let now = Utc::now();
        let subscriber = user_with(&lookups, Some(Role::User), Some(Subscription::trial_until(now + Duration::days(3))));
        let lapsed = user_with(&lookups, Some(Role::User), Some(Subscription::active_until(now - Duration::days(3))));

        for path in ["/paywall", "/prueba", "/acceso-fundador"] {
            assert_eq!(run(&gate, &lookups, path, Some(subscriber)).await, Outcome::RedirectToLanding);
            assert_eq!(run(&gate, &lookups, path, Some(lapsed)).await, Outcome::Allow);
        }
        // Subscription management stays reachable for subscribers.
        assert_eq!(run(&gate, &lookups, "/suscripcion", Some(subscriber)).await, Outcome::Allow);
    }

    #[tokio::test]
    async fn test_unclassified_allowed() {
        let gate = AccessGate::default();
        let lookups = CountingLookups::default();
        let user = user_with(&lookups, None, None);
        assert_eq!(run(&gate, &lookups, "/nosotros", None).await, Outcome::Allow);
        assert_eq!(run(&gate, &lookups, "/nosotros", Some(user)).await, Outcome::Allow);
        assert!(!gate.needs_session("/nosotros"));
        assert!(!gate.needs_session("/"));
        assert!(gate.needs_session("/auth/login"));
        assert!(gate.needs_session("/clases"));
    }

    #[tokio::test]
    async fn test_lookup_failures_fail_closed() {
        let gate = AccessGate::default();
        let now = Utc::now();

        // Role read fails for a real admin: treated as user, needs a subscription.
        let lookups = CountingLookups {
            fail_roles: true,
            ..CountingLookups::default()
        };
        let admin = user_with(&lookups, Some(Role::Admin), None);
        assert_eq!(run(&gate, &lookups, "/clases", Some(admin)).await, Outcome::RedirectToPaywall);
        assert_eq!(run(&gate, &lookups, "/admin/clases", Some(admin)).await, Outcome::RedirectToLanding);

        // Subscription read fails for a paying user.
        let lookups = CountingLookups {
            fail_subscriptions: true,
            ..CountingLookups::default()
        };
        let paying = user_with(&lookups, Some(Role::User), Some(Subscription::active_until(now + Duration::days(1))));
        assert_eq!(run(&gate, &lookups, "/clases", Some(paying)).await, Outcome::RedirectToPaywall);
        // On a checkout page the failure keeps them there rather than bouncing.
        assert_eq!(run(&gate, &lookups, "/paywall", Some(paying)).await, Outcome::Allow);
    }

    #[tokio::test]
    async fn test_concurrent_mode_matches_lazy() {
        let settings = GateSettings {
            lookup_mode: LookupMode::Concurrent,
            ..GateSettings::default()
        };
        let concurrent = AccessGate::from_settings(&settings);
        let lazy = AccessGate::default();
        let lookups = CountingLookups::default();
        let now = Utc::now();

        let sessions = [
            user_with(&lookups, Some(Role::Admin), None),
            user_with(&lookups, Some(Role::User), Some(Subscription::active_until(now + Duration::days(1)))),
            user_with(&lookups, Some(Role::User), Some(Subscription::trial_until(now - Duration::hours(1)))),
            user_with(&lookups, None, None),
        ];
        for session in sessions {
            for path in PROTECTED {
                assert_eq!(
                    run(&concurrent, &lookups, path, Some(session)).await,
                    run(&lazy, &lookups, path, Some(session)).await
                );
            }
        }
    }

    #[tokio::test]
    async fn test_at_most_two_reads() {
        let gate = AccessGate::from_settings(&GateSettings {
            lookup_mode: LookupMode::Concurrent,
            ..GateSettings::default()
        });
        let lookups = CountingLookups::default();
        let user = user_with(&lookups, Some(Role::User), None);

        run(&gate, &lookups, "/clases", Some(user)).await;
        assert_eq!(lookups.reads(), 2);
    }

    #[tokio::test]
    async fn test_idempotent() {
        let gate = AccessGate::default();
        let lookups = CountingLookups::default();
        let now = Utc::now();
        let user = user_with(&lookups, Some(Role::User), Some(Subscription::active_until(now + Duration::days(1))));

        for path in ["/clases", "/paywall", "/admin", "/auth/login", "/"] {
            let first = gate.decide(path, Some(user), &lookups, &lookups, now).await;
            let second = gate.decide(path, Some(user), &lookups, &lookups, now).await;
            assert_eq!(first, second, "{path}");
        }
    }
}
