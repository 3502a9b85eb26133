//! Access gate subsystem.
//!
//! # Data Flow
//! ```text
//! path + Option<Session>
//!     → routing (classify: public / auth / auth_only / protected / admin)
//!     → decision.rs (ordered checks, lazy role + subscription reads)
//!     → subscription.rs (single validity predicate)
//!     → Outcome: allow | login | paywall | landing
//! ```
//!
//! # Design Decisions
//! - Pure with respect to request state; lookups injected as traits
//! - Fail closed: a failed read never grants access
//! - The gate never returns an error, only an outcome

pub mod clock;
pub mod decision;
pub mod outcome;
pub mod stats;
pub mod subscription;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use decision::{AccessGate, LookupMode};
pub use outcome::{GatePaths, Outcome};
pub use stats::{DecisionStats, StatsSnapshot};
pub use subscription::is_subscription_valid;
pub use types::{Role, Session, Subscription, SubscriptionStatus};
