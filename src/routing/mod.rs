//! Route classification subsystem.
//!
//! # Data Flow
//! ```text
//! Request path
//!     → canonical.rs (decode once, resolve `//`, `.`, `..`)
//!     → matcher.rs (normalise, evaluate exact / prefix conditions)
//!     → table.rs (first matching entry)
//!     → Return: AccessLevel or unclassified
//!
//! Table compilation (startup and reload):
//!     RouteConfig[] (empty = built-in policy)
//!     → PathMatcher per entry, order preserved
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Tables compiled once, swapped whole on reload
//! - Deterministic: same path always yields the same level
//! - First match wins (table order is policy order)

pub mod canonical;
pub mod matcher;
pub mod table;

pub use canonical::{canonicalize_path, encode_path, PathError};
pub use matcher::{normalize_path, MatchKind, PathMatcher};
pub use table::{AccessLevel, Route, RouteTable};
