//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → every server stops accepting → drains in-flight requests → exit
//! ```
//!
//! # Design Decisions
//! - One broadcast fans out to the gate listener and the admin listener
//! - Draining is bounded: main waits at most a deadline for servers to finish

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
