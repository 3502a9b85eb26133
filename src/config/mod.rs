//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, redirect-loop detection)
//!     → GateConfig (validated, immutable)
//!     → shared with all subsystems
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server swaps in a new AccessGate (route table + redirect targets)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Only the gate policy reloads live; listener and backend need a restart

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, BackendConfig, BackendKind, GateConfig, GateSettings, ListenerConfig, LogFormat,
    ObservabilityConfig, RouteConfig, SecurityConfig, SessionConfig, TimeoutConfig, TlsConfig,
    UpstreamConfig,
};
pub use watcher::ConfigWatcher;
