//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! listener.tls set?
//!     → tls.rs (load PEM cert + key into a rustls config)
//!     → axum-server TLS acceptor
//! otherwise
//!     → plain tokio TcpListener
//! ```

pub mod tls;

pub use tls::{load_tls_config, TlsError};
