//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, layers)
//!     → request.rs (request ID, session token extraction)
//!     → middleware/access_control.rs (gate decision)
//!     → response.rs (redirect)          on deny
//!     → proxy.rs (forward to upstream)  on allow
//!     → Send to client
//! ```

pub mod middleware;
pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use middleware::GateContext;
pub use proxy::{Upstream, UpstreamError};
pub use request::{session_token, X_GATE_USER_ID, X_REQUEST_ID};
pub use response::redirect;
pub use server::{AppState, HttpServer};
