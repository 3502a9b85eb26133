//! Access gate for the Santuario wellness video platform.
//!
//! Sits in front of the page application, classifies every request path,
//! and either forwards it or redirects the caller to login, the paywall or
//! their landing page.

pub mod admin;
pub mod config;
pub mod gate;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod store;

pub use config::schema::GateConfig;
pub use gate::{AccessGate, Outcome};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use store::Backends;
