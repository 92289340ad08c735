#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Environment-driven configuration.
pub mod config;
/// HTTP error mapping.
pub mod error;
/// Route handlers and router assembly.
pub mod routes;
/// Server lifecycle.
pub mod server;
/// Shared handler state.
pub mod state;

pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use routes::router;
pub use state::AppState;
