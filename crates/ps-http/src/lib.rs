//! ps-http: Read endpoint
//!
//! Serves the published descriptor list over HTTP. The server only ever
//! reads from the cache.
//!
//! ```text
//! HttpServer
//!     ├── Middleware stack (CORS, tracing, compression, timeout, request log)
//!     └── Routes
//!         ├── GET /configs      → JSON array of descriptor strings
//!         ├── GET /configs/raw  → newline-joined text
//!         └── GET /health       → cache status
//! ```

pub mod middleware;
pub mod routes;
pub mod server;

pub use middleware::MiddlewareConfig;
pub use routes::{create_router, AppState, HealthResponse};
pub use server::{HttpServer, HttpServerBuilder, ServerHandle};

/// Error types for the HTTP server
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid bind address '{0}'")]
    InvalidBind(String),

    #[error("Server binding error: {0}")]
    BindError(#[from] std::io::Error),

    #[error("Server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ServerError>;

pub mod prelude {
    pub use super::middleware::MiddlewareConfig;
    pub use super::routes::{create_router, AppState};
    pub use super::server::{HttpServer, HttpServerBuilder, ServerHandle};
    pub use super::{Result, ServerError};
}
