//! Vigil API - REST surface and evaluation protocol
//!
//! The evaluation protocol (`eval`) is the glue between the resource
//! model and the expression engine: it validates posted results against
//! metric schemas, runs objective conditions, and drives the trigger
//! state machine. The route modules are a thin JSON layer on top.

pub mod config;
pub mod error;
pub mod eval;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
