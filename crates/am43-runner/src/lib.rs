//! AM43 runner library.
//!
//! Glue around [`am43_control::FleetDispatcher`] used by the `am43` binary:
//! YAML configuration loading, console logging, the response text format,
//! and the axum HTTP trigger.

pub mod config;
pub mod error;
pub mod logging;
pub mod response;
pub mod server;

pub use config::{RunnerConfig, DEFAULT_CONFIG_PATH};
pub use error::{RunnerError, RunnerResult};
pub use logging::init_tracing;
pub use response::{format_outcome, format_status, BANNER, ERROR_BODY};
pub use server::{app, bind_and_serve, serve, SharedDispatcher};
