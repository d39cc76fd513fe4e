//! Script bridge for querying and editing OmniFocus tasks, projects and tags.

pub mod batch;
pub mod bridge;
pub mod commands;
pub mod config;
pub mod decode;
pub mod error;
pub mod escape;
pub mod model;
pub mod mutation;
pub mod query;
pub mod runner;
pub mod script;

pub use bridge::Bridge;
pub use error::BridgeError;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
