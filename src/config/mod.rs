//! Configuration for jobgate.
//!
//! Layers, lowest first: built-in defaults, an optional YAML file,
//! `JOBGATE_*` environment variables, command-line flags. The result is
//! validated once and resolved into an immutable `JobConfig`; nothing below
//! this layer reads the environment.

mod model;
mod operations;

#[cfg(test)]
mod tests;

pub use model::Config;
pub use operations::{
    ConfigOverrides, ENV_DURATION_SECONDS, ENV_INSTANCE_NAME, ENV_LOCK_FILE, ENV_LOCK_STRATEGY,
    ENV_MARKER_DIR, JobConfig,
};
