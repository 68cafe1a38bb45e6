//! Live mirror of an evohome heating installation.
//!
//! [`engine::Engine`] bootstraps the installation tree once, then two
//! background threads keep zone temperatures and schedules fresh while
//! callers read zones through [`model::ControlSystem`] and push overrides.

pub mod models {
    pub mod evohome;
}

pub mod client;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod merge;
pub mod model;
pub mod shutdown;
pub mod source;
pub mod view;
pub mod services {
    pub mod schedule;
    pub mod sync;
    pub mod temperature;
}

#[cfg(test)]
mod testing;

pub use engine::Engine;
pub use error::{EvohomeError, Result};
pub use source::RemoteDataSource;
