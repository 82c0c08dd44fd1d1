//! Stream Gateway
//!
//! Redirects Emby playback requests to storage backends with a signed,
//! time-limited URL. Media paths come from the Emby server, special media
//! can replace the requested item on configured dates, and issued URLs are
//! cached until their token expires.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod observability;
pub mod services;
pub mod utils;

use std::sync::Arc;

// Public re-exports
pub use config::Config;
pub use error::{AppError, Result};

use services::StreamOrchestrator;

/// Shared state handed to every handler through `web::Data`
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<StreamOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<StreamOrchestrator>) -> Self {
        Self { orchestrator }
    }
}
