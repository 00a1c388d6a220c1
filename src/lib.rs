//! Librarium circulation server
//!
//! Catalog, loans, reservations and self-service issue requests for a school
//! library, exposed as a library and as a REST JSON API.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    pub fn new(config: AppConfig, repository: repository::Repository) -> Self {
        let services = services::Services::new(repository, config.circulation.clone());
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
