//! Business logic services

pub mod catalog;
pub mod fines;
pub mod loans;
pub mod requests;
pub mod reservations;
pub mod stats;

use crate::{config::CirculationConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub reservations: reservations::ReservationsService,
    pub requests: requests::RequestsService,
    pub stats: stats::StatsService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, circulation: CirculationConfig) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            requests: requests::RequestsService::new(repository.clone(), &circulation),
            reservations: reservations::ReservationsService::new(repository.clone()),
            stats: stats::StatsService::new(repository.clone(), fines::FinePolicy::new(&circulation)),
            loans: loans::LoansService::new(repository, circulation),
        }
    }

    /// Readiness of the backing store
    pub async fn ping(&self) -> crate::error::AppResult<()> {
        self.catalog.ping().await
    }
}
