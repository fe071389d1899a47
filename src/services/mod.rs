//! Business logic services

pub mod circulation;

use std::sync::Arc;

use crate::{config::LoansConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub circulation: circulation::CirculationService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, loans: &LoansConfig) -> Self {
        Self {
            circulation: circulation::CirculationService::new(Arc::new(repository), loans),
        }
    }
}
