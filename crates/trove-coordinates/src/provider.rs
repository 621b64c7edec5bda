use std::path::Path;
use std::sync::Arc;

use crate::advisor::CoordinateAdvisor;
use crate::coordinate::ProjectCoordinate;
use crate::dependency::DependencyInfo;
use crate::registry::CoordinateRegistry;

/// Registry lookup backed by advisor discovery on a miss.
#[derive(Clone)]
pub struct ProjectCoordinateProvider {
    registry: Arc<CoordinateRegistry>,
    advisor: Arc<dyn CoordinateAdvisor>,
}

impl ProjectCoordinateProvider {
    pub fn new(registry: Arc<CoordinateRegistry>, advisor: Arc<dyn CoordinateAdvisor>) -> Self {
        Self { registry, advisor }
    }

    pub fn registry(&self) -> &Arc<CoordinateRegistry> {
        &self.registry
    }

    pub fn resolve(&self, location: &Path) -> Option<ProjectCoordinate> {
        if let Some(coordinate) = self.registry.lookup(location) {
            return Some(coordinate);
        }

        let dependency = DependencyInfo::for_location(location);
        let coordinate = self.advisor.suggest(&dependency)?;
        if let Err(err) = self.registry.set(location, coordinate.clone()) {
            tracing::warn!(
                target: "trove.coordinates",
                location = %location.display(),
                error = %err,
                "failed to record discovered coordinate"
            );
        }
        Some(coordinate)
    }
}
