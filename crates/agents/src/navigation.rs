use std::sync::Arc;
use std::time::Duration;

use raksha_core::{
    select_shortest_route, Coordinate, DirectionsError, DirectionsSource, NavigationProgress,
    RouteError, RouteSelection,
};
use raksha_observability::AppMetrics;
use raksha_remote::DEFAULT_DIRECTIONS_TIMEOUT;
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NavigationError {
    #[error("directions request timed out after {0:?}")]
    Timeout(Duration),
    #[error("could not fetch directions: {0}")]
    Fetch(#[from] DirectionsError),
    #[error(transparent)]
    Route(#[from] RouteError),
}

#[derive(Clone)]
pub struct NavigationAgent<D>
where
    D: DirectionsSource,
{
    directions: Arc<D>,
    metrics: Arc<AppMetrics>,
    timeout: Duration,
}

impl<D> NavigationAgent<D>
where
    D: DirectionsSource,
{
    pub fn new(directions: Arc<D>, metrics: Arc<AppMetrics>) -> Self {
        Self {
            directions,
            metrics,
            timeout: DEFAULT_DIRECTIONS_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetches alternatives between two points and marks the shortest.
    #[instrument(skip(self))]
    pub async fn plan(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<RouteSelection, NavigationError> {
        self.metrics.inc_request();
        let routes = tokio::time::timeout(
            self.timeout,
            self.directions.fetch_routes(origin, destination),
        )
        .await
        .map_err(|_| NavigationError::Timeout(self.timeout))??;

        Ok(self.select(&routes)?)
    }

    /// Route selection over an already fetched directions payload.
    pub fn select(&self, routes: &[raksha_core::RawRoute]) -> Result<RouteSelection, RouteError> {
        match select_shortest_route(routes) {
            Ok(selection) => {
                self.metrics.inc_route_selected();
                self.metrics.add_route_rejections(selection.rejected.len());
                for rejected in &selection.rejected {
                    warn!(
                        route_index = rejected.route_index,
                        reason = %rejected.reason,
                        "route rejected"
                    );
                }
                info!(
                    preferred_index = selection.preferred_index,
                    candidates = selection.candidates.len(),
                    rejected = selection.rejected.len(),
                    "route selected"
                );
                Ok(selection)
            }
            Err(err) => {
                if let RouteError::NoUsableRoute { rejected } = &err {
                    self.metrics.add_route_rejections(rejected.len());
                }
                warn!(error = %err, "route selection failed");
                Err(err)
            }
        }
    }

    pub fn progress(&self, current: Coordinate, destination: Coordinate) -> NavigationProgress {
        NavigationProgress::between(current, destination)
    }
}
