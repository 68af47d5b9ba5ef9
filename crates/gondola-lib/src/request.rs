use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DispatchConfig;
use crate::error::{Error, Result};
use crate::geometry::{Heuristic, Point};
use crate::network::{Node, NodeId, RoadNetwork};

/// A passenger's pickup and drop-off coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub pickup: Point,
    pub dropoff: Point,
}

/// Station-to-station route found for a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedRoute {
    pub station_path: Vec<NodeId>,
    /// Length of the path in meters.
    pub total_distance: f64,
    pub eta_minutes: f64,
}

/// Whether the resolved stations are connected.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RouteOutcome {
    Found(PlannedRoute),
    NoRoute,
}

/// Answer to a [`RouteRequest`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSummary {
    pub pickup_station: NodeId,
    pub dropoff_station: NodeId,
    pub expansions: usize,
    #[serde(flatten)]
    pub outcome: RouteOutcome,
}

impl RouteSummary {
    pub fn route(&self) -> Option<&PlannedRoute> {
        match &self.outcome {
            RouteOutcome::Found(route) => Some(route),
            RouteOutcome::NoRoute => None,
        }
    }
}

impl RouteRequest {
    pub fn new(pickup: impl Into<Point>, dropoff: impl Into<Point>) -> Self {
        Self {
            pickup: pickup.into(),
            dropoff: dropoff.into(),
        }
    }

    /// Snap both endpoints to their nearest stations and plan the route
    /// between them with the Euclidean heuristic.
    pub fn resolve(&self, network: &RoadNetwork, config: &DispatchConfig) -> Result<RouteSummary> {
        let pickup = nearest_station(network, &self.pickup)?.id;
        let dropoff = nearest_station(network, &self.dropoff)?.id;

        let search = network.search_with(
            pickup,
            dropoff,
            &Heuristic::Euclidean,
            &config.search_options(),
        )?;

        let outcome = if search.is_reachable() {
            let total_distance = network.path_cost(&search.path)?;
            RouteOutcome::Found(PlannedRoute {
                eta_minutes: config.travel_minutes(total_distance),
                total_distance,
                station_path: search.path,
            })
        } else {
            RouteOutcome::NoRoute
        };

        debug!(
            pickup_station = pickup,
            dropoff_station = dropoff,
            reachable = matches!(outcome, RouteOutcome::Found(_)),
            "resolved route request"
        );

        Ok(RouteSummary {
            pickup_station: pickup,
            dropoff_station: dropoff,
            expansions: search.expansions,
            outcome,
        })
    }
}

/// Station closest to `point`; ties go to the lowest id.
pub fn nearest_station<'a>(network: &'a RoadNetwork, point: &Point) -> Result<&'a Node> {
    let mut nodes = network.nodes().iter();
    let mut best = nodes.next().ok_or(Error::EmptyNetwork)?;
    let mut best_distance = best.position.euclidean_distance(point);
    for node in nodes {
        let distance = node.position.euclidean_distance(point);
        if distance < best_distance {
            best = node;
            best_distance = distance;
        }
    }
    Ok(best)
}
