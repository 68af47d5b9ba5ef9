//! Caller-facing entry points over the network, dispatcher, and repository.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::DispatchConfig;
use crate::db::{FleetRepository, StationRecord};
use crate::definition::NetworkDefinition;
use crate::dispatch::{Assignment, GondolaDispatcher, ScheduledRoute, StationFleetState};
use crate::error::Result;
use crate::geometry::{Heuristic, Point};
use crate::network::{NodeId, RoadNetwork, SearchOptions};
use crate::platforms::adjacency_from_platforms;
use crate::request::{RouteRequest, RouteSummary};

/// Search statistics for one heuristic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeuristicReport {
    pub name: String,
    pub expansions: usize,
    pub path: Vec<NodeId>,
    /// Path length in meters; `None` when the goal is unreachable.
    pub cost: Option<f64>,
}

/// Run the same search once per heuristic and report how much work each did.
pub fn compare_heuristics(
    network: &RoadNetwork,
    start: NodeId,
    goal: NodeId,
    heuristics: &[Heuristic],
    options: &SearchOptions,
) -> Result<Vec<HeuristicReport>> {
    heuristics
        .iter()
        .map(|heuristic| {
            let outcome = network.search_with(start, goal, heuristic, options)?;
            let cost = if outcome.is_reachable() {
                Some(network.path_cost(&outcome.path)?)
            } else {
                None
            };
            Ok(HeuristicReport {
                name: heuristic.name().to_string(),
                expansions: outcome.expansions,
                path: outcome.path,
                cost,
            })
        })
        .collect()
}

/// Station records, network, and dispatcher loaded from one repository.
pub struct GondolaService {
    stations: Vec<StationRecord>,
    network: Arc<RoadNetwork>,
    dispatcher: GondolaDispatcher,
    repository: Arc<dyn FleetRepository>,
    config: DispatchConfig,
    // Held while writing fleet state so the last write always carries the
    // latest in-memory count.
    persist: Mutex<()>,
}

impl GondolaService {
    /// Store a hand-authored network definition in `repository`.
    ///
    /// Stations and platforms are written together; on failure nothing is stored.
    pub fn initialize(repository: &dyn FleetRepository, definition: &NetworkDefinition) -> Result<()> {
        definition.build_network()?;
        let platforms = definition.platforms();
        repository.store_network(&definition.stations, &platforms)?;
        info!(
            stations = definition.stations.len(),
            platforms = platforms.len(),
            "stored network definition"
        );
        Ok(())
    }

    /// Load stations, platforms, and live routes from `repository`.
    pub fn load(repository: Arc<dyn FleetRepository>, config: DispatchConfig) -> Result<Self> {
        let stations = repository.read_stations()?;
        let platforms = repository.read_platforms()?;
        let adjacency = adjacency_from_platforms(&platforms, stations.len())?;
        let network = RoadNetwork::new(stations.iter().map(StationRecord::node).collect(), &adjacency)?;

        let routes = repository.read_scheduled_routes()?;
        let dispatcher = GondolaDispatcher::from_records(
            stations.iter().map(StationRecord::fleet_state),
            routes,
            config.clone(),
        );
        debug!(stations = stations.len(), "loaded gondola service");

        Ok(Self {
            stations,
            network: Arc::new(network),
            dispatcher,
            repository,
            config,
            persist: Mutex::new(()),
        })
    }

    pub fn network(&self) -> &Arc<RoadNetwork> {
        &self.network
    }

    pub fn dispatcher(&self) -> &GondolaDispatcher {
        &self.dispatcher
    }

    pub fn stations(&self) -> &[StationRecord] {
        &self.stations
    }

    pub fn station(&self, id: NodeId) -> Option<&StationRecord> {
        self.stations.iter().find(|station| station.id == id)
    }

    /// Current idle counts, which may differ from the loaded records.
    pub fn fleet(&self) -> Vec<StationFleetState> {
        self.dispatcher.fleet()
    }

    pub fn plan_route(&self, pickup: Point, dropoff: Point) -> Result<RouteSummary> {
        RouteRequest::new(pickup, dropoff).resolve(&self.network, &self.config)
    }

    pub fn request_gondola(&self, pickup: NodeId) -> Result<Assignment> {
        self.request_gondola_at(pickup, Utc::now())
    }

    /// Assign a gondola, then persist the commit.
    ///
    /// If the repository keeps failing, the in-memory commit is rolled back
    /// and the persistence error is returned.
    pub fn request_gondola_at(&self, pickup: NodeId, now: DateTime<Utc>) -> Result<Assignment> {
        let assignment = self.dispatcher.handle_at(pickup, &self.network, now)?;
        if let Assignment::Dispatched {
            source_station,
            route,
            remaining_idle,
            ..
        } = &assignment
        {
            if let Err(err) = self.persist_dispatch(*source_station, route) {
                self.dispatcher.rollback(&assignment);
                self.restore_idle_count(*source_station);
                return Err(err);
            }
            debug!(
                source = source_station,
                remaining = remaining_idle,
                "persisted dispatch"
            );
        }
        Ok(assignment)
    }

    pub fn compare_heuristics(
        &self,
        start: NodeId,
        goal: NodeId,
        heuristics: &[Heuristic],
    ) -> Result<Vec<HeuristicReport>> {
        compare_heuristics(
            &self.network,
            start,
            goal,
            heuristics,
            &self.config.search_options(),
        )
    }

    /// Land arrived gondolas in memory and in the repository.
    pub fn settle_arrivals(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledRoute>> {
        let arrived = self.dispatcher.settle_arrivals(now);
        let _persist = self.persist_guard();
        for route in &arrived {
            let station = route.destination_station;
            self.with_retries("delete arrived route", || {
                self.repository.delete_scheduled_route(route)
            })?;
            self.with_retries("record arrival", || {
                self.repository
                    .write_station_idle_count(station, self.dispatcher.idle_count(station))
            })?;
        }
        Ok(arrived)
    }

    fn persist_guard(&self) -> MutexGuard<'_, ()> {
        self.persist.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist_dispatch(&self, source: NodeId, route: &ScheduledRoute) -> Result<()> {
        let _persist = self.persist_guard();
        self.with_retries("write idle count", || {
            self.repository
                .write_station_idle_count(source, self.dispatcher.idle_count(source))
        })?;
        self.with_retries("insert scheduled route", || {
            self.repository.insert_scheduled_route(route)
        })
    }

    /// Write back the in-memory count after a rolled back dispatch.
    fn restore_idle_count(&self, station: NodeId) {
        let _persist = self.persist_guard();
        let count = self.dispatcher.idle_count(station);
        if let Err(err) = self.repository.write_station_idle_count(station, count) {
            error!(station, count, error = %err, "failed to restore persisted idle count");
        }
    }

    fn with_retries<T>(&self, action: &str, mut operation: impl FnMut() -> Result<T>) -> Result<T> {
        let attempts = self.config.persist_attempts.max(1);
        let mut retry = 0;
        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_persistence() && retry + 1 < attempts => {
                    let delay = self.config.persist_backoff(retry);
                    warn!(
                        action,
                        retry,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "retrying repository write"
                    );
                    thread::sleep(delay);
                    retry += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl std::fmt::Debug for GondolaService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GondolaService")
            .field("stations", &self.stations.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
