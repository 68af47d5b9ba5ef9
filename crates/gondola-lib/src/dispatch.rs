//! Fleet state and the gondola assignment policy.
//!
//! A request for a pickup station is served by whichever gondola reaches it
//! first: an idle gondola sent from some station, or a gondola already in
//! flight towards the pickup station. Candidates are evaluated on a snapshot
//! of the fleet without holding the fleet lock; the commit re-validates the
//! chosen candidate under the lock and re-evaluates if a concurrent request
//! claimed it first.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::DispatchConfig;
use crate::error::{Error, Result};
use crate::geometry::Heuristic;
use crate::network::{NodeId, RoadNetwork};

/// A gondola in transit between two stations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledRoute {
    pub origin_station: NodeId,
    pub destination_station: NodeId,
    pub expected_arrival: DateTime<Utc>,
}

impl ScheduledRoute {
    /// Minutes left before arrival, zero once the arrival time has passed.
    pub fn minutes_until_arrival(&self, now: DateTime<Utc>) -> f64 {
        let remaining = (self.expected_arrival - now).num_milliseconds() as f64 / 60_000.0;
        remaining.max(0.0)
    }
}

/// Idle gondolas parked at one station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationFleetState {
    pub station_id: NodeId,
    pub idle_gondola_count: u32,
}

/// Decision taken for a gondola request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Assignment {
    /// An idle gondola was sent from `source_station`.
    Dispatched {
        source_station: NodeId,
        wait_minutes: f64,
        path: Vec<NodeId>,
        route: ScheduledRoute,
        /// Idle gondolas left at `source_station` after the commit.
        remaining_idle: u32,
    },
    /// A gondola already heading to the pickup station will serve the request.
    EnRoute {
        wait_minutes: f64,
        route: ScheduledRoute,
    },
    /// No idle gondola can reach the station and none is inbound.
    Unavailable,
}

impl Assignment {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, Assignment::Dispatched { .. })
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Assignment::Unavailable)
    }

    pub fn wait_minutes(&self) -> Option<f64> {
        match self {
            Assignment::Dispatched { wait_minutes, .. } | Assignment::EnRoute { wait_minutes, .. } => {
                Some(*wait_minutes)
            }
            Assignment::Unavailable => None,
        }
    }

    pub fn path(&self) -> Option<&[NodeId]> {
        match self {
            Assignment::Dispatched { path, .. } => Some(path.as_slice()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct FleetState {
    idle: BTreeMap<NodeId, u32>,
    routes: Vec<ScheduledRoute>,
}

#[derive(Debug)]
struct IdleCandidate {
    source: NodeId,
    wait_minutes: f64,
    expected_arrival: DateTime<Utc>,
    path: Vec<NodeId>,
}

#[derive(Debug)]
struct InboundCandidate {
    wait_minutes: f64,
    route: ScheduledRoute,
}

#[derive(Debug)]
enum Decision {
    Dispatch(IdleCandidate),
    Await(InboundCandidate),
    Unavailable,
}

/// Shared fleet state plus the assignment algorithm.
#[derive(Debug)]
pub struct GondolaDispatcher {
    fleet: Mutex<FleetState>,
    config: DispatchConfig,
}

impl GondolaDispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            fleet: Mutex::new(FleetState::default()),
            config,
        }
    }

    /// Seed the dispatcher with persisted station counts and live routes.
    pub fn from_records(
        stations: impl IntoIterator<Item = StationFleetState>,
        routes: Vec<ScheduledRoute>,
        config: DispatchConfig,
    ) -> Self {
        let idle = stations
            .into_iter()
            .map(|station| (station.station_id, station.idle_gondola_count))
            .collect();
        Self {
            fleet: Mutex::new(FleetState { idle, routes }),
            config,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, FleetState> {
        self.fleet.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_idle_count(&self, station: NodeId, count: u32) {
        self.lock().idle.insert(station, count);
    }

    pub fn idle_count(&self, station: NodeId) -> u32 {
        self.lock().idle.get(&station).copied().unwrap_or(0)
    }

    /// Idle counts for every tracked station, in ascending station order.
    pub fn fleet(&self) -> Vec<StationFleetState> {
        self.lock()
            .idle
            .iter()
            .map(|(&station_id, &idle_gondola_count)| StationFleetState {
                station_id,
                idle_gondola_count,
            })
            .collect()
    }

    pub fn scheduled_routes(&self) -> Vec<ScheduledRoute> {
        self.lock().routes.clone()
    }

    /// Track a gondola that departed outside this dispatcher.
    pub fn schedule(&self, route: ScheduledRoute) {
        self.lock().routes.push(route);
    }

    /// Assign a gondola to `pickup` as of the current time.
    pub fn handle(&self, pickup: NodeId, network: &RoadNetwork) -> Result<Assignment> {
        self.handle_at(pickup, network, Utc::now())
    }

    /// Assign a gondola to `pickup` as of `now`.
    pub fn handle_at(
        &self,
        pickup: NodeId,
        network: &RoadNetwork,
        now: DateTime<Utc>,
    ) -> Result<Assignment> {
        self.handle_cancellable(pickup, network, now, &AtomicBool::new(false))
    }

    /// Assign a gondola to `pickup`, abandoning the request with
    /// [`Error::Cancelled`] once `cancelled` is set.
    pub fn handle_cancellable(
        &self,
        pickup: NodeId,
        network: &RoadNetwork,
        now: DateTime<Utc>,
        cancelled: &AtomicBool,
    ) -> Result<Assignment> {
        network.node(pickup)?;
        let attempts = self.config.commit_attempts.max(1);

        for attempt in 1..=attempts {
            let snapshot = self.lock().clone();
            let decision = self.evaluate(pickup, network, now, &snapshot, cancelled)?;

            if cancelled.load(Ordering::Relaxed) {
                return Err(Error::Cancelled { station: pickup });
            }

            if let Some(assignment) = self.commit(pickup, now, decision) {
                return Ok(assignment);
            }
            warn!(
                station = pickup,
                attempt, "dispatch candidate claimed concurrently; re-evaluating"
            );
        }

        Err(Error::DispatchContention {
            station: pickup,
            attempts,
        })
    }

    fn evaluate(
        &self,
        pickup: NodeId,
        network: &RoadNetwork,
        now: DateTime<Utc>,
        fleet: &FleetState,
        cancelled: &AtomicBool,
    ) -> Result<Decision> {
        let options = self.config.search_options();

        let mut best_idle: Option<IdleCandidate> = None;
        for (&station, &count) in &fleet.idle {
            if count == 0 {
                continue;
            }
            if !network.contains(station) {
                debug!(station, "skipping idle gondolas at a station outside the network");
                continue;
            }
            if cancelled.load(Ordering::Relaxed) {
                return Err(Error::Cancelled { station: pickup });
            }

            let outcome = network.search_with(station, pickup, &Heuristic::Euclidean, &options)?;
            if !outcome.is_reachable() {
                continue;
            }
            let wait_minutes = self.config.travel_minutes(network.path_cost(&outcome.path)?);
            let Some(expected_arrival) = arrival_after(now, wait_minutes) else {
                warn!(
                    station,
                    pickup,
                    wait_minutes,
                    "skipping idle gondola whose arrival time is out of range"
                );
                continue;
            };
            if improves(best_idle.as_ref().map(|best| best.wait_minutes), wait_minutes) {
                best_idle = Some(IdleCandidate {
                    source: station,
                    wait_minutes,
                    expected_arrival,
                    path: outcome.path,
                });
            }
        }

        let mut best_inbound: Option<InboundCandidate> = None;
        for route in fleet
            .routes
            .iter()
            .filter(|route| route.destination_station == pickup)
        {
            let wait_minutes = route.minutes_until_arrival(now);
            if improves(best_inbound.as_ref().map(|best| best.wait_minutes), wait_minutes) {
                best_inbound = Some(InboundCandidate {
                    wait_minutes,
                    route: route.clone(),
                });
            }
        }

        debug!(
            station = pickup,
            idle_wait = best_idle.as_ref().map(|c| c.wait_minutes),
            inbound_wait = best_inbound.as_ref().map(|c| c.wait_minutes),
            "evaluated dispatch candidates"
        );

        // An inbound gondola wins ties so no extra gondola is pulled into service.
        Ok(match (best_idle, best_inbound) {
            (Some(idle), Some(inbound)) if idle.wait_minutes < inbound.wait_minutes => {
                Decision::Dispatch(idle)
            }
            (_, Some(inbound)) => Decision::Await(inbound),
            (Some(idle), None) => Decision::Dispatch(idle),
            (None, None) => Decision::Unavailable,
        })
    }

    /// Apply `decision` if it still holds; `None` means it went stale.
    fn commit(&self, pickup: NodeId, _now: DateTime<Utc>, decision: Decision) -> Option<Assignment> {
        let mut fleet = self.lock();
        match decision {
            Decision::Dispatch(candidate) => {
                let idle = fleet.idle.get_mut(&candidate.source)?;
                if *idle == 0 {
                    return None;
                }
                *idle -= 1;
                let remaining_idle = *idle;

                let route = ScheduledRoute {
                    origin_station: candidate.source,
                    destination_station: pickup,
                    expected_arrival: candidate.expected_arrival,
                };
                fleet.routes.push(route.clone());
                info!(
                    source = candidate.source,
                    station = pickup,
                    wait_minutes = candidate.wait_minutes,
                    "dispatched idle gondola"
                );
                Some(Assignment::Dispatched {
                    source_station: candidate.source,
                    wait_minutes: candidate.wait_minutes,
                    path: candidate.path,
                    route,
                    remaining_idle,
                })
            }
            Decision::Await(candidate) => {
                if !fleet.routes.contains(&candidate.route) {
                    return None;
                }
                debug!(
                    station = pickup,
                    origin = candidate.route.origin_station,
                    wait_minutes = candidate.wait_minutes,
                    "request served by inbound gondola"
                );
                Some(Assignment::EnRoute {
                    wait_minutes: candidate.wait_minutes,
                    route: candidate.route,
                })
            }
            Decision::Unavailable => {
                debug!(station = pickup, "no gondola available");
                Some(Assignment::Unavailable)
            }
        }
    }

    /// Undo a committed dispatch whose persistence failed.
    pub fn rollback(&self, assignment: &Assignment) {
        let Assignment::Dispatched {
            source_station,
            route,
            ..
        } = assignment
        else {
            return;
        };

        let mut fleet = self.lock();
        *fleet.idle.entry(*source_station).or_insert(0) += 1;
        if let Some(index) = fleet.routes.iter().position(|existing| existing == route) {
            fleet.routes.remove(index);
        }
        warn!(
            source = source_station,
            station = route.destination_station,
            "rolled back dispatch"
        );
    }

    /// Land every gondola whose expected arrival is at or before `now`,
    /// returning the completed routes.
    pub fn settle_arrivals(&self, now: DateTime<Utc>) -> Vec<ScheduledRoute> {
        let mut fleet = self.lock();
        let (arrived, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut fleet.routes)
            .into_iter()
            .partition(|route| route.expected_arrival <= now);
        fleet.routes = pending;
        for route in &arrived {
            *fleet.idle.entry(route.destination_station).or_insert(0) += 1;
        }
        if !arrived.is_empty() {
            info!(arrivals = arrived.len(), "settled gondola arrivals");
        }
        arrived
    }
}

fn improves(best: Option<f64>, candidate: f64) -> bool {
    match best {
        Some(best) => candidate < best,
        None => true,
    }
}

/// `now` plus `wait_minutes`, or `None` when the wait is not finite or the
/// arrival falls outside the representable time range.
fn arrival_after(now: DateTime<Utc>, wait_minutes: f64) -> Option<DateTime<Utc>> {
    let millis = (wait_minutes * 60_000.0).round();
    if !millis.is_finite() || millis < 0.0 || millis >= i64::MAX as f64 {
        return None;
    }
    now.checked_add_signed(TimeDelta::try_milliseconds(millis as i64)?)
}
