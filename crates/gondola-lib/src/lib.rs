//! Gondola network library entry points.
//!
//! This crate models an aerial cable-car network as a weighted station graph,
//! finds shortest station-to-station paths with A* under pluggable
//! heuristics, and decides which gondola serves each ride request. Higher
//! level consumers (the CLI) should only depend on the items exported here.
//!

#![deny(warnings)]

pub mod config;
pub mod db;
pub mod definition;
pub mod dispatch;
pub mod error;
pub mod frontier;
pub mod geometry;
pub mod network;
pub mod platforms;
pub mod request;
pub mod service;

pub use config::{default_database_path, resolve_database_path, DispatchConfig};
pub use db::{FleetRepository, MemoryRepository, SqliteRepository, StationRecord};
pub use definition::NetworkDefinition;
pub use dispatch::{Assignment, GondolaDispatcher, ScheduledRoute, StationFleetState};
pub use error::{Error, Result};
pub use frontier::PriorityFrontier;
pub use geometry::{DistanceMetric, Heuristic, Point, METERS_PER_UNIT};
pub use network::{
    Node, NodeId, RoadNetwork, SearchContext, SearchOptions, SearchOutcome, SearchState,
};
pub use platforms::{
    adjacency_from_platforms, generate_platforms, platforms_at, Platform, PlatformId,
};
pub use request::{nearest_station, PlannedRoute, RouteOutcome, RouteRequest, RouteSummary};
pub use service::{compare_heuristics, GondolaService, HeuristicReport};
