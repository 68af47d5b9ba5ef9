use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::db::StationRecord;
use crate::error::Result;
use crate::network::RoadNetwork;
use crate::platforms::{generate_platforms, Platform};

/// Stations plus the adjacency matrix linking them, as authored by hand.
///
/// ```json
/// {
///   "stations": [
///     { "id": 0, "name": "Harbour", "x": 0.0, "y": 0.0, "idle_gondola_count": 2, "is_main": true },
///     { "id": 1, "name": "Market", "x": 40.0, "y": 12.0 }
///   ],
///   "adjacency": [[0, 1], [1, 0]]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkDefinition {
    pub stations: Vec<StationRecord>,
    pub adjacency: Vec<Vec<u8>>,
}

impl NetworkDefinition {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Validate the definition and build its network.
    pub fn build_network(&self) -> Result<RoadNetwork> {
        let nodes = self.stations.iter().map(StationRecord::node).collect();
        RoadNetwork::new(nodes, &self.adjacency)
    }

    pub fn platforms(&self) -> Vec<Platform> {
        generate_platforms(&self.adjacency)
    }
}
