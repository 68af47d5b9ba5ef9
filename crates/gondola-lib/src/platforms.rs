//! Boarding platforms derived from the station adjacency matrix.
//!
//! Every link between two stations is served by a pair of platforms, one at
//! each end, each pointing at its counterpart. A station therefore owns one
//! platform per neighbouring station.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::network::NodeId;

/// Platform identifier; the first generated platform is `1`.
pub type PlatformId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub id: PlatformId,
    pub station_id: NodeId,
    pub target_platform_id: PlatformId,
    pub current_people: u32,
    pub is_open: bool,
}

/// Generate the platform pairs for a symmetric adjacency matrix.
///
/// Links are visited in row-major order over the upper triangle. The link
/// `(i, j)` produces platform `k` at station `i` and platform `k + 1` at
/// station `j`, targeting each other.
pub fn generate_platforms(adjacency: &[Vec<u8>]) -> Vec<Platform> {
    let mut platforms = Vec::new();
    let mut next_id: PlatformId = 1;
    for (i, row) in adjacency.iter().enumerate() {
        for (j, &linked) in row.iter().enumerate().skip(i + 1) {
            if linked == 0 {
                continue;
            }
            platforms.push(Platform {
                id: next_id,
                station_id: i,
                target_platform_id: next_id + 1,
                current_people: 0,
                is_open: true,
            });
            platforms.push(Platform {
                id: next_id + 1,
                station_id: j,
                target_platform_id: next_id,
                current_people: 0,
                is_open: true,
            });
            next_id += 2;
        }
    }
    platforms
}

/// Rebuild the `station_count`-square adjacency matrix described by `platforms`.
pub fn adjacency_from_platforms(
    platforms: &[Platform],
    station_count: usize,
) -> Result<Vec<Vec<u8>>> {
    let by_id: HashMap<PlatformId, &Platform> =
        platforms.iter().map(|platform| (platform.id, platform)).collect();

    let mut matrix = vec![vec![0u8; station_count]; station_count];
    for platform in platforms {
        let target = by_id.get(&platform.target_platform_id).ok_or_else(|| {
            Error::topology(format!(
                "platform {} targets missing platform {}",
                platform.id, platform.target_platform_id
            ))
        })?;
        let (from, to) = (platform.station_id, target.station_id);
        if from >= station_count || to >= station_count {
            return Err(Error::topology(format!(
                "platform {} links station {from} to {to} outside 0..{station_count}",
                platform.id
            )));
        }
        if from == to {
            return Err(Error::topology(format!(
                "platform {} links station {from} to itself",
                platform.id
            )));
        }
        matrix[from][to] = 1;
        matrix[to][from] = 1;
    }
    Ok(matrix)
}

/// Platforms belonging to `station`, in id order.
pub fn platforms_at(platforms: &[Platform], station: NodeId) -> Vec<&Platform> {
    let mut found: Vec<&Platform> = platforms
        .iter()
        .filter(|platform| platform.station_id == station)
        .collect();
    found.sort_by_key(|platform| platform.id);
    found
}
