//! Persistence of stations, platforms, and scheduled routes.
//!
//! The core only talks to storage through [`FleetRepository`]; statements are
//! fixed and parameterized, no query text crosses the boundary.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dispatch::{ScheduledRoute, StationFleetState};
use crate::error::{Error, Result};
use crate::network::{Node, NodeId};
use crate::platforms::Platform;

/// A persisted station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    pub id: NodeId,
    #[serde(default)]
    pub name: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub idle_gondola_count: u32,
    #[serde(default)]
    pub is_main: bool,
}

impl StationRecord {
    pub fn node(&self) -> Node {
        Node::new(self.id, self.x, self.y)
    }

    pub fn fleet_state(&self) -> StationFleetState {
        StationFleetState {
            station_id: self.id,
            idle_gondola_count: self.idle_gondola_count,
        }
    }

    /// Name for display, falling back to the numeric id.
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            format!("#{}", self.id)
        } else {
            self.name.clone()
        }
    }
}

/// Storage collaborator for fleet and topology records.
pub trait FleetRepository: Send + Sync {
    fn read_stations(&self) -> Result<Vec<StationRecord>>;

    fn read_scheduled_routes(&self) -> Result<Vec<ScheduledRoute>>;

    fn write_station_idle_count(&self, station: NodeId, count: u32) -> Result<()>;

    fn insert_scheduled_route(&self, route: &ScheduledRoute) -> Result<()>;

    /// Remove one stored copy of `route`; missing routes are not an error.
    fn delete_scheduled_route(&self, route: &ScheduledRoute) -> Result<()>;

    fn insert_station(&self, station: &StationRecord) -> Result<()>;

    fn read_platforms(&self) -> Result<Vec<Platform>>;

    fn insert_platforms(&self, platforms: &[Platform]) -> Result<()>;

    /// Store stations and platforms as one unit: either all rows land or none do.
    fn store_network(&self, stations: &[StationRecord], platforms: &[Platform]) -> Result<()>;
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS stations (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL DEFAULT '',
    localisation_x REAL NOT NULL,
    localisation_y REAL NOT NULL,
    current_gondola INTEGER NOT NULL DEFAULT 0,
    is_main INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS platforms (
    id INTEGER PRIMARY KEY,
    station_id INTEGER NOT NULL REFERENCES stations(id),
    target_platform_id INTEGER NOT NULL,
    current_people INTEGER NOT NULL DEFAULT 0,
    is_open INTEGER NOT NULL DEFAULT 1
);
CREATE TABLE IF NOT EXISTS scheduled_routes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    origin_id INTEGER NOT NULL REFERENCES stations(id),
    destination_id INTEGER NOT NULL REFERENCES stations(id),
    expected_arrival TEXT NOT NULL
);
";

/// SQLite-backed repository.
#[derive(Debug)]
pub struct SqliteRepository {
    connection: Mutex<Connection>,
}

impl SqliteRepository {
    /// Open (creating if needed) the database at `path` and ensure the schema.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let connection = Connection::open(path)?;
        debug!(path = %path.display(), "opened fleet database");
        Self::with_connection(connection)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(connection: Connection) -> Result<Self> {
        connection.execute_batch(SCHEMA)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn connection(&self) -> MutexGuard<'_, Connection> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl FleetRepository for SqliteRepository {
    fn read_stations(&self) -> Result<Vec<StationRecord>> {
        let connection = self.connection();
        let mut stmt = connection.prepare(
            "SELECT id, name, localisation_x, localisation_y, current_gondola, is_main \
             FROM stations ORDER BY id",
        )?;
        let rows = stmt.query_map([], row_to_station)?;
        let mut stations = Vec::new();
        for row in rows {
            stations.push(row?);
        }
        Ok(stations)
    }

    fn read_scheduled_routes(&self) -> Result<Vec<ScheduledRoute>> {
        let connection = self.connection();
        let mut stmt = connection.prepare(
            "SELECT origin_id, destination_id, expected_arrival FROM scheduled_routes ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut routes = Vec::new();
        for row in rows {
            let (origin, destination, arrival) = row?;
            routes.push(ScheduledRoute {
                origin_station: to_node_id(origin)?,
                destination_station: to_node_id(destination)?,
                expected_arrival: parse_timestamp(&arrival)?,
            });
        }
        Ok(routes)
    }

    fn write_station_idle_count(&self, station: NodeId, count: u32) -> Result<()> {
        let updated = self.connection().execute(
            "UPDATE stations SET current_gondola = ?1 WHERE id = ?2",
            params![count, to_sql_id(station)?],
        )?;
        if updated == 0 {
            return Err(Error::persistence(format!("station {station} is not stored")));
        }
        Ok(())
    }

    fn insert_scheduled_route(&self, route: &ScheduledRoute) -> Result<()> {
        self.connection().execute(
            "INSERT INTO scheduled_routes (origin_id, destination_id, expected_arrival) \
             VALUES (?1, ?2, ?3)",
            params![
                to_sql_id(route.origin_station)?,
                to_sql_id(route.destination_station)?,
                route.expected_arrival.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn delete_scheduled_route(&self, route: &ScheduledRoute) -> Result<()> {
        let connection = self.connection();
        let row_id: Option<i64> = connection
            .query_row(
                "SELECT id FROM scheduled_routes \
                 WHERE origin_id = ?1 AND destination_id = ?2 AND expected_arrival = ?3 \
                 ORDER BY id LIMIT 1",
                params![
                    to_sql_id(route.origin_station)?,
                    to_sql_id(route.destination_station)?,
                    route.expected_arrival.to_rfc3339(),
                ],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(row_id) = row_id {
            connection.execute("DELETE FROM scheduled_routes WHERE id = ?1", params![row_id])?;
        }
        Ok(())
    }

    fn insert_station(&self, station: &StationRecord) -> Result<()> {
        let mut connection = self.connection();
        let tx = connection.transaction()?;
        insert_station_rows(&tx, std::slice::from_ref(station))?;
        tx.commit()?;
        Ok(())
    }

    fn read_platforms(&self) -> Result<Vec<Platform>> {
        let connection = self.connection();
        let mut stmt = connection.prepare(
            "SELECT id, station_id, target_platform_id, current_people, is_open \
             FROM platforms ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, bool>(4)?,
            ))
        })?;

        let mut platforms = Vec::new();
        for row in rows {
            let (id, station, target_platform_id, current_people, is_open) = row?;
            platforms.push(Platform {
                id,
                station_id: to_node_id(station)?,
                target_platform_id,
                current_people,
                is_open,
            });
        }
        Ok(platforms)
    }

    fn insert_platforms(&self, platforms: &[Platform]) -> Result<()> {
        let mut connection = self.connection();
        let tx = connection.transaction()?;
        insert_platform_rows(&tx, platforms)?;
        tx.commit()?;
        Ok(())
    }

    fn store_network(&self, stations: &[StationRecord], platforms: &[Platform]) -> Result<()> {
        let mut connection = self.connection();
        // Dropping the transaction on an early return rolls it back.
        let tx = connection.transaction()?;
        insert_station_rows(&tx, stations)?;
        insert_platform_rows(&tx, platforms)?;
        tx.commit()?;
        debug!(
            stations = stations.len(),
            platforms = platforms.len(),
            "stored network"
        );
        Ok(())
    }
}

fn insert_station_rows(tx: &Transaction<'_>, stations: &[StationRecord]) -> Result<()> {
    let mut stmt = tx.prepare(
        "INSERT OR REPLACE INTO stations \
         (id, name, localisation_x, localisation_y, current_gondola, is_main) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for station in stations {
        stmt.execute(params![
            to_sql_id(station.id)?,
            station.name,
            station.x,
            station.y,
            station.idle_gondola_count,
            station.is_main,
        ])?;
    }
    Ok(())
}

fn insert_platform_rows(tx: &Transaction<'_>, platforms: &[Platform]) -> Result<()> {
    let mut stmt = tx.prepare(
        "INSERT OR REPLACE INTO platforms \
         (id, station_id, target_platform_id, current_people, is_open) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for platform in platforms {
        stmt.execute(params![
            platform.id,
            to_sql_id(platform.station_id)?,
            platform.target_platform_id,
            platform.current_people,
            platform.is_open,
        ])?;
    }
    Ok(())
}

fn row_to_station(row: &Row<'_>) -> rusqlite::Result<StationRecord> {
    let id: i64 = row.get(0)?;
    Ok(StationRecord {
        id: NodeId::try_from(id).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Integer, Box::new(err))
        })?,
        name: row.get(1)?,
        x: row.get(2)?,
        y: row.get(3)?,
        idle_gondola_count: row.get(4)?,
        is_main: row.get(5)?,
    })
}

fn to_node_id(value: i64) -> Result<NodeId> {
    NodeId::try_from(value).map_err(|_| Error::persistence(format!("invalid station id {value}")))
}

fn to_sql_id(value: NodeId) -> Result<i64> {
    i64::try_from(value).map_err(|_| Error::persistence(format!("station id {value} out of range")))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| Error::persistence(format!("invalid arrival timestamp {value:?}: {err}")))
}

#[derive(Debug, Default)]
struct MemoryState {
    stations: Vec<StationRecord>,
    routes: Vec<ScheduledRoute>,
    platforms: Vec<Platform>,
}

impl MemoryState {
    fn put_station(&mut self, station: &StationRecord) {
        self.stations.retain(|record| record.id != station.id);
        self.stations.push(station.clone());
    }

    fn put_platforms(&mut self, platforms: &[Platform]) {
        for platform in platforms {
            self.platforms.retain(|stored| stored.id != platform.id);
            self.platforms.push(platform.clone());
        }
    }
}

/// In-process repository, with an optional write-failure switch for
/// exercising rollback paths.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: Mutex<MemoryState>,
    fail_writes: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with [`Error::Persistence`] while `fail` is set.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::persistence("repository is rejecting writes"));
        }
        Ok(())
    }
}

impl FleetRepository for MemoryRepository {
    fn read_stations(&self) -> Result<Vec<StationRecord>> {
        let mut stations = self.state().stations.clone();
        stations.sort_by_key(|station| station.id);
        Ok(stations)
    }

    fn read_scheduled_routes(&self) -> Result<Vec<ScheduledRoute>> {
        Ok(self.state().routes.clone())
    }

    fn write_station_idle_count(&self, station: NodeId, count: u32) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state();
        let record = state
            .stations
            .iter_mut()
            .find(|record| record.id == station)
            .ok_or_else(|| Error::persistence(format!("station {station} is not stored")))?;
        record.idle_gondola_count = count;
        Ok(())
    }

    fn insert_scheduled_route(&self, route: &ScheduledRoute) -> Result<()> {
        self.check_writable()?;
        self.state().routes.push(route.clone());
        Ok(())
    }

    fn delete_scheduled_route(&self, route: &ScheduledRoute) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state();
        if let Some(index) = state.routes.iter().position(|stored| stored == route) {
            state.routes.remove(index);
        }
        Ok(())
    }

    fn insert_station(&self, station: &StationRecord) -> Result<()> {
        self.check_writable()?;
        self.state().put_station(station);
        Ok(())
    }

    fn read_platforms(&self) -> Result<Vec<Platform>> {
        Ok(self.state().platforms.clone())
    }

    fn insert_platforms(&self, platforms: &[Platform]) -> Result<()> {
        self.check_writable()?;
        self.state().put_platforms(platforms);
        Ok(())
    }

    fn store_network(&self, stations: &[StationRecord], platforms: &[Platform]) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state();
        for station in stations {
            state.put_station(station);
        }
        state.put_platforms(platforms);
        Ok(())
    }
}
