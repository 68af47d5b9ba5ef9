use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use chrono::{TimeDelta, TimeZone, Utc};
use gondola_lib::{
    Assignment, DispatchConfig, FleetRepository, GondolaService, Heuristic, MemoryRepository,
    NetworkDefinition, NodeId, Platform, Point, Result, ScheduledRoute, SqliteRepository,
    StationRecord,
};
use tempfile::tempdir;

fn definition() -> NetworkDefinition {
    let stations = [
        (0.0, 0.0, 0),
        (2.0, 2.0, 0),
        (2.0, -1.0, 1),
        (5.0, 2.0, 0),
        (5.0, -1.0, 0),
        (7.0, 1.0, 2),
    ]
    .into_iter()
    .enumerate()
    .map(|(id, (x, y, idle))| StationRecord {
        id,
        name: format!("S{id}"),
        x,
        y,
        idle_gondola_count: idle,
        is_main: id == 5,
    })
    .collect();

    NetworkDefinition {
        stations,
        adjacency: vec![
            vec![0, 1, 1, 0, 0, 0],
            vec![1, 0, 1, 1, 0, 0],
            vec![1, 1, 0, 0, 1, 0],
            vec![0, 1, 0, 0, 1, 1],
            vec![0, 0, 1, 1, 0, 0],
            vec![0, 0, 0, 1, 0, 0],
        ],
    }
}

fn fast_retry_config() -> DispatchConfig {
    DispatchConfig {
        persist_backoff_ms: 1,
        ..DispatchConfig::default()
    }
}

fn loaded_service(repository: Arc<dyn FleetRepository>) -> GondolaService {
    GondolaService::initialize(repository.as_ref(), &definition()).expect("initialize");
    GondolaService::load(repository, fast_retry_config()).expect("load")
}

#[test]
fn service_rebuilds_network_from_platforms() {
    let service = loaded_service(Arc::new(MemoryRepository::new()));

    assert_eq!(service.network().len(), 6);
    assert_eq!(
        service.network().adjacency_matrix(),
        definition().adjacency
    );
    assert_eq!(service.station(5).map(|s| s.is_main), Some(true));
}

#[test]
fn plan_route_uses_nearest_stations() {
    let service = loaded_service(Arc::new(MemoryRepository::new()));
    let summary = service
        .plan_route(Point::new(-0.5, 0.2), Point::new(4.8, -1.1))
        .unwrap();

    assert_eq!(summary.route().unwrap().station_path, vec![0, 2, 4]);
}

#[test]
fn dispatch_is_persisted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fleet.db");
    let repository: Arc<dyn FleetRepository> = Arc::new(SqliteRepository::open(&path).unwrap());
    let service = loaded_service(repository.clone());
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 7, 0, 0).unwrap();

    let assignment = service.request_gondola_at(0, now).unwrap();
    let Assignment::Dispatched {
        source_station,
        route,
        ..
    } = &assignment
    else {
        panic!("expected dispatch, got {assignment:?}");
    };
    assert_eq!(*source_station, 2);

    let stored = repository.read_stations().unwrap();
    assert_eq!(stored[2].idle_gondola_count, 0);
    assert_eq!(repository.read_scheduled_routes().unwrap(), vec![route.clone()]);

    let reloaded = GondolaService::load(repository, fast_retry_config()).unwrap();
    assert_eq!(reloaded.dispatcher().idle_count(2), 0);
    assert_eq!(reloaded.dispatcher().scheduled_routes(), vec![route.clone()]);

    let second = reloaded.request_gondola_at(0, now).unwrap();
    assert!(matches!(second, Assignment::EnRoute { .. }));
}

#[test]
fn persistence_failure_rolls_back_memory() {
    let repository = Arc::new(MemoryRepository::new());
    let service = loaded_service(repository.clone());
    repository.set_fail_writes(true);

    let error = service.request_gondola(0).unwrap_err();
    assert!(error.is_persistence());
    assert_eq!(service.dispatcher().idle_count(2), 1);
    assert!(service.dispatcher().scheduled_routes().is_empty());

    repository.set_fail_writes(false);
    let assignment = service.request_gondola(0).unwrap();
    assert!(assignment.is_dispatched());
    assert_eq!(repository.read_stations().unwrap()[2].idle_gondola_count, 0);
    assert_eq!(repository.read_scheduled_routes().unwrap().len(), 1);
}

#[test]
fn settled_arrivals_are_persisted() {
    let repository = Arc::new(MemoryRepository::new());
    let service = loaded_service(repository.clone());
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 7, 0, 0).unwrap();

    service.request_gondola_at(0, now).unwrap();
    let arrived = service.settle_arrivals(now + TimeDelta::hours(1)).unwrap();

    assert_eq!(arrived.len(), 1);
    assert!(repository.read_scheduled_routes().unwrap().is_empty());
    assert_eq!(repository.read_stations().unwrap()[0].idle_gondola_count, 1);
    assert_eq!(service.dispatcher().idle_count(0), 1);
}

#[test]
fn heuristics_are_compared_on_the_same_query() {
    let service = loaded_service(Arc::new(MemoryRepository::new()));
    let reports = service
        .compare_heuristics(0, 4, &Heuristic::CANONICAL)
        .unwrap();

    let names: Vec<_> = reports.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["euclidean", "manhattan", "null"]);
    assert_eq!(reports[0].expansions, 2);
    assert_eq!(reports[2].expansions, 3);
    assert_eq!(reports[0].cost, reports[2].cost);
    assert!(reports.iter().all(|r| r.path == vec![0, 2, 4]));
}

#[test]
fn service_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<GondolaService>();
}

/// Repository whose idle-count writes of `1` stall, so a later write can
/// overtake an earlier one.
#[derive(Debug, Default)]
struct StallingRepository {
    inner: MemoryRepository,
}

impl FleetRepository for StallingRepository {
    fn read_stations(&self) -> Result<Vec<StationRecord>> {
        self.inner.read_stations()
    }

    fn read_scheduled_routes(&self) -> Result<Vec<ScheduledRoute>> {
        self.inner.read_scheduled_routes()
    }

    fn write_station_idle_count(&self, station: NodeId, count: u32) -> Result<()> {
        if count == 1 {
            thread::sleep(Duration::from_millis(300));
        }
        self.inner.write_station_idle_count(station, count)
    }

    fn insert_scheduled_route(&self, route: &ScheduledRoute) -> Result<()> {
        self.inner.insert_scheduled_route(route)
    }

    fn delete_scheduled_route(&self, route: &ScheduledRoute) -> Result<()> {
        self.inner.delete_scheduled_route(route)
    }

    fn insert_station(&self, station: &StationRecord) -> Result<()> {
        self.inner.insert_station(station)
    }

    fn read_platforms(&self) -> Result<Vec<Platform>> {
        self.inner.read_platforms()
    }

    fn insert_platforms(&self, platforms: &[Platform]) -> Result<()> {
        self.inner.insert_platforms(platforms)
    }

    fn store_network(&self, stations: &[StationRecord], platforms: &[Platform]) -> Result<()> {
        self.inner.store_network(stations, platforms)
    }
}

#[test]
fn concurrent_dispatches_from_one_station_persist_the_final_count() {
    let mut network = definition();
    for station in network.stations.iter_mut() {
        station.idle_gondola_count = if station.id == 2 { 2 } else { 0 };
    }
    let repository = Arc::new(StallingRepository::default());
    GondolaService::initialize(repository.as_ref(), &network).unwrap();
    let service = GondolaService::load(repository.clone(), fast_retry_config()).unwrap();
    let barrier = Barrier::new(2);

    let outcomes: Vec<Assignment> = thread::scope(|scope| {
        let handles: Vec<_> = [0, 4]
            .into_iter()
            .map(|pickup| {
                let (service, barrier) = (&service, &barrier);
                scope.spawn(move || {
                    barrier.wait();
                    service.request_gondola(pickup).expect("request succeeds")
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("thread"))
            .collect()
    });

    assert!(outcomes.iter().all(Assignment::is_dispatched), "{outcomes:?}");
    assert_eq!(service.dispatcher().idle_count(2), 0);
    assert_eq!(repository.read_stations().unwrap()[2].idle_gondola_count, 0);
    assert_eq!(repository.read_scheduled_routes().unwrap().len(), 2);

    let reloaded = GondolaService::load(repository, fast_retry_config()).unwrap();
    assert_eq!(reloaded.dispatcher().idle_count(2), 0);
}

#[test]
fn comparison_honours_the_expansion_budget() {
    let repository: Arc<dyn FleetRepository> = Arc::new(MemoryRepository::new());
    GondolaService::initialize(repository.as_ref(), &definition()).unwrap();
    let config = DispatchConfig {
        max_expansions: Some(1),
        ..fast_retry_config()
    };
    let service = GondolaService::load(repository, config).unwrap();

    let reports = service
        .compare_heuristics(0, 4, &Heuristic::CANONICAL)
        .unwrap();
    assert_eq!(reports.len(), 3);
    for report in reports {
        assert!(report.path.is_empty(), "{report:?}");
        assert_eq!(report.cost, None);
        assert_eq!(report.expansions, 1);
    }
}

#[test]
fn failed_initialization_stores_nothing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fleet.db");
    let repository = SqliteRepository::open(&path).unwrap();
    rusqlite::Connection::open(&path)
        .unwrap()
        .execute_batch(
            "CREATE TRIGGER reject_platform BEFORE INSERT ON platforms \
             WHEN NEW.id = 3 BEGIN SELECT RAISE(ABORT, 'platform rejected'); END;",
        )
        .unwrap();

    let error = GondolaService::initialize(&repository, &definition()).unwrap_err();
    assert!(error.to_string().contains("platform rejected"), "{error}");
    assert!(repository.read_stations().unwrap().is_empty());
    assert!(repository.read_platforms().unwrap().is_empty());
}

#[test]
fn rejected_initialization_leaves_memory_repository_empty() {
    let repository = MemoryRepository::new();
    repository.set_fail_writes(true);

    let error = GondolaService::initialize(&repository, &definition()).unwrap_err();
    assert!(error.is_persistence());
    assert!(repository.read_stations().unwrap().is_empty());
    assert!(repository.read_platforms().unwrap().is_empty());
}
