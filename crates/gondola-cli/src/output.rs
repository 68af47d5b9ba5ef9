//! Output formatting for command results.
//!
//! Every command renders either a plain text view or pretty-printed JSON of
//! the library's serializable result types.

use std::fmt::Write as _;

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

use gondola_lib::{
    Assignment, HeuristicReport, NodeId, RouteSummary, ScheduledRoute, StationFleetState,
    StationRecord,
};

/// Output formats accepted by `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn station_label(stations: &[StationRecord], id: NodeId) -> String {
    stations
        .iter()
        .find(|station| station.id == id)
        .map(StationRecord::label)
        .unwrap_or_else(|| format!("#{id}"))
}

fn format_path(stations: &[StationRecord], path: &[NodeId]) -> String {
    path.iter()
        .map(|&id| station_label(stations, id))
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Render a planned passenger route.
pub fn format_route_summary(summary: &RouteSummary, stations: &[StationRecord]) -> String {
    let mut out = String::new();
    let pickup = station_label(stations, summary.pickup_station);
    let dropoff = station_label(stations, summary.dropoff_station);
    let _ = writeln!(out, "Pickup station: {pickup}");
    let _ = writeln!(out, "Drop-off station: {dropoff}");

    match summary.route() {
        Some(route) => {
            let _ = writeln!(out, "Path: {}", format_path(stations, &route.station_path));
            let _ = writeln!(out, "Distance: {:.1} m", route.total_distance);
            let _ = writeln!(out, "ETA: {:.1} min", route.eta_minutes);
        }
        None => {
            let _ = writeln!(out, "No route between {pickup} and {dropoff}");
        }
    }
    let _ = writeln!(out, "Expanded nodes: {}", summary.expansions);
    out
}

/// Render the decision taken for a gondola request.
pub fn format_assignment(
    pickup: NodeId,
    assignment: &Assignment,
    stations: &[StationRecord],
) -> String {
    let pickup = station_label(stations, pickup);
    match assignment {
        Assignment::Dispatched {
            source_station,
            wait_minutes,
            path,
            remaining_idle,
            ..
        } => format!(
            "Dispatched gondola from {} to {pickup}\nPath: {}\nWait: {wait_minutes:.1} min\nIdle gondolas left at {}: {remaining_idle}\n",
            station_label(stations, *source_station),
            format_path(stations, path),
            station_label(stations, *source_station),
        ),
        Assignment::EnRoute {
            wait_minutes,
            route,
        } => format!(
            "Gondola from {} is already heading to {pickup}\nWait: {wait_minutes:.1} min\n",
            station_label(stations, route.origin_station),
        ),
        Assignment::Unavailable => format!("No gondola available for {pickup}\n"),
    }
}

/// Render one row per heuristic.
pub fn format_heuristic_reports(reports: &[HeuristicReport]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12} {:>10} {:>12}  Path",
        "Heuristic", "Expanded", "Cost (m)"
    );
    for report in reports {
        let cost = report
            .cost
            .map(|cost| format!("{cost:.1}"))
            .unwrap_or_else(|| "-".to_string());
        let path = if report.path.is_empty() {
            "unreachable".to_string()
        } else {
            report
                .path
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        };
        let _ = writeln!(
            out,
            "{:<12} {:>10} {:>12}  {}",
            report.name, report.expansions, cost, path
        );
    }
    out
}

/// Render the station table with live idle counts.
pub fn format_stations(stations: &[StationRecord], fleet: &[StationFleetState]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Stations ({}):", stations.len());
    let _ = writeln!(
        out,
        "{:>4} {:<16} {:>10} {:>10} {:>6}",
        "Id", "Name", "X", "Y", "Idle"
    );
    for station in stations {
        let idle = fleet
            .iter()
            .find(|state| state.station_id == station.id)
            .map_or(station.idle_gondola_count, |state| state.idle_gondola_count);
        let marker = if station.is_main { " (main)" } else { "" };
        let _ = writeln!(
            out,
            "{:>4} {:<16} {:>10.1} {:>10.1} {:>6}{marker}",
            station.id,
            station.label(),
            station.x,
            station.y,
            idle
        );
    }
    out
}

/// Render gondolas that landed during settlement.
pub fn format_arrivals(arrived: &[ScheduledRoute], stations: &[StationRecord]) -> String {
    if arrived.is_empty() {
        return "No gondolas arrived\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(out, "Arrived gondolas ({}):", arrived.len());
    for route in arrived {
        let _ = writeln!(
            out,
            "- {} -> {} at {}",
            station_label(stations, route.origin_station),
            station_label(stations, route.destination_station),
            route.expected_arrival.to_rfc3339()
        );
    }
    out
}
