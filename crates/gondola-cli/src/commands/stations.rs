//! `gondola stations`: list stations with their live idle counts.

use anyhow::Result;
use serde::Serialize;

use gondola_lib::{GondolaService, ScheduledRoute, StationFleetState, StationRecord};

use crate::output::{format_stations, print_json, OutputFormat};

#[derive(Debug, Serialize)]
struct StationsResult<'a> {
    stations: &'a [StationRecord],
    fleet: Vec<StationFleetState>,
    scheduled_routes: Vec<ScheduledRoute>,
}

pub fn handle_stations(service: &GondolaService, format: OutputFormat) -> Result<()> {
    let fleet = service.fleet();
    match format {
        OutputFormat::Json => print_json(&StationsResult {
            stations: service.stations(),
            fleet,
            scheduled_routes: service.dispatcher().scheduled_routes(),
        })?,
        OutputFormat::Text => {
            print!("{}", format_stations(service.stations(), &fleet));
            let in_flight = service.dispatcher().scheduled_routes().len();
            println!("Gondolas in flight: {in_flight}");
        }
    }
    Ok(())
}
