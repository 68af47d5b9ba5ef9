//! `gondola request`: assign a gondola to a pickup station.

use anyhow::{Context, Result};

use gondola_lib::{GondolaService, NodeId};

use crate::output::{format_assignment, print_json, OutputFormat};

pub fn handle_request(service: &GondolaService, station: NodeId, format: OutputFormat) -> Result<()> {
    let assignment = service
        .request_gondola(station)
        .with_context(|| format!("failed to request a gondola for station {station}"))?;

    match format {
        OutputFormat::Json => print_json(&assignment)?,
        OutputFormat::Text => print!(
            "{}",
            format_assignment(station, &assignment, service.stations())
        ),
    }
    Ok(())
}
