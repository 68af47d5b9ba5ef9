//! `gondola settle`: land gondolas whose arrival time has passed.

use anyhow::{Context, Result};
use chrono::Utc;

use gondola_lib::GondolaService;

use crate::output::{format_arrivals, print_json, OutputFormat};

pub fn handle_settle(service: &GondolaService, format: OutputFormat) -> Result<()> {
    let arrived = service
        .settle_arrivals(Utc::now())
        .context("failed to record gondola arrivals")?;

    match format {
        OutputFormat::Json => print_json(&arrived)?,
        OutputFormat::Text => print!("{}", format_arrivals(&arrived, service.stations())),
    }
    Ok(())
}
