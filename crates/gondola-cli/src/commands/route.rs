//! `gondola route`: plan a passenger trip between two map coordinates.

use anyhow::{Context, Result};

use gondola_lib::{GondolaService, Point};

use crate::output::{format_route_summary, print_json, OutputFormat};

/// Parse an `X,Y` coordinate pair.
pub fn parse_point(raw: &str) -> std::result::Result<Point, String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{raw}'"))?;
    let parse = |value: &str| {
        value
            .trim()
            .parse::<f64>()
            .map_err(|err| format!("invalid coordinate '{}': {err}", value.trim()))
    };
    Ok(Point::new(parse(x)?, parse(y)?))
}

pub fn handle_route(
    service: &GondolaService,
    from: Point,
    to: Point,
    format: OutputFormat,
) -> Result<()> {
    let summary = service
        .plan_route(from, to)
        .with_context(|| format!("failed to plan a route from {from} to {to}"))?;

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Text => print!("{}", format_route_summary(&summary, service.stations())),
    }
    Ok(())
}
