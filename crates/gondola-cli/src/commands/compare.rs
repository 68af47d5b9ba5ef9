//! `gondola compare`: run one query under several heuristics.

use anyhow::{Context, Result};

use gondola_lib::{GondolaService, Heuristic, NodeId};

use crate::output::{format_heuristic_reports, print_json, OutputFormat};

/// Parse a built-in heuristic name.
pub fn parse_heuristic(raw: &str) -> std::result::Result<Heuristic, String> {
    Heuristic::from_name(raw)
        .ok_or_else(|| format!("unknown heuristic '{raw}' (expected euclidean, manhattan, or null)"))
}

/// Compare `heuristics`, or every built-in heuristic when none are given.
pub fn handle_compare(
    service: &GondolaService,
    from: NodeId,
    to: NodeId,
    heuristics: &[Heuristic],
    format: OutputFormat,
) -> Result<()> {
    let heuristics = if heuristics.is_empty() {
        &Heuristic::CANONICAL[..]
    } else {
        heuristics
    };
    let reports = service
        .compare_heuristics(from, to, heuristics)
        .with_context(|| format!("failed to compare heuristics from {from} to {to}"))?;

    match format {
        OutputFormat::Json => print_json(&reports)?,
        OutputFormat::Text => print!("{}", format_heuristic_reports(&reports)),
    }
    Ok(())
}
