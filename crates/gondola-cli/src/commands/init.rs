//! `gondola init`: store a network definition in a fresh database.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use gondola_lib::{FleetRepository, GondolaService, NetworkDefinition, SqliteRepository};

use crate::commands::database_path;
use crate::output::{print_json, OutputFormat};

#[derive(Debug, Serialize)]
struct InitResult<'a> {
    database: &'a Path,
    stations: usize,
    platforms: usize,
}

pub fn handle_init(database: Option<&Path>, network: &Path, format: OutputFormat) -> Result<()> {
    let definition = NetworkDefinition::from_path(network)
        .with_context(|| format!("failed to read network definition {}", network.display()))?;

    let path = database_path(database)?;
    let repository = SqliteRepository::open(&path)
        .with_context(|| format!("failed to open database {}", path.display()))?;
    let existing = repository
        .read_stations()
        .context("failed to inspect existing stations")?;
    if !existing.is_empty() {
        bail!(
            "database {} already holds {} stations",
            path.display(),
            existing.len()
        );
    }

    GondolaService::initialize(&repository, &definition)
        .with_context(|| format!("invalid network definition {}", network.display()))?;

    let result = InitResult {
        database: &path,
        stations: definition.stations.len(),
        platforms: definition.platforms().len(),
    };
    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Text => println!(
            "Initialized {} stations and {} platforms in {}",
            result.stations,
            result.platforms,
            path.display()
        ),
    }
    Ok(())
}
