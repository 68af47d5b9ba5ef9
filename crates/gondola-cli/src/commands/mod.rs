//! Subcommand handlers.
//!
//! `main.rs` parses arguments and hands each subcommand to one of these
//! modules; they share the service loading below.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::debug;

use gondola_lib::{resolve_database_path, DispatchConfig, GondolaService, SqliteRepository};

pub mod compare;
pub mod init;
pub mod request;
pub mod route;
pub mod settle;
pub mod stations;

/// Resolve the database location from the flag, environment, or defaults.
pub fn database_path(explicit: Option<&Path>) -> Result<PathBuf> {
    resolve_database_path(explicit).context("failed to resolve the gondola database location")
}

/// Open an initialized database and load the service over it.
pub fn load_service(database: Option<&Path>) -> Result<GondolaService> {
    let path = database_path(database)?;
    if !path.exists() {
        bail!(
            "no gondola database at {}; run `gondola init --network <file>` first",
            path.display()
        );
    }

    let repository = SqliteRepository::open(&path)
        .with_context(|| format!("failed to open database {}", path.display()))?;
    let config = DispatchConfig::from_env();
    debug!(database = %path.display(), ?config, "loading gondola service");

    let service = GondolaService::load(Arc::new(repository), config)
        .with_context(|| format!("failed to load network from {}", path.display()))?;
    if service.stations().is_empty() {
        bail!(
            "database {} holds no stations; run `gondola init --network <file>` first",
            path.display()
        );
    }
    Ok(service)
}
