use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use gondola_cli::commands::{
    compare::{handle_compare, parse_heuristic},
    init::handle_init,
    load_service,
    request::handle_request,
    route::{handle_route, parse_point},
    settle::handle_settle,
    stations::handle_stations,
};
use gondola_cli::output::OutputFormat;
use gondola_lib::{Heuristic, NodeId, Point};

#[derive(Parser, Debug)]
#[command(author, version, about = "Gondola network route planning and dispatch")]
struct Cli {
    /// SQLite database holding the network and fleet state (else `GONDOLA_DATABASE`).
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a network definition (stations plus adjacency matrix) in the database.
    Init {
        /// JSON network definition file.
        #[arg(long)]
        network: PathBuf,
    },
    /// Plan a passenger route between two map coordinates.
    Route {
        /// Pickup coordinate as X,Y.
        #[arg(long = "from", value_parser = parse_point, allow_hyphen_values = true)]
        from: Point,
        /// Drop-off coordinate as X,Y.
        #[arg(long = "to", value_parser = parse_point, allow_hyphen_values = true)]
        to: Point,
    },
    /// Assign a gondola to a pickup station.
    Request {
        /// Pickup station id.
        #[arg(long)]
        station: NodeId,
    },
    /// Compare heuristics on one station-to-station search.
    Compare {
        /// Start station id.
        #[arg(long = "from")]
        from: NodeId,
        /// Goal station id.
        #[arg(long = "to")]
        to: NodeId,
        /// Heuristics to run (defaults to euclidean, manhattan, and null).
        #[arg(long = "heuristic", value_parser = parse_heuristic)]
        heuristics: Vec<Heuristic>,
    },
    /// Land gondolas whose expected arrival has passed.
    Settle,
    /// List stations and their idle gondolas.
    Stations,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let database = cli.database.as_deref();

    match cli.command {
        Command::Init { network } => handle_init(database, &network, cli.format),
        Command::Route { from, to } => handle_route(&load_service(database)?, from, to, cli.format),
        Command::Request { station } => {
            handle_request(&load_service(database)?, station, cli.format)
        }
        Command::Compare {
            from,
            to,
            heuristics,
        } => handle_compare(&load_service(database)?, from, to, &heuristics, cli.format),
        Command::Settle => handle_settle(&load_service(database)?, cli.format),
        Command::Stations => handle_stations(&load_service(database)?, cli.format),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
