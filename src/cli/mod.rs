//! Command-line interface

/// CLI errors
pub mod error;
/// Command execution
pub mod sync;

pub use error::CliError;

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "opendatasus-extractor")]
#[command(
    about = "Incrementally extract OpenDataSUS immunization records as JSON-lines messages",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Config file (JSON)
    #[arg(long, required_unless_present = "discover")]
    pub config: Option<PathBuf>,

    /// State file from a previous run (a state document or a STATE message)
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Catalog file selecting the streams to sync
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Print the discovered catalog and exit
    #[arg(long, default_value_t = false)]
    pub discover: bool,

    /// Also save the state to this file after every stream
    #[arg(long)]
    pub state_output: Option<PathBuf>,

    /// Override the retry count for failed index requests (range: 0-20)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=20))]
    pub max_retries: Option<u32>,

    /// Serve Prometheus metrics on this address (e.g., 127.0.0.1:9090)
    #[arg(long, env = "OPENDATASUS_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,
}
