use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use simconsole_engine::DeleteRoute;

#[derive(Debug, Parser)]
#[command(name = "simconsole", author, version, about = "Operator console for the simulation backend")]
pub struct Cli {
    /// RON settings file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend base url, e.g. http://localhost:8090/api/v1
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Endpoint used to delete simulations: `kill` or `resource`.
    #[arg(long, global = true)]
    pub delete_route: Option<DeleteRoute>,

    /// Also write the log to this file.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// More log output; repeat for more.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Simulation schemas and their templates.
    #[command(subcommand)]
    Schemas(SchemaCommand),
    /// Running and finished simulations.
    #[command(subcommand)]
    Simulations(SimulationCommand),
}

#[derive(Debug, Subcommand)]
pub enum SchemaCommand {
    List {
        /// Keep schemas whose lowercased name contains this text.
        #[arg(long, default_value = "")]
        filter: String,
    },
    /// Create a schema from a .yaml/.yml file.
    Create { file: PathBuf },
    Delete { id: String },
    /// Upload a .txt template for a schema.
    Template { id: String, file: PathBuf },
    /// Launch a simulation from a schema.
    Start { id: String },
}

#[derive(Debug, Subcommand)]
pub enum SimulationCommand {
    List {
        #[arg(long, default_value = "")]
        filter: String,
    },
    Show { id: String },
    Stop { id: String },
    Start { id: String },
    Delete { id: String },
    /// Follow the live log until the simulation stops or Ctrl-C.
    Watch { id: String },
}
