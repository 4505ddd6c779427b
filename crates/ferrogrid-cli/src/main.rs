mod cmd;
mod config_path;
mod output;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ferrogrid",
    about = "Drive a grid of PWM electromagnets from a small web page",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: search upward for ferrogrid.yaml)
    #[arg(long, global = true, env = "FERROGRID_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the control server until Ctrl-C
    Serve {
        /// Address to bind (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides server.port)
        #[arg(long)]
        port: Option<u16>,
        /// Open the control page in a browser
        #[arg(long)]
        open: bool,
    },

    /// Show the actuator layout: index, pin, row, column
    Layout,

    /// Inspect, validate, or create the config file
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let explicit = cli.config.as_deref();

    let result = match cli.command {
        Commands::Serve { bind, port, open } => cmd::serve::run(explicit, bind, port, open),
        Commands::Layout => cmd::layout::run(explicit, cli.json),
        Commands::Config { subcommand } => cmd::config::run(explicit, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
