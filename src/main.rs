use anyhow::Result;
use clap::{Parser, Subcommand};
use respin::commands::{deploy, doctor, init, listen, status, trigger};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "respin")]
#[command(about = "Trigger-driven redeploy listener", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default respin.toml in the current directory
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Run the reset listener loop in the foreground
    Listen {
        /// Config file (defaults to ./respin.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Send the trigger token to a running listener
    Trigger {
        /// Config file (defaults to ./respin.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Host to connect to (defaults to the configured bind address)
        #[arg(long)]
        host: Option<String>,

        /// Port to connect to
        #[arg(short, long)]
        port: Option<u16>,

        /// Token to send
        #[arg(short, long)]
        token: Option<String>,
    },

    /// Run the redeploy pipeline once, without listening
    Deploy {
        /// Config file (defaults to ./respin.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show tracked service processes and the last deploy
    Status {
        /// Config file (defaults to ./respin.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Validate the config and check required external tools
    Doctor {
        /// Config file (defaults to ./respin.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => init::execute(force),
        Commands::Listen { config } => listen::execute(config),
        Commands::Trigger {
            config,
            host,
            port,
            token,
        } => trigger::execute(config, host, port, token),
        Commands::Deploy { config } => deploy::execute(config),
        Commands::Status { config } => status::execute(config),
        Commands::Doctor { config } => doctor::execute(config),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("respin=info")),
        )
        .init();
}
