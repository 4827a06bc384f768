//! quire CLI - static site generator that mirrors a Markdown tree.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

use config::GlobalArgs;

#[derive(Parser)]
#[command(name = "quire")]
#[command(about = "Static site generator that mirrors a Markdown tree")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Build, then rebuild on change while serving the output (default)
    Dev {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Open the site in a browser
        #[arg(long)]
        open: bool,
    },

    /// Generate the site once and exit
    Build,

    /// Serve the output directory without generating
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Open the site in a browser
        #[arg(long)]
        open: bool,
    },

    /// Scaffold a new site in the current directory
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.global.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let command = cli.command.unwrap_or(Commands::Dev {
        port: None,
        open: false,
    });

    if let Commands::Init { yes } = command {
        return commands::init::run(yes).await;
    }

    let settings = config::load_config(cli.global.config.as_deref())?.resolve(&cli.global);

    match command {
        Commands::Dev { port, open } => commands::dev::run(settings, port, open).await?,
        Commands::Build => commands::build::run(settings).await?,
        Commands::Serve { port, open } => commands::serve::run(settings, port, open).await?,
        Commands::Init { .. } => {}
    }

    Ok(())
}
