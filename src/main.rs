use clap::{Parser, Subcommand};
use schemaweave::error::Result;

mod cli;

#[derive(Parser)]
#[command(name = "schemaweave")]
#[command(version = "0.1.0")]
#[command(about = "Compose GraphQL schema fragments and resolvers into one API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write an example project (config plus schema fragments)
    Init {
        /// Directory to write the project into
        #[arg(long, default_value = ".")]
        dir: String,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Compose the configured schema and print its SDL
    Check {
        /// Config file path
        #[arg(long, default_value = "schemaweave.toml")]
        config: String,
    },

    /// Start GraphQL server
    Serve {
        /// Config file path
        #[arg(long, default_value = "schemaweave.toml")]
        config: String,

        /// Server port (overrides the config file)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so `check` output stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { dir, force } => {
            cli::init::run(dir, force)?;
        }
        Commands::Check { config } => {
            cli::check::run(config)?;
        }
        Commands::Serve { config, port } => {
            cli::serve::run(config, port).await?;
        }
    }

    Ok(())
}
