use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::process;

mod cli;

use catalog_cli::{init_tracing, load_config, run_server, Overrides};

#[derive(Parser)]
#[command(name = "catalog")]
#[command(about = "Catalog CLI - load, migrate and serve the products database")]
#[command(version)]
struct Cli {
    /// SQLite database file (overrides CATALOG_DATABASE_PATH)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server
    Serve {
        /// Bind address (overrides CATALOG_HOST)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides PORT)
        #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
        port: Option<u16>,
    },
    /// Load products from a CSV file
    Load {
        /// CSV file to read (overrides CATALOG_CSV_PATH)
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Rows per insert transaction (overrides CATALOG_BATCH_SIZE)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        batch_size: Option<u32>,
    },
    /// Move department names into the departments table
    Migrate {
        /// Drop products_backup once verification passes
        #[arg(long)]
        drop_backup: bool,
    },
    /// Report data quality and migration integrity
    Verify,
    /// Print catalog statistics
    Stats,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    if let Err(e) = handle_command(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

async fn handle_command(cli: Cli) -> anyhow::Result<()> {
    let mut overrides = Overrides {
        database: cli.database,
        ..Default::default()
    };

    match cli.command {
        Commands::Serve { host, port } => {
            overrides.host = host;
            overrides.port = port;
            let config = load_config(overrides)?;
            run_server(&config).await
        }
        Commands::Load { csv, batch_size } => {
            overrides.csv = csv;
            overrides.batch_size = batch_size.map(|n| n as usize);
            let config = load_config(overrides)?;
            cli::data::load(&config).await
        }
        Commands::Migrate { drop_backup } => {
            let config = load_config(overrides)?;
            cli::data::migrate(&config, drop_backup).await
        }
        Commands::Verify => {
            let config = load_config(overrides)?;
            cli::data::verify(&config).await
        }
        Commands::Stats => {
            let config = load_config(overrides)?;
            cli::stats::show_stats(&config).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_database_flag() {
        let cli = Cli::try_parse_from(["catalog", "migrate", "--database", "x.db", "--drop-backup"])
            .unwrap();
        assert_eq!(cli.database, Some(PathBuf::from("x.db")));
        assert!(matches!(cli.command, Commands::Migrate { drop_backup: true }));
    }

    #[test]
    fn test_rejects_zero_port_and_batch_size() {
        assert!(Cli::try_parse_from(["catalog", "serve", "--port", "0"]).is_err());
        assert!(Cli::try_parse_from(["catalog", "load", "--batch-size", "0"]).is_err());
    }
}
