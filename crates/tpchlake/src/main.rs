mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use tpchlake_tools::{TpchConfig, DEFAULT_CONFIG_PATH};

#[derive(Parser)]
#[command(name = "tpchlake")]
#[command(version, about = "DuckLake TPC-H demo", long_about = None)]
#[command(arg_required_else_help = true)]
#[command(after_help = "Examples:
  tpchlake setup                      # Verify environment
  tpchlake tpch                       # Generate all TPC-H parts
  tpchlake tpch --part 1              # Generate only part 1
  tpchlake catalog                    # Initialize DuckLake catalog
  tpchlake repartition                # Repartition orders table
  tpchlake verify                     # Verify row counts
  tpchlake manifest                   # Create snapshot
  tpchlake time-travel                # Demonstrate time travel queries
  tpchlake change-feed                # Show changes between snapshots
  tpchlake compact --table orders     # Compact files
  tpchlake clean                      # Remove all data")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify the generator, the DuckLake extension and free disk space
    Setup,

    /// Generate TPC-H data
    Tpch {
        /// Generate only part N
        #[arg(long)]
        part: Option<u32>,
    },

    /// Initialize DuckLake catalog
    Catalog,

    /// Repartition orders table
    Repartition,

    /// Load Parquet files one at a time
    LoadSmallFiles {
        /// Table name
        #[arg(long, default_value = "lineitem")]
        table: String,
    },

    /// Create DuckLake snapshot
    Manifest,

    /// Demonstrate time travel queries
    TimeTravel,

    /// Compact small files
    Compact {
        /// Table name
        #[arg(long, default_value = "lineitem")]
        table: String,

        /// Target file size in bytes. Stored in the catalog, so it also applies
        /// to later inserts and compactions.
        #[arg(long)]
        target_size: Option<u64>,

        /// Partition filter for the statistics (e.g. year=1992)
        #[arg(long, value_name = "COLUMN=VALUE")]
        partition_filter: Option<String>,
    },

    /// Expire old snapshots
    ExpireSnapshots {
        /// Expire snapshots older than this interval (e.g. '7 days')
        #[arg(long, default_value = "1 minute")]
        older_than: String,

        /// Report what would be expired without expiring it
        #[arg(long)]
        dry_run: bool,
    },

    /// Show row-level changes between snapshots
    ChangeFeed {
        /// Table name
        #[arg(long, default_value = "orders")]
        table: String,

        /// From snapshot version
        #[arg(long)]
        from_version: Option<i64>,

        /// To snapshot version
        #[arg(long)]
        to_version: Option<i64>,
    },

    /// Show row counts
    Verify,

    /// Remove all generated data and catalog
    Clean,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "info,tpchlake=debug,tpchlake_tools=debug"
    } else {
        "warn,tpchlake=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = TpchConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    match cli.command {
        Commands::Setup => commands::setup(&config),
        Commands::Tpch { part } => commands::tpch(&config, part),
        Commands::Catalog => commands::catalog(&config),
        Commands::Repartition => commands::repartition(&config),
        Commands::LoadSmallFiles { table } => commands::load_small_files(&config, &table),
        Commands::Manifest => commands::manifest(&config),
        Commands::TimeTravel => commands::time_travel(&config),
        Commands::Compact {
            table,
            target_size,
            partition_filter,
        } => commands::compact(&config, &table, target_size, partition_filter.as_deref()),
        Commands::ExpireSnapshots {
            older_than,
            dry_run,
        } => commands::expire_snapshots(&config, &older_than, dry_run),
        Commands::ChangeFeed {
            table,
            from_version,
            to_version,
        } => commands::change_feed(&config, &table, from_version, to_version),
        Commands::Verify => commands::verify(&config),
        Commands::Clean => commands::clean(&config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_compact_flags() {
        let cli = Cli::parse_from([
            "tpchlake",
            "compact",
            "--table",
            "orders",
            "--target-size",
            "1048576",
            "--partition-filter",
            "year=1992",
        ]);
        match cli.command {
            Commands::Compact {
                table,
                target_size,
                partition_filter,
            } => {
                assert_eq!(table, "orders");
                assert_eq!(target_size, Some(1_048_576));
                assert_eq!(partition_filter.as_deref(), Some("year=1992"));
            }
            _ => panic!("expected compact"),
        }
    }

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::parse_from(["tpchlake", "expire-snapshots"]);
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        match cli.command {
            Commands::ExpireSnapshots {
                older_than,
                dry_run,
            } => {
                assert_eq!(older_than, "1 minute");
                assert!(!dry_run);
            }
            _ => panic!("expected expire-snapshots"),
        }

        let cli = Cli::parse_from(["tpchlake", "change-feed", "--config", "other.yaml", "-v"]);
        assert_eq!(cli.config, PathBuf::from("other.yaml"));
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::ChangeFeed { ref table, from_version: None, to_version: None } if table == "orders"
        ));
    }

    #[test]
    fn test_target_size_help_mentions_catalog() {
        let cli = Cli::command();
        let compact = cli.find_subcommand("compact").unwrap();
        let arg = compact
            .get_arguments()
            .find(|a| a.get_id() == "target_size")
            .unwrap();
        let help = arg.get_help().unwrap().to_string();
        assert!(help.contains("Stored in the catalog"));
    }

    #[test]
    fn test_no_command_is_an_error() {
        assert!(Cli::try_parse_from(["tpchlake"]).is_err());
    }
}
