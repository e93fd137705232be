//! agentparl CLI entry point

use agentparl::{
    commands::{
        cmd_feed_store, cmd_import, cmd_init, cmd_recent, cmd_run, cmd_stats,
        print_feed_store_stats, print_import_stats, print_init, print_recent, print_run_report,
        print_stats,
    },
    config::{Config, LoggingConfig},
    error::Result,
    logging::init_logging,
    pipelines::PipelineKind,
    store::StoreKind,
};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

#[derive(Parser)]
#[command(name = "agentparl")]
#[command(version, about = "Scheduled content pipelines for a Telegram channel", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config and create data directories and stores
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Post a quote of the day
    Quote,

    /// Post a quote from the nerd categories
    NerdQuote,

    /// Post curiosities from a Wikipedia article in a nerd category
    Curiosity,

    /// Post a digest of collected tech news
    TechNews,

    /// Post last week's most viewed Wikipedia pages
    MostViewed,

    /// Post the trending YouTube videos
    YoutubeTrend,

    /// Post about an artist who died on this day
    HappenedToday,

    /// Post the oldest image waiting in the pending folder
    PostImage,

    /// Post this month's PlayStation Plus games
    PsNews,

    /// Collect configured RSS/Atom feeds into the news store
    FeedStore,

    /// Import candidates from a JSON file
    Import {
        /// Target store
        #[arg(value_enum)]
        kind: StoreArg,

        /// JSON array of candidates
        file: PathBuf,
    },

    /// Show item counts per store
    Stats {
        /// Only this store
        #[arg(long, value_enum)]
        kind: Option<StoreArg>,
    },

    /// List recently posted items
    Recent {
        /// Only this store
        #[arg(long, value_enum)]
        kind: Option<StoreArg>,

        /// How many days back
        #[arg(long, default_value = "7")]
        days: u32,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StoreArg {
    Quotes,
    Articles,
    News,
    Images,
}

impl From<StoreArg> for StoreKind {
    fn from(arg: StoreArg) -> Self {
        match arg {
            StoreArg::Quotes => StoreKind::Quotes,
            StoreArg::Articles => StoreKind::Articles,
            StoreArg::News => StoreKind::News,
            StoreArg::Images => StoreKind::Images,
        }
    }
}

impl Commands {
    fn pipeline(&self) -> Option<PipelineKind> {
        match self {
            Commands::Quote => Some(PipelineKind::Quote),
            Commands::NerdQuote => Some(PipelineKind::NerdQuote),
            Commands::Curiosity => Some(PipelineKind::Curiosity),
            Commands::TechNews => Some(PipelineKind::TechNews),
            Commands::MostViewed => Some(PipelineKind::MostViewed),
            Commands::YoutubeTrend => Some(PipelineKind::YoutubeTrend),
            Commands::HappenedToday => Some(PipelineKind::HappenedToday),
            Commands::PostImage => Some(PipelineKind::PostImage),
            Commands::PsNews => Some(PipelineKind::PsNews),
            _ => None,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        if tracing::dispatcher::has_been_set() {
            error!("{}", e);
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(e.exit_code());
    }
}

fn stderr_only_logging(verbose: bool) {
    let logging = LoggingConfig {
        to_file: false,
        ..Default::default()
    };
    if let Err(e) = init_logging(&logging, Path::new("."), verbose, Vec::new()) {
        eprintln!("Warning: {}", e);
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Completions need neither config nor logging
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "agentparl", &mut std::io::stdout());
        return Ok(());
    }

    if let Commands::Init { force } = cli.command {
        stderr_only_logging(cli.verbose);
        let base_dir = cli
            .config
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf);
        let report = cmd_init(base_dir, force).await?;
        return if cli.json {
            print_json(&report)
        } else {
            print_init(&report);
            Ok(())
        };
    }

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            stderr_only_logging(cli.verbose);
            return Err(e);
        }
    };
    let env_loaded = config.load_env_file();
    if let Err(e) = init_logging(
        &config.logging,
        &config.paths.log_dir,
        cli.verbose,
        config.secret_values(),
    ) {
        stderr_only_logging(cli.verbose);
        return Err(e);
    }
    if env_loaded? {
        debug!("Loaded secrets from {:?}", config.paths.env_file);
    }

    if let Some(kind) = cli.command.pipeline() {
        let report = cmd_run(&config, kind).await?;
        return if cli.json {
            print_json(&report)
        } else {
            print_run_report(&report);
            Ok(())
        };
    }

    match cli.command {
        Commands::FeedStore => {
            let stats = cmd_feed_store(&config).await?;
            if cli.json {
                print_json(&stats)?;
            } else {
                print_feed_store_stats(&stats);
            }
        }

        Commands::Import { kind, file } => {
            let stats = cmd_import(&config, kind.into(), &file).await?;
            if cli.json {
                print_json(&stats)?;
            } else {
                print_import_stats(&stats);
            }
        }

        Commands::Stats { kind } => {
            let stats = cmd_stats(&config, kind.map(StoreKind::from)).await?;
            if cli.json {
                print_json(&stats)?;
            } else {
                print_stats(&stats);
            }
        }

        Commands::Recent { kind, days } => {
            let posts = cmd_recent(&config, kind.map(StoreKind::from), days).await?;
            if cli.json {
                print_json(&posts)?;
            } else {
                print_recent(&posts, days);
            }
        }

        // Init, completions and pipelines return early
        _ => unreachable!(),
    }

    Ok(())
}

/// An explicit `--config` must exist; the default location falls back to
/// built-in defaults so scheduled runs work before `init`.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::load_from(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_store_argument_maps_to_store_kind() {
        let cli = Cli::try_parse_from(["agentparl", "import", "news", "feeds.json"]).unwrap();
        let Commands::Import { kind, file } = cli.command else {
            panic!("expected import");
        };
        assert_eq!(StoreKind::from(kind), StoreKind::News);
        assert_eq!(file, PathBuf::from("feeds.json"));

        let cli = Cli::try_parse_from(["agentparl", "stats", "--kind", "images"]).unwrap();
        let Commands::Stats { kind } = cli.command else {
            panic!("expected stats");
        };
        assert_eq!(kind.map(StoreKind::from), Some(StoreKind::Images));

        assert!(Cli::try_parse_from(["agentparl", "recent", "--kind", "videos"]).is_err());
    }
}
