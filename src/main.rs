//! Manga Fetcher CLI application
//!
//! Command-line interface for archiving manga chapters as numbered page images.
//! Features concurrent chapter downloads under a shared connection budget,
//! progress tracking, and a download history.

use std::process;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use manga_fetcher::cli::{handle_config, handle_download, handle_history, Cli, Commands};
use manga_fetcher::config::AppConfig;
use manga_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        error!("{} error: {}", e.category(), e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();

    let loaded = AppConfig::load(cli.global.config.clone()).await;
    let default_level = loaded
        .as_ref()
        .map(|(c, _)| c.logging.level.clone())
        .unwrap_or_else(|_| manga_fetcher::constants::logging::DEFAULT_LOG_LEVEL.to_string());
    init_logging(&cli, &default_level);

    let config = loaded.map(|(config, source)| {
        source.log();
        config
    });

    info!("Manga Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Download(args) => {
            info!("Executing download command");
            handle_download(args, config?, cli.global.quiet).await
        }
        Commands::History => {
            info!("Executing history command");
            handle_history(config?).await
        }
        Commands::Config(args) => {
            info!("Executing config command");
            if let Err(e) = &config {
                warn!("Current configuration could not be loaded: {}", e);
            }
            handle_config(args, config.map_err(Into::into)).await
        }
    }
}

/// Initialize logging from the verbosity flags, falling back to the
/// configured level
fn init_logging(cli: &Cli, default_level: &str) {
    let level = cli
        .log_level()
        .map(|l| l.to_string().to_lowercase())
        .unwrap_or_else(|| default_level.to_string());

    let filter = EnvFilter::from_default_env().add_directive(
        format!("manga_fetcher={}", level)
            .parse()
            .unwrap_or_else(|_| "manga_fetcher=info".parse().expect("static directive")),
    );

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_level(cli.global.very_verbose)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
