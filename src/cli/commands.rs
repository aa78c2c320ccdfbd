//! Command handlers for the Manga Fetcher CLI
//!
//! Each handler turns parsed arguments and the loaded configuration into calls
//! on the library and prints the outcome.

use std::io::{self, Write};

use tracing::{info, warn};

use crate::app::{
    format_chapter_number, parse_chapter_list, progress_channel, ChapterScheduler, HistoryStore,
    JobStatus, MangaSeries, RunSummary,
};
use crate::cli::args::{ConfigAction, ConfigArgs, DownloadArgs};
use crate::cli::progress::{ProgressConfig, ProgressDisplay};
use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// Handle the download command
///
/// # Errors
///
/// Returns `AppError` for invalid arguments or configuration, and when not a
/// single requested chapter could be downloaded
pub async fn handle_download(args: DownloadArgs, mut config: AppConfig, quiet: bool) -> Result<()> {
    args.validate().map_err(AppError::generic)?;
    apply_download_flags(&args, &mut config);

    let (client_config, scheduler_config, endpoints) = config.to_runtime_config()?;
    let series = MangaSeries::new(
        &args.series_name(),
        &config.library.name_options(),
        &config.library.root,
    )?;

    let chapters = match &args.chapters {
        Some(list) => parse_chapter_list(list)?,
        None => prompt_chapters(&series).await?,
    };
    if chapters.is_empty() {
        return Err(AppError::generic("No chapters requested"));
    }

    if args.dry_run {
        print_plan(&series, &chapters);
        return Ok(());
    }

    info!(
        "Downloading {} chapters of {} into {}",
        chapters.len(),
        series,
        series.output_dir().display()
    );

    let history = HistoryStore::new(&config.library.history_file);
    match history.contains(&series.title).await {
        Ok(true) => info!("{} is already in the download history", series.title),
        Ok(false) => {}
        Err(e) => warn!(
            "Could not read download history {}: {}",
            history.path().display(),
            e
        ),
    }

    let (progress_tx, progress_rx) = progress_channel();
    let scheduler = ChapterScheduler::new(scheduler_config, &client_config, endpoints, history)?
        .with_progress(progress_tx);

    let display = ProgressDisplay::new(
        ProgressConfig {
            quiet,
            ..Default::default()
        },
        chapters.len(),
    );
    let display_handle = tokio::spawn(display.run(progress_rx));

    let summary = scheduler.run_all(&series, &chapters).await;
    drop(scheduler);
    if let Err(e) = display_handle.await {
        warn!("Progress display task failed: {}", e);
    }

    if !quiet {
        print_summary(&summary);
    }

    if summary.succeeded() == 0 {
        return Err(AppError::generic(format!(
            "No chapters of {} were downloaded",
            summary.series
        )));
    }
    Ok(())
}

/// Handle the history command
///
/// # Errors
///
/// Returns `AppError::History` if the history file exists but cannot be read
pub async fn handle_history(config: AppConfig) -> Result<()> {
    let store = HistoryStore::new(&config.library.history_file);
    let names = store.list().await?;

    if names.is_empty() {
        println!("No series downloaded yet ({})", store.path().display());
        return Ok(());
    }

    for name in names {
        println!("{name}");
    }
    Ok(())
}

/// Handle the config command
///
/// # Errors
///
/// Returns `AppError::Config` if the file cannot be written or the loaded
/// configuration cannot be rendered
pub async fn handle_config(args: ConfigArgs, config: Result<AppConfig>) -> Result<()> {
    match args.action {
        ConfigAction::Init { path, force } => {
            let (path, written) = AppConfig::initialize(path, force).await?;
            if written {
                println!("Created default configuration file:");
                println!("   {}", path.display());
            } else {
                println!(
                    "Configuration file already exists: {} (use --force to overwrite)",
                    path.display()
                );
            }
            Ok(())
        }
        ConfigAction::Show => {
            print!("{}", config?.to_toml()?);
            Ok(())
        }
    }
}

/// Command-line flags take precedence over file and environment settings
fn apply_download_flags(args: &DownloadArgs, config: &mut AppConfig) {
    if let Some(root) = &args.root {
        config.library.root = root.clone();
    }
    if args.uppercase {
        config.library.uppercase = true;
    }
    if args.edit {
        config.library.edit_mode = true;
    }
    if let Some(wave_size) = args.wave_size {
        config.scheduler.wave_size = wave_size;
    }
    if let Some(connections) = args.connections {
        config.scheduler.max_connections = connections;
    }
    if let Some(mode) = args.mode {
        config.scheduler.mode = mode;
    }
    if args.force {
        config.scheduler.overwrite_existing = true;
    }
}

async fn prompt_chapters(series: &MangaSeries) -> Result<Vec<String>> {
    let prompt = format!("Chapters of {} to download (e.g. 1-3,5): ", series.title);
    let line = tokio::task::spawn_blocking(move || -> io::Result<String> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(input)
    })
    .await
    .map_err(|e| AppError::generic(format!("Failed to read chapter list: {e}")))??;

    Ok(parse_chapter_list(line.trim())?)
}

fn print_plan(series: &MangaSeries, chapters: &[String]) {
    println!("Series:     {}", series.title);
    println!("Slug:       {}", series.slug);
    println!("Output:     {}", series.output_dir().display());
    println!("Chapters:   {}", chapters.len());
    for number in chapters {
        match format_chapter_number(number) {
            Ok(code) => println!("  {} -> {}", number, series.chapter_dir(&code).display()),
            Err(e) => println!("  {number} -> skipped ({e})"),
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    for line in summary_lines(summary) {
        println!("{line}");
    }
}

fn summary_lines(summary: &RunSummary) -> Vec<String> {
    let layout = if summary.workers > 0 {
        format!("{} workers", summary.workers)
    } else {
        format!("{} waves", summary.waves)
    };
    let mut lines = vec![
        summary.summary(),
        format!(
            "Started {} ({} mode, {})",
            summary.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            summary.mode,
            layout
        ),
    ];

    for result in &summary.results {
        let marker = match result.status {
            JobStatus::Succeeded => "ok  ",
            JobStatus::Skipped => "skip",
            _ => "FAIL",
        };
        lines.push(format!(
            "  {} Chapter {:<8} {:>4} pages  {}",
            marker,
            result.label(),
            result.pages_written,
            result.detail()
        ));
    }
    if !summary.history_recorded {
        lines.push(format!(
            "  Warning: '{}' could not be recorded in history",
            summary.series
        ));
    }
    lines
}
