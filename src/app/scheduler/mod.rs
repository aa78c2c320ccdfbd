//! Chapter scheduling under a shared connection budget
//!
//! The scheduler owns the one HTTP client of a run and drives every requested
//! chapter through resolution and page fetching. Two strategies are offered:
//!
//! - [`SchedulingMode::Waves`]: chapters are split, in input order, into
//!   consecutive waves of at most `wave_size` jobs. Every job of a wave runs
//!   concurrently and the next wave starts only once all of them are terminal.
//! - [`SchedulingMode::WorkerPool`]: `wave_size` persistent workers pull jobs
//!   from a shared FIFO queue until it is empty, with no barrier between jobs.
//!
//! In both modes the connection budget bounds requests in flight across all
//! jobs, a failing chapter never affects its siblings, results come back in
//! input order and the series is appended to history exactly once at the end.
//! A chapter requested twice runs once; the repeat is reported as skipped.
//!
//! # Examples
//!
//! ```rust,no_run
//! use manga_fetcher::app::{
//!     ChapterScheduler, ClientConfig, Endpoints, HistoryStore, MangaSeries,
//!     NameOptions, SchedulerConfig,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let scheduler = ChapterScheduler::new(
//!     SchedulerConfig::default(),
//!     &ClientConfig::default(),
//!     Endpoints::default(),
//!     HistoryStore::new("download_history.txt"),
//! )?;
//!
//! let series = MangaSeries::new("one piece", &NameOptions::default(), "MANGA")?;
//! let summary = scheduler
//!     .run_all(&series, &["1".to_string(), "2".to_string()])
//!     .await;
//! println!("{}", summary.summary());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod progress;
pub mod stats;

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::app::client::{ClientConfig, MangaClient};
use crate::app::endpoints::Endpoints;
use crate::app::fetcher::{ChapterTarget, PageFetchLoop};
use crate::app::history::HistoryStore;
use crate::app::models::{format_chapter_number, ChapterJob, JobStatus, MangaSeries};
use crate::app::resolver::AddressResolver;
use crate::errors::{DownloadError, DownloadResult};

pub use config::{SchedulerConfig, SchedulingMode};
pub use progress::{progress_channel, ProgressEvent, ProgressReceiver, ProgressSender};
pub use stats::{ChapterResult, Placement, RunSummary};

use progress::emit;

/// Split `items` into consecutive groups of at most `size`, preserving order
pub fn partition_waves<T>(items: &[T], size: usize) -> Vec<&[T]> {
    items.chunks(size.max(1)).collect()
}

/// A requested chapter that repeats an earlier request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatedChapter {
    /// Position in the request
    pub index: usize,
    pub number: String,
    /// The earlier request with the same chapter
    pub first: String,
}

/// Split repeated chapters off, keeping the first occurrence to run
///
/// Chapters are compared by formatted code, so `"7"` and `"0007"` are the same
/// chapter. Malformed numbers are compared verbatim and kept so they can fail
/// in their own slot.
pub fn dedup_chapters(chapter_numbers: &[String]) -> (Vec<String>, Vec<RepeatedChapter>) {
    let mut first_seen: HashMap<String, &str> = HashMap::new();
    let mut unique = Vec::new();
    let mut repeated = Vec::new();

    for (index, number) in chapter_numbers.iter().enumerate() {
        let key = format_chapter_number(number).unwrap_or_else(|_| number.trim().to_string());
        match first_seen.entry(key) {
            Entry::Occupied(first) => repeated.push(RepeatedChapter {
                index,
                number: number.clone(),
                first: first.get().to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(number);
                unique.push(number.clone());
            }
        }
    }

    (unique, repeated)
}

/// Put skipped entries back at their request positions
///
/// `results` holds the executed chapters in order; `skipped` is sorted by index.
fn merge_in_order(
    results: Vec<ChapterResult>,
    skipped: Vec<(usize, ChapterResult)>,
) -> Vec<ChapterResult> {
    let mut skipped = skipped.into_iter().peekable();
    let mut merged = Vec::with_capacity(results.len() + skipped.len());

    for result in results {
        while let Some((_, repeat)) = skipped.next_if(|(index, _)| *index == merged.len()) {
            merged.push(repeat);
        }
        merged.push(result);
    }
    merged.extend(skipped.map(|(_, repeat)| repeat));
    merged
}

/// Resolve-then-fetch pipeline shared by every job of a run
#[derive(Debug)]
struct ChapterPipeline {
    resolver: AddressResolver,
    fetcher: PageFetchLoop,
    progress: Option<ProgressSender>,
}

impl ChapterPipeline {
    async fn run_job(
        &self,
        series: &MangaSeries,
        number: String,
        placement: Placement,
    ) -> ChapterResult {
        emit(
            &self.progress,
            ProgressEvent::ChapterStarted {
                chapter: number.clone(),
                placement,
            },
        );

        let result = self.execute(series, &number, placement).await;

        emit(
            &self.progress,
            ProgressEvent::ChapterFinished {
                chapter: number,
                result: result.clone(),
            },
        );
        result
    }

    async fn execute(
        &self,
        series: &MangaSeries,
        number: &str,
        placement: Placement,
    ) -> ChapterResult {
        let mut job = match ChapterJob::new(number) {
            Ok(job) => job,
            Err(e) => {
                warn!("Skipping chapter '{}': {}", number, e);
                return ChapterResult {
                    number: number.to_string(),
                    code: None,
                    status: JobStatus::Failed,
                    placement,
                    pages_written: 0,
                    stop: None,
                    error: Some(e.to_string()),
                    repeat_of: None,
                };
            }
        };

        job.advance(JobStatus::Resolving);
        let resolved = match self.resolver.resolve(&series.slug, &job.code).await {
            Ok(resolved) => resolved,
            Err(e) => {
                job.advance(JobStatus::Failed);
                error!("Chapter {} failed: {}", job.code, e);
                return ChapterResult {
                    number: job.number,
                    code: Some(job.code),
                    status: JobStatus::Failed,
                    placement,
                    pages_written: 0,
                    stop: None,
                    error: Some(e.to_string()),
                    repeat_of: None,
                };
            }
        };

        info!(
            "Chapter {} resolved to {} ({} page, {} pages advertised)",
            job.code,
            resolved.resource_path,
            resolved.source,
            resolved
                .page_count
                .map_or_else(|| "no".to_string(), |n| n.to_string())
        );
        emit(
            &self.progress,
            ProgressEvent::ChapterResolved {
                chapter: number.to_string(),
                page_hint: resolved.page_count,
            },
        );

        job.advance(JobStatus::Downloading);
        let target = ChapterTarget {
            slug: &series.slug,
            code: &job.code,
            resource_path: &resolved.resource_path,
            dir: series.chapter_dir(&job.code),
        };
        let report = self
            .fetcher
            .run(&target, resolved.page_count, |page| {
                emit(
                    &self.progress,
                    ProgressEvent::PageSaved {
                        chapter: number.to_string(),
                        page,
                    },
                )
            })
            .await;

        let status = if report.succeeded() {
            JobStatus::Succeeded
        } else {
            JobStatus::Failed
        };
        job.advance(status);
        info!(
            "Chapter {} {} with {} pages ({})",
            job.code, status, report.pages_written, report.stop
        );

        ChapterResult {
            number: job.number,
            code: Some(job.code),
            status,
            placement,
            pages_written: report.pages_written,
            stop: Some(report.stop),
            error: None,
            repeat_of: None,
        }
    }
}

fn lost_result(number: &str, placement: Placement, reason: String) -> ChapterResult {
    ChapterResult {
        number: number.to_string(),
        code: format_chapter_number(number).ok(),
        status: JobStatus::Failed,
        placement,
        pages_written: 0,
        stop: None,
        error: Some(reason),
        repeat_of: None,
    }
}

/// Runs the chapters of one series under a shared connection budget
#[derive(Debug)]
pub struct ChapterScheduler {
    config: SchedulerConfig,
    client: Arc<MangaClient>,
    pipeline: Arc<ChapterPipeline>,
    history: HistoryStore,
}

impl ChapterScheduler {
    /// Create a scheduler and the HTTP client it owns
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::ConfigurationError` for an invalid scheduler
    /// configuration and `DownloadError` if the HTTP client cannot be built
    pub fn new(
        config: SchedulerConfig,
        client_config: &ClientConfig,
        endpoints: Endpoints,
        history: HistoryStore,
    ) -> DownloadResult<Self> {
        config.validate().map_err(DownloadError::ConfigurationError)?;

        let client = Arc::new(MangaClient::new(client_config, config.max_connections)?);
        let endpoints = Arc::new(endpoints);
        let pipeline = ChapterPipeline {
            resolver: AddressResolver::new(Arc::clone(&client), Arc::clone(&endpoints)),
            fetcher: PageFetchLoop::new(
                Arc::clone(&client),
                endpoints,
                config.max_pages,
                config.overwrite_existing,
            ),
            progress: None,
        };

        Ok(Self {
            config,
            client,
            pipeline: Arc::new(pipeline),
            history,
        })
    }

    /// Send progress events to `tx` during runs
    pub fn with_progress(mut self, tx: ProgressSender) -> Self {
        match Arc::get_mut(&mut self.pipeline) {
            Some(pipeline) => pipeline.progress = Some(tx),
            None => warn!("Progress channel ignored: a run is already in flight"),
        }
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// The HTTP client shared by every job
    pub fn client(&self) -> &Arc<MangaClient> {
        &self.client
    }

    /// Run every requested chapter and record the series in history
    ///
    /// Never fails: per-chapter errors are contained in the returned results
    /// and a history failure is logged and reported through
    /// `RunSummary::history_recorded`.
    pub async fn run_all(&self, series: &MangaSeries, chapter_numbers: &[String]) -> RunSummary {
        let started_at = chrono::Utc::now();
        let start = Instant::now();

        let (chapters, repeated) = dedup_chapters(chapter_numbers);
        let skipped: Vec<(usize, ChapterResult)> = repeated
            .into_iter()
            .map(|repeat| {
                info!(
                    "Skipping chapter '{}': repeats '{}'",
                    repeat.number, repeat.first
                );
                let code = format_chapter_number(&repeat.number).ok();
                let result = ChapterResult::skipped(&repeat.number, code, &repeat.first);
                emit(
                    &self.pipeline.progress,
                    ProgressEvent::ChapterFinished {
                        chapter: repeat.number,
                        result: result.clone(),
                    },
                );
                (repeat.index, result)
            })
            .collect();

        info!(
            "Downloading {} chapters of {} ({} mode, {} jobs at once, {} connections)",
            chapters.len(),
            series,
            self.config.mode,
            self.config.wave_size,
            self.config.max_connections
        );

        let series = Arc::new(series.clone());
        let (results, waves, workers) = match self.config.mode {
            SchedulingMode::Waves => {
                let (results, waves) = self.run_waves(&series, &chapters).await;
                (results, waves, 0)
            }
            SchedulingMode::WorkerPool => {
                let (results, workers) = self.run_pool(&series, &chapters).await;
                (results, 0, workers)
            }
        };
        let results = merge_in_order(results, skipped);

        let history_recorded = match self.history.add(&series.title).await {
            Ok(_) => true,
            Err(e) => {
                error!(
                    "Failed to record '{}' in {}: {}",
                    series.title,
                    self.history.path().display(),
                    e
                );
                false
            }
        };

        let summary = RunSummary {
            series: series.title.clone(),
            slug: series.slug.clone(),
            results,
            mode: self.config.mode,
            waves,
            workers,
            history_recorded,
            started_at,
            elapsed: start.elapsed(),
        };

        info!("{}", summary.summary());
        emit(
            &self.pipeline.progress,
            ProgressEvent::RunFinished {
                summary: summary.clone(),
            },
        );
        summary
    }

    async fn run_waves(
        &self,
        series: &Arc<MangaSeries>,
        chapters: &[String],
    ) -> (Vec<ChapterResult>, usize) {
        let waves = partition_waves(chapters, self.config.wave_size);
        let wave_count = waves.len();
        let mut results = Vec::with_capacity(chapters.len());

        for (index, wave) in waves.into_iter().enumerate() {
            let wave_number = index + 1;
            info!(
                "Starting wave {}/{} with {} chapters",
                wave_number,
                wave_count,
                wave.len()
            );

            let handles: Vec<_> = wave
                .iter()
                .map(|number| {
                    let pipeline = Arc::clone(&self.pipeline);
                    let series = Arc::clone(series);
                    let number = number.clone();
                    let placement = Placement::Wave(wave_number);
                    tokio::spawn(async move { pipeline.run_job(&series, number, placement).await })
                })
                .collect();

            // Barrier: every job of this wave is terminal before the next starts
            let outcomes = join_all(handles).await;
            for (outcome, number) in outcomes.into_iter().zip(wave) {
                results.push(match outcome {
                    Ok(result) => result,
                    Err(e) => {
                        error!("Chapter task for '{}' aborted: {}", number, e);
                        lost_result(
                            number,
                            Placement::Wave(wave_number),
                            format!("chapter task aborted: {e}"),
                        )
                    }
                });
            }
        }

        (results, wave_count)
    }

    async fn run_pool(
        &self,
        series: &Arc<MangaSeries>,
        chapters: &[String],
    ) -> (Vec<ChapterResult>, usize) {
        let queue: VecDeque<(usize, String)> = chapters.iter().cloned().enumerate().collect();
        let queue = Arc::new(Mutex::new(queue));
        let worker_count = self.config.wave_size.min(chapters.len());

        info!("Starting {} workers", worker_count);

        let handles: Vec<_> = (0..worker_count)
            .map(|worker_id| {
                let pipeline = Arc::clone(&self.pipeline);
                let series = Arc::clone(series);
                let queue = Arc::clone(&queue);
                tokio::spawn(async move {
                    let mut done = Vec::new();
                    loop {
                        let next = queue.lock().await.pop_front();
                        let Some((index, number)) = next else {
                            break;
                        };
                        let placement = Placement::Worker(worker_id + 1);
                        let result = pipeline.run_job(&series, number, placement).await;
                        done.push((index, result));
                    }
                    done
                })
            })
            .collect();

        let mut slots: Vec<Option<ChapterResult>> = vec![None; chapters.len()];
        for handle in handles {
            match handle.await {
                Ok(done) => {
                    for (index, result) in done {
                        slots[index] = Some(result);
                    }
                }
                Err(e) => error!("Worker aborted: {}", e),
            }
        }

        let results = slots
            .into_iter()
            .zip(chapters)
            .map(|(slot, number)| {
                slot.unwrap_or_else(|| {
                    lost_result(number, Placement::NotRun, "worker aborted".to_string())
                })
            })
            .collect();

        (results, worker_count)
    }
}
