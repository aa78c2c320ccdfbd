//! Per-chapter results and the run summary

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::app::fetcher::StopReason;
use crate::app::models::JobStatus;
use crate::app::scheduler::config::SchedulingMode;

/// Where a chapter job ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    /// 1-based wave in wave mode
    Wave(usize),
    /// 1-based worker in pool mode
    Worker(usize),
    /// Never scheduled (repeated chapter or lost worker)
    NotRun,
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::Wave(n) => write!(f, "wave {n}"),
            Placement::Worker(n) => write!(f, "worker {n}"),
            Placement::NotRun => write!(f, "-"),
        }
    }
}

/// Terminal state of one requested chapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterResult {
    /// Chapter number as requested
    pub number: String,
    /// Formatted chapter code, absent when the number was malformed
    pub code: Option<String>,
    /// `Succeeded`, `Failed` or `Skipped`
    pub status: JobStatus,
    pub placement: Placement,
    /// Pages saved to disk
    pub pages_written: u32,
    /// Why the page loop stopped, if it ran
    pub stop: Option<StopReason>,
    /// Failure before the page loop ran (format or resolution)
    pub error: Option<String>,
    /// Earlier request this one repeats, set only on skipped entries
    pub repeat_of: Option<String>,
}

impl ChapterResult {
    /// Entry for a chapter that repeats `first` and is not run again
    pub fn skipped(number: &str, code: Option<String>, first: &str) -> Self {
        Self {
            number: number.to_string(),
            code,
            status: JobStatus::Skipped,
            placement: Placement::NotRun,
            pages_written: 0,
            stop: None,
            error: None,
            repeat_of: Some(first.to_string()),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == JobStatus::Succeeded
    }

    /// Human-readable label, preferring the formatted code
    pub fn label(&self) -> &str {
        self.code.as_deref().unwrap_or(&self.number)
    }

    /// Why the chapter ended the way it did
    pub fn detail(&self) -> String {
        if let Some(first) = &self.repeat_of {
            return format!("repeats chapter {first}");
        }
        match (&self.error, &self.stop) {
            (Some(error), _) => error.clone(),
            (None, Some(stop)) => stop.to_string(),
            (None, None) => self.status.to_string(),
        }
    }
}

/// Final result of one run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Normalized series title
    pub series: String,
    /// Series slug
    pub slug: String,
    /// One entry per requested chapter, in input order, repeats included
    pub results: Vec<ChapterResult>,
    pub mode: SchedulingMode,
    /// Waves run, zero in pool mode
    pub waves: usize,
    /// Workers spawned, zero in wave mode
    pub workers: usize,
    /// Whether the history append succeeded
    pub history_recorded: bool,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.count(JobStatus::Succeeded)
    }

    pub fn failed(&self) -> usize {
        self.count(JobStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(JobStatus::Skipped)
    }

    fn count(&self, status: JobStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn total_pages(&self) -> u64 {
        self.results.iter().map(|r| u64::from(r.pages_written)).sum()
    }

    /// Get a summary of the run
    pub fn summary(&self) -> String {
        let skipped = self.skipped();
        let mut line = format!(
            "{}: {} of {} chapters downloaded, {} pages in {:.1}s",
            self.series,
            self.succeeded(),
            self.results.len() - skipped,
            self.total_pages(),
            self.elapsed.as_secs_f64()
        );
        if skipped > 0 {
            line.push_str(&format!(", {skipped} repeated chapters skipped"));
        }
        line
    }
}
