//! Configuration structures for the chapter scheduler

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{files, scheduler};

/// How chapter jobs are spread over time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulingMode {
    /// Consecutive waves of at most `wave_size` jobs, each wave finishing
    /// before the next starts
    #[default]
    Waves,
    /// `wave_size` persistent workers pulling jobs from a shared queue
    WorkerPool,
}

impl fmt::Display for SchedulingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulingMode::Waves => f.write_str("waves"),
            SchedulingMode::WorkerPool => f.write_str("pool"),
        }
    }
}

impl FromStr for SchedulingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "waves" | "wave" => Ok(SchedulingMode::Waves),
            "pool" | "worker-pool" => Ok(SchedulingMode::WorkerPool),
            other => Err(format!(
                "Unknown scheduling mode '{other}', expected 'waves' or 'pool'"
            )),
        }
    }
}

/// Configuration for the chapter scheduler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Requests allowed in flight across all chapter jobs
    pub max_connections: usize,
    /// Jobs per wave, or worker count in pool mode
    pub wave_size: usize,
    /// Scheduling strategy
    pub mode: SchedulingMode,
    /// Page ceiling used when the lookup page advertises no page count
    pub max_pages: u32,
    /// Re-download pages already on disk
    pub overwrite_existing: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_connections: scheduler::DEFAULT_MAX_CONNECTIONS,
            wave_size: scheduler::DEFAULT_WAVE_SIZE,
            mode: SchedulingMode::default(),
            max_pages: files::MAX_PAGE_INDEX,
            overwrite_existing: false,
        }
    }
}

impl SchedulerConfig {
    pub fn with_wave_size(mut self, wave_size: usize) -> Self {
        self.wave_size = wave_size;
        self
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_mode(mut self, mode: SchedulingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite_existing = overwrite;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.wave_size == 0 {
            return Err("Wave size cannot be zero".to_string());
        }

        if self.max_connections == 0 {
            return Err("Connection budget cannot be zero".to_string());
        }

        if self.max_pages == 0 {
            return Err("Page ceiling cannot be zero".to_string());
        }

        Ok(())
    }
}
