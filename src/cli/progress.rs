//! Live progress display for chapter downloads
//!
//! Consumes the scheduler's progress events. On a terminal every running
//! chapter gets its own bar under an overall chapter counter; otherwise one
//! plain line is printed per chapter start and finish.

use std::collections::HashMap;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing::debug;

use crate::app::{ProgressEvent, ProgressReceiver};

const OVERALL_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chapters {msg}";
const CHAPTER_BAR_TEMPLATE: &str = "  {prefix:>14} [{bar:30.green/white}] {pos}/{len} {msg}";
const CHAPTER_SPINNER_TEMPLATE: &str = "  {prefix:>14} {spinner:.blue} {pos} pages {msg}";

/// Configuration for progress display
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Enable visual progress bars
    pub enable_progress_bars: bool,
    /// Print nothing at all
    pub quiet: bool,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enable_progress_bars: true,
            quiet: false,
        }
    }
}

fn style(template: &str, fallback: ProgressStyle) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or(fallback)
}

/// Main progress display manager
pub struct ProgressDisplay {
    config: ProgressConfig,
    multi_progress: Option<MultiProgress>,
    overall: Option<ProgressBar>,
    chapter_bars: HashMap<String, ProgressBar>,
}

impl ProgressDisplay {
    /// Create a display for a run of `total_chapters` chapters
    pub fn new(config: ProgressConfig, total_chapters: usize) -> Self {
        let is_terminal = atty::is(atty::Stream::Stderr);
        let use_bars = config.enable_progress_bars && is_terminal && !config.quiet;

        let (multi_progress, overall) = if use_bars {
            let multi = MultiProgress::new();
            let overall = multi.add(ProgressBar::new(total_chapters as u64));
            overall.set_style(
                style(OVERALL_TEMPLATE, ProgressStyle::default_bar()).progress_chars("##-"),
            );
            (Some(multi), Some(overall))
        } else {
            (None, None)
        };

        Self {
            config,
            multi_progress,
            overall,
            chapter_bars: HashMap::new(),
        }
    }

    /// Render events until the run finishes or the channel closes
    pub async fn run(mut self, mut events: ProgressReceiver) {
        while let Some(event) = events.recv().await {
            let finished = matches!(event, ProgressEvent::RunFinished { .. });
            self.handle(event);
            if finished {
                break;
            }
        }
        self.finish();
    }

    fn handle(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::ChapterStarted { chapter, placement } => {
                if let Some(multi) = &self.multi_progress {
                    let bar = multi.add(ProgressBar::new_spinner());
                    bar.set_style(style(
                        CHAPTER_SPINNER_TEMPLATE,
                        ProgressStyle::default_spinner(),
                    ));
                    bar.set_prefix(format!("Chapter {chapter}"));
                    bar.set_message("resolving");
                    bar.enable_steady_tick(std::time::Duration::from_millis(120));
                    self.chapter_bars.insert(chapter, bar);
                } else if !self.config.quiet {
                    eprintln!("[{placement}] Chapter {chapter}: started");
                }
            }
            ProgressEvent::ChapterResolved { chapter, page_hint } => {
                if let Some(bar) = self.chapter_bars.get(&chapter) {
                    if let Some(pages) = page_hint {
                        bar.set_length(u64::from(pages));
                        bar.set_style(
                            style(CHAPTER_BAR_TEMPLATE, ProgressStyle::default_bar())
                                .progress_chars("=> "),
                        );
                    }
                    bar.set_message("downloading");
                }
            }
            ProgressEvent::PageSaved { chapter, page } => {
                if let Some(bar) = self.chapter_bars.get(&chapter) {
                    bar.inc(1);
                    bar.set_message(format!("page {page:03}"));
                }
            }
            ProgressEvent::ChapterFinished { chapter, result } => {
                let line = format!(
                    "{}, {} pages ({})",
                    result.status,
                    result.pages_written,
                    result.detail()
                );
                let plain = format!("[{}] Chapter {}: {line}", result.placement, result.label());
                if let Some(bar) = self.chapter_bars.remove(&chapter) {
                    bar.finish_with_message(line);
                } else if let Some(overall) = &self.overall {
                    // Skipped repeats never get a bar of their own
                    overall.println(plain);
                } else if !self.config.quiet {
                    eprintln!("{plain}");
                }
                if let Some(overall) = &self.overall {
                    overall.inc(1);
                }
            }
            ProgressEvent::RunFinished { summary } => {
                debug!("Progress display received run summary");
                if let Some(overall) = &self.overall {
                    overall.set_message(format!("{} pages", summary.total_pages()));
                }
            }
        }
    }

    fn finish(&mut self) {
        for (_, bar) in self.chapter_bars.drain() {
            bar.abandon();
        }
        if let Some(overall) = self.overall.take() {
            overall.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{progress_channel, ChapterResult, JobStatus, Placement, StopReason};

    #[tokio::test]
    async fn test_display_stops_when_channel_closes() {
        let config = ProgressConfig {
            enable_progress_bars: false,
            quiet: true,
        };
        let display = ProgressDisplay::new(config, 1);
        assert!(display.multi_progress.is_none());

        let (tx, rx) = progress_channel();
        let handle = tokio::spawn(display.run(rx));

        tx.send(ProgressEvent::ChapterStarted {
            chapter: "1".to_string(),
            placement: Placement::Worker(1),
        })
        .unwrap();
        tx.send(ProgressEvent::ChapterFinished {
            chapter: "1".to_string(),
            result: ChapterResult {
                number: "1".to_string(),
                code: Some("0001".to_string()),
                status: JobStatus::Succeeded,
                placement: Placement::Worker(1),
                pages_written: 3,
                stop: Some(StopReason::Completed),
                error: None,
                repeat_of: None,
            },
        })
        .unwrap();
        drop(tx);

        handle.await.unwrap();
    }
}
