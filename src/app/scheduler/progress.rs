//! Progress events emitted while a run is in flight

use tokio::sync::mpsc;

use super::stats::{ChapterResult, Placement, RunSummary};

/// Sender half handed to the scheduler
pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

/// Receiver half consumed by a progress display
pub type ProgressReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

/// Events of one chapter are sent in causal order
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A chapter job began executing
    ChapterStarted {
        chapter: String,
        placement: Placement,
    },
    /// A chapter's resource path was found; pages are fetched next
    ChapterResolved {
        chapter: String,
        page_hint: Option<u32>,
    },
    /// A page ended up on disk
    PageSaved { chapter: String, page: u32 },
    /// A chapter reached a terminal state, including repeats that never ran
    ChapterFinished {
        chapter: String,
        result: ChapterResult,
    },
    /// Every job is terminal and history has been written
    RunFinished { summary: RunSummary },
}

/// Create a progress channel
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

/// Send an event if anyone is listening. A dropped receiver is not an error.
pub(crate) fn emit(tx: &Option<ProgressSender>, event: ProgressEvent) {
    if let Some(tx) = tx {
        let _ = tx.send(event);
    }
}
