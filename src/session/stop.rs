//! When a session ends.
//!
//! The controller asks a [`StopSignal`] after every attempt. Today the
//! signals are a fixed page bound and the feeder running empty; a device
//! event source (such as the scanner's button) can be added as another
//! implementation without touching the controller.

use crate::models::SessionState;
use crate::services::ScanOutcome;
use serde::Serialize;
use std::fmt;

/// Why a session left the running state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum StopReason {
    /// The page index reached the bound
    PageLimit(u32),

    /// The feeder reported no document after at least one page
    FeederEmpty,

    /// The page index reached the highest representable page
    PageRangeExhausted,

    /// Too many consecutive device failures
    PersistentFailure,

    /// A settings write or driver launch failed; nothing to retry
    Aborted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::PageLimit(limit) => write!(f, "reached page limit of {}", limit),
            StopReason::FeederEmpty => write!(f, "document feeder is empty"),
            StopReason::PageRangeExhausted => write!(f, "ran out of page numbers"),
            StopReason::PersistentFailure => write!(f, "scanner keeps failing"),
            StopReason::Aborted => write!(f, "aborted by an unrecoverable error"),
        }
    }
}

/// Decides whether the session should stop after an attempt.
pub trait StopSignal {
    fn should_stop(&mut self, state: &SessionState, last: &ScanOutcome) -> Option<StopReason>;
}

/// Stop once the page index reaches `max_pages`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimit {
    max_pages: u32,
}

impl PageLimit {
    pub fn new(max_pages: u32) -> Self {
        Self { max_pages }
    }
}

impl StopSignal for PageLimit {
    fn should_stop(&mut self, state: &SessionState, _last: &ScanOutcome) -> Option<StopReason> {
        (state.page >= self.max_pages).then_some(StopReason::PageLimit(self.max_pages))
    }
}

/// Stop when the feeder is empty, but only after something was captured.
///
/// An empty feeder before the first page just means the stack has not been
/// loaded yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeederEmpty;

impl StopSignal for FeederEmpty {
    fn should_stop(&mut self, state: &SessionState, last: &ScanOutcome) -> Option<StopReason> {
        (*last == ScanOutcome::NoDocumentLoaded && !state.captured.is_empty())
            .then_some(StopReason::FeederEmpty)
    }
}

impl<S: StopSignal> StopSignal for Option<S> {
    fn should_stop(&mut self, state: &SessionState, last: &ScanOutcome) -> Option<StopReason> {
        self.as_mut()?.should_stop(state, last)
    }
}

/// Stops when either signal does; the first one wins.
impl<A: StopSignal, B: StopSignal> StopSignal for (A, B) {
    fn should_stop(&mut self, state: &SessionState, last: &ScanOutcome) -> Option<StopReason> {
        self.0
            .should_stop(state, last)
            .or_else(|| self.1.should_stop(state, last))
    }
}
