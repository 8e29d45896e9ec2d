use crate::services::ScanOutcome;
use camino::Utf8PathBuf;
use tokio::sync::broadcast;
use tracing::Level;

use super::stop::StopReason;

/// Events emitted by the session controller
///
/// The controller reports what it does through these instead of logging
/// directly, so a run can be observed (and tested) without touching the
/// process-wide subscriber.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// The session is about to scan into `workdir`
    SessionStarted { workdir: Utf8PathBuf },

    /// A driver invocation is starting
    PageAttempt { page: u32, prefix: String },

    /// A driver invocation finished and was classified
    PageScanned {
        page: u32,
        prefix: String,
        outcome: ScanOutcome,
        advanced: bool,
    },

    /// The session left the running state having captured `pages` pages
    SessionStopped { reason: StopReason, pages: usize },
}

impl SessionEvent {
    /// Severity this event is logged at.
    ///
    /// Device errors are errors, an empty feeder is the expected end of a
    /// stack and only a warning. Unrecognized driver output is an error too;
    /// [`TracingObserver`] marks it `critical`.
    pub fn level(&self) -> Level {
        match self {
            SessionEvent::PageAttempt { .. } => Level::DEBUG,
            SessionEvent::PageScanned { outcome, .. } => match outcome {
                ScanOutcome::Success => Level::INFO,
                ScanOutcome::NoDocumentLoaded => Level::WARN,
                _ => Level::ERROR,
            },
            SessionEvent::SessionStopped {
                reason: StopReason::PersistentFailure | StopReason::Aborted,
                ..
            } => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

/// Receives session events.
#[cfg_attr(test, mockall::automock)]
pub trait SessionObserver {
    fn on_event(&self, event: &SessionEvent);
}

/// Writes session events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SessionObserver for TracingObserver {
    fn on_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::SessionStarted { workdir } => {
                tracing::info!("Scanning into {}", workdir);
            }
            SessionEvent::PageAttempt { page, prefix } => {
                tracing::debug!(page, "Scanning {}...", prefix);
            }
            SessionEvent::PageScanned {
                page,
                prefix,
                outcome,
                advanced,
            } => match outcome {
                ScanOutcome::Success => {
                    tracing::info!(page, "Successfully scanned {}", prefix);
                }
                ScanOutcome::NoDocumentLoaded => {
                    tracing::warn!(page, "No document in scanner...");
                }
                ScanOutcome::UnknownStatus(_) => {
                    tracing::error!(page, advanced, critical = true, "{}", outcome);
                }
                _ => {
                    tracing::error!(page, advanced, kind = outcome.kind(), "{}", outcome);
                }
            },
            SessionEvent::SessionStopped { reason, pages } => {
                if event.level() == Level::ERROR {
                    tracing::error!(pages, "Session stopped: {}", reason);
                } else {
                    tracing::info!(pages, "Session stopped: {}", reason);
                }
            }
        }
    }
}

impl SessionObserver for broadcast::Sender<SessionEvent> {
    fn on_event(&self, event: &SessionEvent) {
        // Ignore send errors - it's OK if no one is listening
        let _ = self.send(event.clone());
    }
}

impl<A: SessionObserver, B: SessionObserver> SessionObserver for (A, B) {
    fn on_event(&self, event: &SessionEvent) {
        self.0.on_event(event);
        self.1.on_event(event);
    }
}

impl<T: SessionObserver + ?Sized> SessionObserver for &T {
    fn on_event(&self, event: &SessionEvent) {
        (**self).on_event(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn scanned(outcome: ScanOutcome) -> SessionEvent {
        SessionEvent::PageScanned {
            page: 1,
            prefix: "scan001".to_string(),
            outcome,
            advanced: false,
        }
    }

    #[test]
    fn test_levels_follow_outcome() {
        assert_eq!(scanned(ScanOutcome::Success).level(), Level::INFO);
        assert_eq!(scanned(ScanOutcome::NoDocumentLoaded).level(), Level::WARN);
        assert_eq!(scanned(ScanOutcome::DeviceNotFound).level(), Level::ERROR);
        assert_eq!(scanned(ScanOutcome::ConnectionError).level(), Level::ERROR);
        assert_eq!(scanned(ScanOutcome::DriverCrashed).level(), Level::ERROR);
        assert_eq!(
            scanned(ScanOutcome::TimeoutExceeded(Duration::from_secs(1))).level(),
            Level::ERROR
        );
        assert_eq!(scanned(ScanOutcome::UnknownStatus(vec![0])).level(), Level::ERROR);
    }

    #[test]
    fn test_stop_levels() {
        let normal = SessionEvent::SessionStopped {
            reason: StopReason::PageLimit(2),
            pages: 2,
        };
        let failed = SessionEvent::SessionStopped {
            reason: StopReason::PersistentFailure,
            pages: 0,
        };
        let aborted = SessionEvent::SessionStopped {
            reason: StopReason::Aborted,
            pages: 1,
        };
        assert_eq!(normal.level(), Level::INFO);
        assert_eq!(failed.level(), Level::ERROR);
        assert_eq!(aborted.level(), Level::ERROR);
    }

    #[test]
    fn test_broadcast_observer() {
        let (tx, mut rx) = broadcast::channel(8);
        tx.on_event(&scanned(ScanOutcome::Success));

        let event = rx.try_recv().unwrap();
        assert_eq!(event, scanned(ScanOutcome::Success));
    }

    #[test]
    fn test_broadcast_observer_without_listeners() {
        let (tx, rx) = broadcast::channel::<SessionEvent>(8);
        drop(rx);
        tx.on_event(&scanned(ScanOutcome::Success));
    }

    #[test]
    fn test_pair_observer_fans_out() {
        let mut first = MockSessionObserver::new();
        first.expect_on_event().times(1).return_const(());
        let mut second = MockSessionObserver::new();
        second.expect_on_event().times(1).return_const(());

        (first, second).on_event(&scanned(ScanOutcome::DriverCrashed));
    }
}
