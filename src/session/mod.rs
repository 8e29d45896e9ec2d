//! Scan session state machine.
//!
//! A session scans one page per driver invocation until its [`StopSignal`]
//! fires. Each iteration:
//!
//! 1. picks the target page (`state.page + 1`) and its prefix (`scan001`, ...)
//! 2. rewrites the two session fields of the settings template and writes the
//!    snapshot to the workspace's `settings.sf2` (one file, overwritten each time)
//! 3. runs the driver and classifies its output
//! 4. advances the page index according to [`PageAdvance`]
//! 5. asks the stop signal whether to end the session
//!
//! Device failures are retried; enough of them in a row end the session
//! with [`SessionError::PersistentFailure`]. Configuration problems and a
//! driver that cannot be launched at all are fatal immediately.
//!
//! [`PageAdvance`]: crate::models::PageAdvance

pub mod events;
pub mod stop;

pub use events::{SessionEvent, SessionObserver, TracingObserver};
pub use stop::{FeederEmpty, PageLimit, StopReason, StopSignal};

use crate::config::{ConfigError, ScanConfiguration};
use crate::metrics::SessionMetrics;
use crate::models::session::MAX_PAGE_INDEX;
use crate::models::{page_prefix, SessionSettings, SessionState};
use crate::services::{
    assemble_session, classify, collect_pages, AssemblyError, AssemblyReport, DocumentAssembler,
    InvokeError, ScanInvoker, ScanOutcome,
};
use crate::workspace::{Workspace, WorkspaceError};
use serde::Serialize;
use std::time::Instant;
use thiserror::Error;

/// Errors that end a session
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Scanner driver failed: {0}")]
    Driver(#[from] InvokeError),

    #[error("Giving up after {attempts} consecutive failures, last: {last}")]
    PersistentFailure { last: ScanOutcome, attempts: u32 },

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}

impl SessionError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            SessionError::Config(_) => 2,
            SessionError::Driver(_) | SessionError::PersistentFailure { .. } => 3,
            SessionError::Assembly(_) => 4,
            SessionError::Workspace(_) => 5,
        }
    }
}

/// Summary of a finished scan loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    /// Prefixes of pages that may have produced an image, in capture order
    pub captured: Vec<String>,
    pub attempts: u32,
    /// Page index when the session stopped
    pub last_page: u32,
    pub stop_reason: StopReason,
}

/// Summary of a complete run: scan loop plus merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentReport {
    pub session: SessionReport,
    pub assembly: AssemblyReport,
}

/// Drives the scanner page by page.
pub struct SessionController<I, S, O> {
    config: ScanConfiguration,
    invoker: I,
    stop: S,
    observer: O,
    settings: SessionSettings,
    metrics: SessionMetrics,
}

impl<I: ScanInvoker, S: StopSignal, O: SessionObserver> SessionController<I, S, O> {
    pub fn new(
        config: ScanConfiguration,
        invoker: I,
        stop: S,
        observer: O,
        settings: SessionSettings,
    ) -> Self {
        Self {
            config,
            invoker,
            stop,
            observer,
            settings,
            metrics: SessionMetrics::new(),
        }
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    /// The settings template as last written.
    pub fn config(&self) -> &ScanConfiguration {
        &self.config
    }

    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    /// Run the scan loop until the stop signal fires or the session fails.
    pub async fn run(&mut self, workspace: &Workspace) -> Result<SessionReport, SessionError> {
        let mut state = SessionState::new(workspace.root(), &workspace.settings_path());

        self.observer.on_event(&SessionEvent::SessionStarted {
            workdir: state.workdir.clone(),
        });

        let result = self.run_loop(&mut state).await;
        self.metrics.log_summary();
        result
    }

    async fn run_loop(&mut self, state: &mut SessionState) -> Result<SessionReport, SessionError> {
        let stop_reason = loop {
            if state.next_page() > MAX_PAGE_INDEX {
                break StopReason::PageRangeExhausted;
            }

            let outcome = match self.step(state).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.finish(state, StopReason::Aborted);
                    return Err(e);
                }
            };

            let limit = self.settings.max_consecutive_failures;
            if limit > 0 && state.consecutive_failures >= limit {
                self.finish(state, StopReason::PersistentFailure);
                return Err(SessionError::PersistentFailure {
                    last: outcome,
                    attempts: state.consecutive_failures,
                });
            }

            if let Some(reason) = self.stop.should_stop(state, &outcome) {
                break reason;
            }

            if !outcome.is_success() && !self.settings.retry_delay.is_zero() {
                tokio::time::sleep(self.settings.retry_delay).await;
            }
        };

        self.finish(state, stop_reason.clone());

        Ok(SessionReport {
            captured: state.captured.clone(),
            attempts: state.attempts,
            last_page: state.page,
            stop_reason,
        })
    }

    /// One attempted page capture.
    pub async fn step(&mut self, state: &mut SessionState) -> Result<ScanOutcome, SessionError> {
        let page = state.next_page();
        let prefix = page_prefix(page);

        self.config.set_output_directory(&state.workdir)?;
        self.config.set_file_prefix(&prefix)?;
        self.config.materialize(&state.config_path)?;

        self.observer.on_event(&SessionEvent::PageAttempt {
            page,
            prefix: prefix.clone(),
        });

        let start = Instant::now();
        let outcome = match self.invoker.scan(&state.config_path).await {
            Ok(raw) => classify(&raw),
            Err(InvokeError::Timeout(limit)) => ScanOutcome::TimeoutExceeded(limit),
            Err(e) => return Err(e.into()),
        };
        self.metrics.record_attempt(&outcome, start.elapsed());

        let advanced = state.record_attempt(page, &outcome, self.settings.advance);

        self.observer.on_event(&SessionEvent::PageScanned {
            page,
            prefix,
            outcome: outcome.clone(),
            advanced,
        });

        Ok(outcome)
    }

    fn finish(&mut self, state: &mut SessionState, reason: StopReason) {
        state.stop();
        self.observer.on_event(&SessionEvent::SessionStopped {
            reason,
            pages: state.captured.len(),
        });
    }
}

/// The stop signal described by `settings`: the page bound, plus the
/// empty-feeder check when enabled.
pub fn stop_signal_for(settings: &SessionSettings) -> (PageLimit, Option<FeederEmpty>) {
    (
        PageLimit::new(settings.max_pages),
        settings.stop_when_empty.then_some(FeederEmpty),
    )
}

/// Scan a whole document: run the session, then merge the pages.
///
/// On a scan failure the working directory is kept if it holds any page
/// images and removed otherwise. On a merge failure it is always kept.
pub async fn scan_document<I, A, O>(
    config: ScanConfiguration,
    workspace: &Workspace,
    settings: &SessionSettings,
    invoker: I,
    assembler: &mut A,
    observer: O,
) -> Result<DocumentReport, SessionError>
where
    I: ScanInvoker,
    A: DocumentAssembler,
    O: SessionObserver,
{
    let stop = stop_signal_for(settings);
    let mut controller = SessionController::new(config, invoker, stop, observer, settings.clone());

    let session = match controller.run(workspace).await {
        Ok(report) => report,
        Err(e) => {
            discard_if_empty(workspace, &settings.image_extension);
            return Err(e);
        }
    };

    let output = settings
        .output
        .clone()
        .unwrap_or_else(|| workspace.default_output());

    let assembly = assemble_session(
        assembler,
        workspace,
        &settings.image_extension,
        &output,
        settings.keep_workdir,
    )
    .await
    .inspect_err(|e| {
        tracing::error!("{}; captured pages kept in {}", e, workspace.root());
    })?;

    Ok(DocumentReport { session, assembly })
}

fn discard_if_empty(workspace: &Workspace, extension: &str) {
    match collect_pages(workspace.root(), extension) {
        Ok(pages) if pages.is_empty() => {
            if let Err(e) = workspace.remove() {
                tracing::warn!("{}", e);
            }
        }
        Ok(pages) => {
            tracing::warn!("{} captured pages kept in {}", pages.len(), workspace.root());
        }
        Err(e) => tracing::warn!("{}", e),
    }
}
