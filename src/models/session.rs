use crate::services::ScanOutcome;
use camino::{Utf8Path, Utf8PathBuf};
use std::time::Duration;

/// File name stem shared by every page image of a session.
pub const PAGE_PREFIX_STEM: &str = "scan";

/// Highest page index a session can reach.
///
/// Prefixes are padded to three digits; past 999 they would stop sorting
/// in capture order.
pub const MAX_PAGE_INDEX: u32 = 999;

/// File name stem for `page`, e.g. `scan001`.
pub fn page_prefix(page: u32) -> String {
    format!("{}{:03}", PAGE_PREFIX_STEM, page)
}

/// When the page index moves forward after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageAdvance {
    /// Advance only when an image may have been written (success or an
    /// unrecognized status). Failed attempts retry the same page.
    #[default]
    OnSuccess,

    /// Advance after every attempt, whatever the outcome.
    EveryAttempt,
}

impl PageAdvance {
    pub fn should_advance(self, outcome: &ScanOutcome) -> bool {
        match self {
            PageAdvance::OnSuccess => outcome.may_have_written_page(),
            PageAdvance::EveryAttempt => true,
        }
    }
}

/// Tunables for a single scan session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Stop once the page index reaches this value.
    pub max_pages: u32,

    /// Also stop when the feeder runs empty after at least one page.
    pub stop_when_empty: bool,

    pub advance: PageAdvance,

    /// Consecutive device failures that end the session. `0` retries forever.
    pub max_consecutive_failures: u32,

    /// Pause between a failed attempt and the next one.
    pub retry_delay: Duration,

    /// Deadline for a single driver invocation. `None` waits indefinitely.
    pub driver_timeout: Option<Duration>,

    pub driver_program: String,
    pub converter_program: String,

    /// Extension the driver uses for page images (without the dot).
    pub image_extension: String,

    /// Final document path. Defaults to `scan_<stamp>.pdf` next to the workspace.
    pub output: Option<Utf8PathBuf>,

    /// Leave the working directory in place after a successful merge.
    pub keep_workdir: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_pages: 2,
            stop_when_empty: false,
            advance: PageAdvance::OnSuccess,
            max_consecutive_failures: 3,
            retry_delay: Duration::from_secs(1),
            driver_timeout: Some(Duration::from_secs(10)),
            driver_program: "epsonscan2".to_string(),
            converter_program: "convert".to_string(),
            image_extension: "png".to_string(),
            output: None,
            keep_workdir: false,
        }
    }
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Running,
    Stopped,
}

/// In-memory record of one run, owned by the session controller.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub phase: SessionPhase,

    /// Index of the last page the session moved past. Starts at 0.
    pub page: u32,

    /// Driver invocations so far, successful or not.
    pub attempts: u32,

    /// Device failures since the last non-failure outcome.
    pub consecutive_failures: u32,

    /// Prefixes of pages that may have produced an image, in capture order.
    pub captured: Vec<String>,

    pub workdir: Utf8PathBuf,

    /// Settings snapshot rewritten before every attempt.
    pub config_path: Utf8PathBuf,
}

impl SessionState {
    pub fn new(workdir: &Utf8Path, config_path: &Utf8Path) -> Self {
        Self {
            phase: SessionPhase::Running,
            page: 0,
            attempts: 0,
            consecutive_failures: 0,
            captured: Vec::new(),
            workdir: workdir.to_path_buf(),
            config_path: config_path.to_path_buf(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == SessionPhase::Running
    }

    /// Page index the next attempt targets.
    pub fn next_page(&self) -> u32 {
        self.page + 1
    }

    /// Fold the outcome of an attempt at `page` into the state.
    ///
    /// Returns whether the page index advanced.
    pub fn record_attempt(&mut self, page: u32, outcome: &ScanOutcome, advance: PageAdvance) -> bool {
        self.attempts += 1;

        if outcome.is_device_failure() {
            self.consecutive_failures += 1;
        } else {
            self.consecutive_failures = 0;
        }

        if outcome.may_have_written_page() {
            self.captured.push(page_prefix(page));
        }

        let advanced = advance.should_advance(outcome);
        if advanced {
            self.page = page;
        }
        advanced
    }

    pub fn stop(&mut self) {
        self.phase = SessionPhase::Stopped;
    }
}
