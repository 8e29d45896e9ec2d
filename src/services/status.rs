//! Classification of epsonscan2 status output.
//!
//! epsonscan2 reports the result of a scan by printing a fixed sentence on
//! standard output (or nothing at all on success). The vocabulary is small
//! and stable, so it is matched byte-for-byte against [`DRIVER_STATUS_TABLE`].
//! Anything else becomes [`ScanOutcome::UnknownStatus`] carrying the raw
//! bytes, so the classifier is total and never fails.

use std::fmt;
use std::time::Duration;

/// Printed when no scanner is attached or the driver cannot see it.
pub const DEVICE_NOT_FOUND: &[u8] = b"ERROR : Device is not found...\n";

/// Printed when the driver lost the connection mid-scan.
pub const CONNECTION_ERROR: &[u8] =
    b"ERROR : Unable to send data. Check the connection to the scanner and try again.\n";

/// Printed when the driver itself gives up. Note: no trailing newline.
pub const DRIVER_CRASHED: &[u8] = b"ERROR : An unexpected error occurred. Epson Scan 2 will close.";

/// Printed when the ADF is empty.
pub const NO_DOCUMENT_LOADED: &[u8] = b"ERROR : Load the originals in the ADF.\n";

/// Empty output means the page was scanned.
pub const ALL_OKAY: &[u8] = b"";

/// Classified result of a single driver invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Success,
    DeviceNotFound,
    ConnectionError,
    DriverCrashed,
    NoDocumentLoaded,
    /// The driver did not exit before the per-invocation deadline.
    TimeoutExceeded(Duration),
    /// Output that matches none of the known sentences, kept verbatim.
    UnknownStatus(Vec<u8>),
}

/// Fieldless mirror of the known driver sentences, used by the lookup table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverStatus {
    AllOkay,
    DeviceNotFound,
    ConnectionError,
    DriverCrashed,
    NoDocumentLoaded,
}

impl From<DriverStatus> for ScanOutcome {
    fn from(status: DriverStatus) -> Self {
        match status {
            DriverStatus::AllOkay => ScanOutcome::Success,
            DriverStatus::DeviceNotFound => ScanOutcome::DeviceNotFound,
            DriverStatus::ConnectionError => ScanOutcome::ConnectionError,
            DriverStatus::DriverCrashed => ScanOutcome::DriverCrashed,
            DriverStatus::NoDocumentLoaded => ScanOutcome::NoDocumentLoaded,
        }
    }
}

/// Every sentence epsonscan2 is known to print, with its meaning.
pub const DRIVER_STATUS_TABLE: &[(&[u8], DriverStatus)] = &[
    (ALL_OKAY, DriverStatus::AllOkay),
    (DEVICE_NOT_FOUND, DriverStatus::DeviceNotFound),
    (CONNECTION_ERROR, DriverStatus::ConnectionError),
    (DRIVER_CRASHED, DriverStatus::DriverCrashed),
    (NO_DOCUMENT_LOADED, DriverStatus::NoDocumentLoaded),
];

/// Map raw driver output to a [`ScanOutcome`].
///
/// Exact byte equality only: a sentence with extra whitespace or a missing
/// newline is reported as [`ScanOutcome::UnknownStatus`].
pub fn classify(raw: &[u8]) -> ScanOutcome {
    DRIVER_STATUS_TABLE
        .iter()
        .find(|(sentence, _)| *sentence == raw)
        .map(|(_, status)| ScanOutcome::from(*status))
        .unwrap_or_else(|| ScanOutcome::UnknownStatus(raw.to_vec()))
}

impl ScanOutcome {
    /// True when the page was written by the driver.
    pub fn is_success(&self) -> bool {
        matches!(self, ScanOutcome::Success)
    }

    /// Outcomes that indicate the device or driver is unusable.
    ///
    /// Consecutive device failures end the session once they reach the
    /// configured limit. An empty feeder is not a device failure.
    pub fn is_device_failure(&self) -> bool {
        matches!(
            self,
            ScanOutcome::DeviceNotFound
                | ScanOutcome::ConnectionError
                | ScanOutcome::DriverCrashed
                | ScanOutcome::TimeoutExceeded(_)
        )
    }

    /// Whether an image file may have been written for this attempt.
    ///
    /// An unrecognized status is treated as "maybe", so the file it may have
    /// produced is never overwritten by the next attempt.
    pub fn may_have_written_page(&self) -> bool {
        matches!(self, ScanOutcome::Success | ScanOutcome::UnknownStatus(_))
    }

    /// Short stable name, used for metrics keys and structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ScanOutcome::Success => "success",
            ScanOutcome::DeviceNotFound => "device_not_found",
            ScanOutcome::ConnectionError => "connection_error",
            ScanOutcome::DriverCrashed => "driver_crashed",
            ScanOutcome::NoDocumentLoaded => "no_document_loaded",
            ScanOutcome::TimeoutExceeded(_) => "timeout_exceeded",
            ScanOutcome::UnknownStatus(_) => "unknown_status",
        }
    }
}

impl fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanOutcome::Success => write!(f, "page scanned"),
            ScanOutcome::DeviceNotFound => write!(f, "scanner device not found"),
            ScanOutcome::ConnectionError => write!(f, "connection error to scanner"),
            ScanOutcome::DriverCrashed => write!(f, "epsonscan2 unexpectedly closed"),
            ScanOutcome::NoDocumentLoaded => write!(f, "no document in scanner"),
            ScanOutcome::TimeoutExceeded(after) => {
                write!(f, "epsonscan2 did not finish within {:.1}s", after.as_secs_f64())
            }
            ScanOutcome::UnknownStatus(raw) => {
                write!(f, "unknown epsonscan2 status: {:?}", String::from_utf8_lossy(raw))
            }
        }
    }
}
