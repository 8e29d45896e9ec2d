//! Data models for a scan session.
//!
//! - [`SessionSettings`]: Tunables for one run (page bound, advance policy, timeouts)
//! - [`SessionState`]: The record the session controller owns while a run is in progress
//! - [`PageAdvance`]: When the page index moves forward
//! - [`page_prefix`]: Deterministic file name stem for a page index

pub mod session;

pub use session::{page_prefix, PageAdvance, SessionPhase, SessionSettings, SessionState};
