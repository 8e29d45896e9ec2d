// es2scan - Multi-page document scanning on top of epsonscan2
//
// This is the library crate containing the scan session logic.
// The binary crate (main.rs) provides the command line entry point.

pub mod cli;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod session;
pub mod workspace;

// Re-export commonly used types for convenience
pub use config::{ConfigError, ScanConfiguration};
pub use models::{PageAdvance, SessionSettings, SessionState};
pub use services::{classify, ScanOutcome};
pub use session::{scan_document, SessionController, SessionError, SessionEvent, SessionObserver};
pub use workspace::Workspace;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
