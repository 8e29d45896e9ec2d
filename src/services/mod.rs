//! Services module - the boundaries a scan session talks to.
//!
//! # Components
//!
//! - [`status`]: Pure classification of epsonscan2 status output into [`ScanOutcome`].
//! - [`scanner`]: The [`ScanInvoker`] seam and [`Epsonscan2Invoker`], which runs
//!   `epsonscan2 -s <settings>` once per page with an optional deadline.
//! - [`assembler`]: The [`DocumentAssembler`] seam, [`MagickAssembler`] (ImageMagick
//!   `convert -adjoin`), page discovery and working directory cleanup.
//!
//! The two process-backed services are traits so the session controller can
//! be driven by scripted fakes in tests.

pub mod assembler;
pub mod scanner;
pub mod status;

pub use assembler::{
    assemble_session, collect_pages, AssemblyError, AssemblyReport, DocumentAssembler,
    MagickAssembler,
};
pub use scanner::{Epsonscan2Invoker, InvokeError, ScanInvoker};
pub use status::{classify, DriverStatus, ScanOutcome};
