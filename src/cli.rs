//! Command line interface.

use crate::models::{PageAdvance, SessionSettings};
use crate::models::session::MAX_PAGE_INDEX;
use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "es2scan", version, about = "Scan multipage documents.")]
pub struct Cli {
    /// Base settings file to use for scanning.
    pub settingsfile: Utf8PathBuf,

    /// Seconds a single page scan may take before the driver is stopped (0 disables).
    #[arg(short, long, default_value = "10.0", value_parser = parse_seconds)]
    pub timeout: Duration,

    /// Stop after this many pages.
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(1..=MAX_PAGE_INDEX as i64))]
    pub max_pages: u32,

    /// Also stop when the feeder runs empty after at least one page.
    #[arg(long)]
    pub stop_when_empty: bool,

    /// When to move on to the next page number.
    #[arg(long, value_enum, default_value = "on-success")]
    pub advance: AdvanceArg,

    /// Give up after this many device failures in a row (0 retries forever).
    #[arg(long, default_value_t = 3)]
    pub max_consecutive_failures: u32,

    /// Seconds to wait before retrying after a failed scan.
    #[arg(long, default_value = "1.0", value_parser = parse_seconds)]
    pub retry_delay: Duration,

    /// Scanner driver executable.
    #[arg(long, default_value = "epsonscan2")]
    pub driver: String,

    /// Image merge executable.
    #[arg(long, default_value = "convert")]
    pub converter: String,

    /// Extension of the page images written by the driver.
    #[arg(long, default_value = "png")]
    pub image_extension: String,

    /// Output document (default: scan_<YYYYMMDD_HHMMSS>.pdf).
    #[arg(short, long)]
    pub output: Option<Utf8PathBuf>,

    /// Keep the working directory after merging.
    #[arg(long)]
    pub keep_workdir: bool,

    /// Print the run report as JSON on success.
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging.
    #[arg(long)]
    pub debug: bool,

    /// Also write logs to a daily rotating file in this directory.
    #[arg(long)]
    pub log_dir: Option<Utf8PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum AdvanceArg {
    OnSuccess,
    EveryAttempt,
}

impl From<AdvanceArg> for PageAdvance {
    fn from(arg: AdvanceArg) -> Self {
        match arg {
            AdvanceArg::OnSuccess => PageAdvance::OnSuccess,
            AdvanceArg::EveryAttempt => PageAdvance::EveryAttempt,
        }
    }
}

/// Seconds as a float, e.g. `2.5`. Rejects negative, NaN and out-of-range values.
fn parse_seconds(raw: &str) -> Result<Duration, String> {
    let secs: f64 = raw.parse().map_err(|_| format!("not a number: {}", raw))?;
    Duration::try_from_secs_f64(secs)
        .map_err(|e| format!("not a usable number of seconds ({}): {}", e, raw))
}

impl Cli {
    /// Session settings for this invocation.
    pub fn session_settings(&self) -> SessionSettings {
        let driver_timeout = (!self.timeout.is_zero()).then_some(self.timeout);

        SessionSettings {
            max_pages: self.max_pages,
            stop_when_empty: self.stop_when_empty,
            advance: self.advance.into(),
            max_consecutive_failures: self.max_consecutive_failures,
            retry_delay: self.retry_delay,
            driver_timeout,
            driver_program: self.driver.clone(),
            converter_program: self.converter.clone(),
            image_extension: self.image_extension.clone(),
            output: self.output.clone(),
            keep_workdir: self.keep_workdir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_session_defaults() {
        let cli = Cli::try_parse_from(["es2scan", "base.sf2"]).unwrap();
        assert_eq!(cli.settingsfile, Utf8PathBuf::from("base.sf2"));
        assert_eq!(cli.session_settings(), SessionSettings::default());
    }

    #[test]
    fn test_short_timeout_flag() {
        let cli = Cli::try_parse_from(["es2scan", "-t", "2.5", "base.sf2"]).unwrap();
        assert_eq!(
            cli.session_settings().driver_timeout,
            Some(Duration::from_millis(2500))
        );
    }

    #[test]
    fn test_zero_timeout_disables_deadline() {
        let cli = Cli::try_parse_from(["es2scan", "--timeout", "0", "base.sf2"]).unwrap();
        assert_eq!(cli.session_settings().driver_timeout, None);
    }

    #[test]
    fn test_rejects_negative_timeout() {
        assert!(Cli::try_parse_from(["es2scan", "-t", "-1", "base.sf2"]).is_err());
    }

    #[test]
    fn test_rejects_oversized_seconds() {
        assert!(Cli::try_parse_from(["es2scan", "-t", "1e20", "base.sf2"]).is_err());
        assert!(Cli::try_parse_from(["es2scan", "--retry-delay", "1e20", "base.sf2"]).is_err());
        assert!(Cli::try_parse_from(["es2scan", "--retry-delay", "NaN", "base.sf2"]).is_err());
    }

    #[test]
    fn test_retry_delay_fraction() {
        let cli = Cli::try_parse_from(["es2scan", "--retry-delay", "0.25", "base.sf2"]).unwrap();
        assert_eq!(cli.session_settings().retry_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_rejects_zero_pages() {
        assert!(Cli::try_parse_from(["es2scan", "--max-pages", "0", "base.sf2"]).is_err());
    }

    #[test]
    fn test_settings_file_required() {
        assert!(Cli::try_parse_from(["es2scan"]).is_err());
    }

    #[test]
    fn test_policy_flags() {
        let cli = Cli::try_parse_from([
            "es2scan",
            "--advance",
            "every-attempt",
            "--stop-when-empty",
            "--max-pages",
            "20",
            "--output",
            "letter.pdf",
            "base.sf2",
        ])
        .unwrap();

        let settings = cli.session_settings();
        assert_eq!(settings.advance, PageAdvance::EveryAttempt);
        assert!(settings.stop_when_empty);
        assert_eq!(settings.max_pages, 20);
        assert_eq!(settings.output, Some(Utf8PathBuf::from("letter.pdf")));
    }
}
