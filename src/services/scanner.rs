use camino::Utf8Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

/// Errors from launching or waiting on the scanner driver
#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to wait for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timeout after {0:?}")]
    Timeout(Duration),
}

/// Runs one single-page scan and hands back the driver's status output.
#[allow(async_fn_in_trait)]
pub trait ScanInvoker {
    /// Scan one page using the settings file at `config_path`.
    ///
    /// Returns the raw standard output of the driver.
    async fn scan(&mut self, config_path: &Utf8Path) -> Result<Vec<u8>, InvokeError>;
}

/// Invokes `epsonscan2 -s <settings>` as a child process.
#[derive(Debug, Clone)]
pub struct Epsonscan2Invoker {
    program: String,
    timeout: Option<Duration>,
}

impl Epsonscan2Invoker {
    pub fn new(program: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Arguments passed to the driver for a settings file.
    pub fn build_args(config_path: &Utf8Path) -> Vec<String> {
        vec!["-s".to_string(), config_path.to_string()]
    }
}

impl Default for Epsonscan2Invoker {
    fn default() -> Self {
        Self::new("epsonscan2", Some(Duration::from_secs(10)))
    }
}

impl ScanInvoker for Epsonscan2Invoker {
    async fn scan(&mut self, config_path: &Utf8Path) -> Result<Vec<u8>, InvokeError> {
        tracing::info!("Scanning...");

        let start = Instant::now();

        // kill_on_drop so an expired deadline does not leave the driver running
        let child = Command::new(&self.program)
            .args(Self::build_args(config_path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| InvokeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let waited = match self.timeout {
            Some(limit) => timeout(limit, child.wait_with_output()).await.map_err(|_| {
                tracing::warn!("{} timed out after {:?}", self.program, limit);
                InvokeError::Timeout(limit)
            })?,
            None => child.wait_with_output().await,
        };

        let output = waited.map_err(|source| InvokeError::Wait {
            program: self.program.clone(),
            source,
        })?;

        tracing::debug!(
            "{} finished in {:.2}s with exit code {}, stdout: {:?}",
            self.program,
            start.elapsed().as_secs_f32(),
            output.status.code().unwrap_or(-1),
            String::from_utf8_lossy(&output.stdout)
        );

        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args() {
        let args = Epsonscan2Invoker::build_args(Utf8Path::new("scan_x/settings.sf2"));
        assert_eq!(args, vec!["-s".to_string(), "scan_x/settings.sf2".to_string()]);
    }

    #[test]
    fn test_default_invoker() {
        let invoker = Epsonscan2Invoker::default();
        assert_eq!(invoker.program(), "epsonscan2");
        assert_eq!(invoker.timeout(), Some(Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let mut invoker = Epsonscan2Invoker::new("es2scan-test-no-such-driver", None);
        let result = invoker.scan(Utf8Path::new("settings.sf2")).await;
        assert!(matches!(result, Err(InvokeError::Spawn { .. })));
    }
}
