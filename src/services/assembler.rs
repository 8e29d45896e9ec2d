use crate::models::session::PAGE_PREFIX_STEM;
use crate::workspace::Workspace;
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use serde::Serialize;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

/// Errors from merging page images into the final document
#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("No page images found in {0}")]
    NoPages(Utf8PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with code {code}: {stderr}")]
    MergeFailed {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("Merge reported success but {0} was not written")]
    OutputMissing(Utf8PathBuf),
}

/// Merges ordered page images into a single output document.
#[allow(async_fn_in_trait)]
pub trait DocumentAssembler {
    async fn assemble(&mut self, pages: &[Utf8PathBuf], output: &Utf8Path) -> Result<(), AssemblyError>;
}

/// Merges pages with ImageMagick: `convert -adjoin <page>... <output>`.
#[derive(Debug, Clone)]
pub struct MagickAssembler {
    program: String,
}

impl MagickAssembler {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn build_args(pages: &[Utf8PathBuf], output: &Utf8Path) -> Vec<String> {
        let mut args = Vec::with_capacity(pages.len() + 2);
        args.push("-adjoin".to_string());
        args.extend(pages.iter().map(|page| page.to_string()));
        args.push(output.to_string());
        args
    }
}

impl Default for MagickAssembler {
    fn default() -> Self {
        Self::new("convert")
    }
}

impl DocumentAssembler for MagickAssembler {
    async fn assemble(&mut self, pages: &[Utf8PathBuf], output: &Utf8Path) -> Result<(), AssemblyError> {
        tracing::info!("Merging {} pages into {}", pages.len(), output);

        let result = Command::new(&self.program)
            .args(Self::build_args(pages, output))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| AssemblyError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(AssemblyError::MergeFailed {
                program: self.program.clone(),
                code: result.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

/// Page images in `dir` named `scan<digits>.<extension>`, in page order.
///
/// Sorting is numeric, so `scan1000` follows `scan999` even though the
/// names would not sort that way as strings.
pub fn collect_pages(dir: &Utf8Path, extension: &str) -> Result<Vec<Utf8PathBuf>, AssemblyError> {
    let pattern = Regex::new(&format!(
        r"^{}(\d+)\.{}$",
        regex::escape(PAGE_PREFIX_STEM),
        regex::escape(extension)
    ))
    .map_err(|err| AssemblyError::Io {
        path: dir.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, err),
    })?;

    let entries = dir.read_dir_utf8().map_err(|source| AssemblyError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut pages = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| AssemblyError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let Some(captures) = pattern.captures(entry.file_name()) else {
            continue;
        };
        // Digits only, so this fails only on absurdly long numbers
        let Ok(number) = captures[1].parse::<u64>() else {
            tracing::warn!("Ignoring page with unparsable number: {}", entry.path());
            continue;
        };
        pages.push((number, entry.path().to_path_buf()));
    }

    pages.sort();
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

/// What happened to the working directory after a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyReport {
    pub output: Utf8PathBuf,
    pub pages: usize,
    pub workdir_removed: bool,
}

/// Merge the pages of a finished session and discard its working directory.
///
/// The directory is only removed after a successful merge, so a failed
/// merge leaves the captured pages in place for a retry by hand.
pub async fn assemble_session<A: DocumentAssembler>(
    assembler: &mut A,
    workspace: &Workspace,
    extension: &str,
    output: &Utf8Path,
    keep_workdir: bool,
) -> Result<AssemblyReport, AssemblyError> {
    let pages = collect_pages(workspace.root(), extension)?;
    if pages.is_empty() {
        return Err(AssemblyError::NoPages(workspace.root().to_path_buf()));
    }

    assembler.assemble(&pages, output).await?;

    if !output.is_file() {
        return Err(AssemblyError::OutputMissing(output.to_path_buf()));
    }

    let workdir_removed = if keep_workdir {
        tracing::info!("Keeping working directory {}", workspace.root());
        false
    } else {
        match workspace.remove() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("{}", e);
                false
            }
        }
    };

    tracing::info!("Wrote {} pages to {}", pages.len(), output);

    Ok(AssemblyReport {
        output: output.to_path_buf(),
        pages: pages.len(),
        workdir_removed,
    })
}
