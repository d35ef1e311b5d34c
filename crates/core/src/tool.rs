//! Client for the external extraction tool.
//!
//! The tool is driven purely through its command line:
//!
//! ```text
//! <exec> extract <dataset> <output> --jsonOutput --region <region-file>
//! <exec> query <dataset> timestamp
//! ```
//!
//! `extract` prints one JSON [`Progress`] document per line while it works;
//! `query` prints a single RFC 3339 timestamp.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};

use crate::progress::Progress;
use crate::types::Timestamp;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read tool output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed progress line {line:?}: {source}")]
    MalformedProgress {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Tool exited with {0}")]
    Exited(ExitStatus),

    #[error("Tool printed an invalid timestamp {raw:?}: {source}")]
    InvalidTimestamp {
        raw: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Location of the tool binary and the dataset it operates on.
#[derive(Debug, Clone)]
pub struct ExtractTool {
    program: PathBuf,
    dataset: PathBuf,
}

impl ExtractTool {
    pub fn new(program: impl Into<PathBuf>, dataset: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            dataset: dataset.into(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.stdin(Stdio::null());
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> ToolError {
        ToolError::Spawn {
            program: self.program.display().to_string(),
            source,
        }
    }

    /// Start an extraction of the region in `region_file` into `output`.
    ///
    /// The child is killed if the returned [`ExtractRun`] is dropped before
    /// it exits.
    pub fn extract(&self, output: &Path, region_file: &Path) -> Result<ExtractRun, ToolError> {
        let mut child = self
            .command()
            .arg("extract")
            .arg(&self.dataset)
            .arg(output)
            .arg("--jsonOutput")
            .arg("--region")
            .arg(region_file)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("child stdout was not captured"))?;

        Ok(ExtractRun {
            child,
            lines: BufReader::new(stdout).lines(),
        })
    }

    /// Ask the tool when the dataset was last updated.
    pub async fn query_timestamp(&self) -> Result<Timestamp, ToolError> {
        let output = self
            .command()
            .arg("query")
            .arg(&self.dataset)
            .arg("timestamp")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(ToolError::Exited(output.status));
        }

        let raw = String::from_utf8_lossy(&output.stdout).trim().to_string();
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|source| ToolError::InvalidTimestamp { raw, source })
    }
}

/// A running `extract` invocation.
#[derive(Debug)]
pub struct ExtractRun {
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
}

impl ExtractRun {
    /// Next progress snapshot, or `None` once the tool closes stdout.
    ///
    /// Blank lines are skipped; anything else that is not a progress document
    /// is an error.
    pub async fn next_progress(&mut self) -> Result<Option<Progress>, ToolError> {
        while let Some(line) = self.lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            return serde_json::from_str(&line)
                .map(Some)
                .map_err(|source| ToolError::MalformedProgress { line, source });
        }
        Ok(None)
    }

    /// Wait for the tool to exit and check its status.
    pub async fn wait(mut self) -> Result<(), ToolError> {
        let status = self.child.wait().await?;
        if status.success() {
            Ok(())
        } else {
            Err(ToolError::Exited(status))
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::test_support::fake_tool;

    #[tokio::test]
    async fn progress_lines_stream_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let region = dir.path().join("r.bbox");
        std::fs::write(&region, "0,0,1,1").unwrap();
        let out = dir.path().join("out.osm.pbf");

        let tool = ExtractTool::new(fake_tool(), dir.path().join("ok"));
        let mut run = tool.extract(&out, &region).unwrap();

        let first = run.next_progress().await.unwrap().unwrap();
        assert_eq!(first.cells_prog, 1);
        // The blank line in between is skipped.
        let second = run.next_progress().await.unwrap().unwrap();
        assert_eq!(second.cells_prog, 2);
        assert!(run.next_progress().await.unwrap().is_none());
        run.wait().await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "0,0,1,1");
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ExtractTool::new(fake_tool(), dir.path().join("fail"));
        let mut run = tool.extract(&dir.path().join("out"), &dir.path().join("region")).unwrap();
        assert!(run.next_progress().await.unwrap().is_some());
        assert!(run.next_progress().await.unwrap().is_none());
        assert_matches!(run.wait().await, Err(ToolError::Exited(status)) if status.code() == Some(3));
    }

    #[tokio::test]
    async fn malformed_line_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ExtractTool::new(fake_tool(), dir.path().join("garbage"));
        let mut run = tool.extract(&dir.path().join("out"), &dir.path().join("region")).unwrap();
        assert_matches!(
            run.next_progress().await,
            Err(ToolError::MalformedProgress { line, .. }) if line == "working..."
        );
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let tool = ExtractTool::new("/nonexistent/osmx", "planet.osmx");
        assert_matches!(
            tool.extract(Path::new("out"), Path::new("region")),
            Err(ToolError::Spawn { .. })
        );
    }

    #[tokio::test]
    async fn timestamp_query_parses_rfc3339() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ExtractTool::new(fake_tool(), dir.path().join("fixed"));
        let ts = tool.query_timestamp().await.unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-10-19T08:30:00+00:00");
    }

    #[tokio::test]
    async fn garbage_timestamp_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ExtractTool::new(fake_tool(), dir.path().join("garbage"));
        assert_matches!(
            tool.query_timestamp().await,
            Err(ToolError::InvalidTimestamp { raw, .. }) if raw == "yesterday"
        );
    }

    #[tokio::test]
    async fn failed_timestamp_query_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ExtractTool::new(fake_tool(), dir.path().join("broken"));
        assert_matches!(tool.query_timestamp().await, Err(ToolError::Exited(_)));
    }
}
