//! Result sinks and report artifacts.
//!
//! A finished [`ValidationReport`] is handed to a [`ResultSink`]. The
//! built-in [`JsonArtifactSink`] persists
//! `<dir>/<run_id>/validation_results.json` next to a SHA-256 digest so that
//! [`read_report_artifact`] can detect tampering.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::info;

use crate::domain::{Classification, GuardError, Result, RunStats, ValidationReport};

const REPORT_FILE: &str = "validation_results.json";
const DIGEST_FILE: &str = "validation_results.digest";

/// Downstream consumer of completed reports.
pub trait ResultSink {
    fn accept(&mut self, report: &ValidationReport) -> Result<()>;
}

/// Writes each accepted report as a digest-verified JSON artifact.
#[derive(Debug, Clone)]
pub struct JsonArtifactSink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl JsonArtifactSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
        }
    }

    /// Paths written so far, in order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ResultSink for JsonArtifactSink {
    fn accept(&mut self, report: &ValidationReport) -> Result<()> {
        let path = write_report_artifact(report, &self.dir)?;
        info!(path = %path.display(), "validation report written");
        self.written.push(path);
        Ok(())
    }
}

fn content_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Persist `<dir>/<run_id>/validation_results.json` and its digest.
pub fn write_report_artifact(report: &ValidationReport, dir: &Path) -> Result<PathBuf> {
    let run_dir = dir.join(report.run_id().to_string());
    std::fs::create_dir_all(&run_dir)?;

    let artifact_path = run_dir.join(REPORT_FILE);
    let json = serde_json::to_vec_pretty(report)?;

    std::fs::write(&artifact_path, &json)?;
    std::fs::write(run_dir.join(DIGEST_FILE), content_digest(&json).as_bytes())?;

    Ok(artifact_path)
}

/// Read `<dir>/<run_id>/validation_results.json` and verify its digest.
pub fn read_report_artifact(run_id: &str, dir: &Path) -> Result<ValidationReport> {
    let run_dir = dir.join(run_id);
    let json = std::fs::read(run_dir.join(REPORT_FILE))?;
    let expected = std::fs::read_to_string(run_dir.join(DIGEST_FILE))?;
    let actual = content_digest(&json);
    if expected.trim() != actual {
        return Err(GuardError::DigestMismatch {
            expected: expected.trim().to_string(),
            actual,
        });
    }

    Ok(serde_json::from_slice(&json)?)
}

/// Human-readable summary lines for the end of a run.
pub fn render_summary(stats: &RunStats) -> String {
    format!(
        "Summary:\n\
         Total responses validated: {}\n\
         Correct: {}\n\
         Hallucinations detected: {}\n\
         Unverifiable (edge cases): {}\n\
         Retries issued: {}\n\
         Accuracy rate: {:.2}%\n",
        stats.total,
        stats.correct,
        stats.hallucinations,
        stats.unverifiable,
        stats.retries(),
        stats.accuracy() * 100.0
    )
}

/// One line per entry: id, classification, attempts, final response.
pub fn render_result_lines(report: &ValidationReport) -> String {
    let mut out = String::new();
    for r in report.results() {
        let marker = match r.classification() {
            Classification::Correct => "ok",
            Classification::Hallucination => "HALLUCINATION",
            Classification::Unverifiable => "unverifiable",
        };
        out.push_str(&format!(
            "[{}] {} (attempts={}) {}\n",
            r.entry_id(),
            marker,
            r.total_attempts(),
            r.question()
        ));
        if let Some(response) = r.final_response() {
            out.push_str(&format!("    -> {}\n", response.trim()));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_formats_accuracy_percent() {
        let stats = RunStats {
            total: 4,
            correct: 3,
            hallucinations: 1,
            unverifiable: 0,
            total_attempts: 6,
        };
        let summary = render_summary(&stats);
        assert!(summary.contains("Total responses validated: 4"));
        assert!(summary.contains("Hallucinations detected: 1"));
        assert!(summary.contains("Retries issued: 2"));
        assert!(summary.contains("Accuracy rate: 75.00%"));
    }

    #[test]
    fn test_digest_is_sha256_hex() {
        let d = content_digest(b"abc");
        assert_eq!(
            d,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
