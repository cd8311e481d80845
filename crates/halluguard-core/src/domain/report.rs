//! Per-entry results and the aggregate run report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::attempt::Attempt;
use super::entry::{Domain, KbEntry};
use super::outcome::Classification;

/// Final outcome for one knowledge base entry.
///
/// # Invariants
///
/// `total_attempts == attempts.len()`, attempt numbers run 1..=n without
/// gaps, and `classification` is the classification of the last attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    entry_id: String,
    question: String,
    domain: Domain,
    classification: Classification,
    attempts: Vec<Attempt>,
    total_attempts: u32,
}

impl ValidationResult {
    pub(crate) fn finalize(
        entry: &KbEntry,
        classification: Classification,
        attempts: Vec<Attempt>,
    ) -> Self {
        let total_attempts = attempts.len() as u32;
        Self {
            entry_id: entry.id().to_string(),
            question: entry.question().to_string(),
            domain: entry.domain(),
            classification,
            attempts,
            total_attempts,
        }
    }

    pub fn entry_id(&self) -> &str {
        &self.entry_id
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn total_attempts(&self) -> u32 {
        self.total_attempts
    }

    /// Response of the last attempt that produced one.
    pub fn final_response(&self) -> Option<&str> {
        self.attempts.iter().rev().find_map(|a| a.response())
    }
}

/// Aggregate counts over a set of results.
///
/// Built with [`RunStats::merge`], which is associative and commutative, so
/// per-entry stats can be combined in any order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub total: usize,
    pub correct: usize,
    pub hallucinations: usize,
    pub unverifiable: usize,
    pub total_attempts: u64,
}

impl RunStats {
    /// Stats contribution of a single result.
    pub fn from_result(result: &ValidationResult) -> Self {
        let mut stats = Self {
            total: 1,
            total_attempts: u64::from(result.total_attempts()),
            ..Self::default()
        };
        match result.classification() {
            Classification::Correct => stats.correct = 1,
            Classification::Hallucination => stats.hallucinations = 1,
            Classification::Unverifiable => stats.unverifiable = 1,
        }
        stats
    }

    pub fn merge(self, other: Self) -> Self {
        Self {
            total: self.total + other.total,
            correct: self.correct + other.correct,
            hallucinations: self.hallucinations + other.hallucinations,
            unverifiable: self.unverifiable + other.unverifiable,
            total_attempts: self.total_attempts + other.total_attempts,
        }
    }

    /// Fold a slice of results into stats.
    pub fn collect(results: &[ValidationResult]) -> Self {
        results
            .iter()
            .map(Self::from_result)
            .fold(Self::default(), Self::merge)
    }

    /// `correct / total`, or 0.0 for an empty run.
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }

    /// Attempts beyond the first, summed over all entries.
    pub fn retries(&self) -> u64 {
        self.total_attempts.saturating_sub(self.total as u64)
    }
}

/// Completed, immutable report of one validation run.
///
/// Only the run driver builds reports; `stats` is always the fold of
/// `results`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    run_id: Uuid,
    model: String,
    max_retries: u32,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    results: Vec<ValidationResult>,
    stats: RunStats,
}

impl ValidationReport {
    pub(crate) fn new(
        run_id: Uuid,
        model: impl Into<String>,
        max_retries: u32,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        results: Vec<ValidationResult>,
    ) -> Self {
        let stats = RunStats::collect(&results);
        Self {
            run_id,
            model: model.into(),
            max_retries,
            started_at,
            finished_at,
            results,
            stats,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Model identity the run was validated against.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// Per-entry results in knowledge base order.
    pub fn results(&self) -> &[ValidationResult] {
        &self.results
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }

    pub fn result_for(&self, entry_id: &str) -> Option<&ValidationResult> {
        self.results.iter().find(|r| r.entry_id() == entry_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::attempt::AttemptOutcome;
    use crate::domain::outcome::Verdict;

    fn entry(id: &str, domain: Domain) -> KbEntry {
        KbEntry::new(id.to_string(), "q".to_string(), "a".to_string(), domain)
    }

    fn result(id: &str, classification: Classification, attempts: u32) -> ValidationResult {
        let attempts = (1..=attempts)
            .map(|n| {
                Attempt::new(
                    id,
                    n,
                    "q",
                    AttemptOutcome::Responded {
                        response: format!("answer {n}"),
                        verdict: Verdict::Mismatch,
                        overlap: 0.0,
                    },
                )
            })
            .collect();
        ValidationResult::finalize(&entry(id, Domain::Factual), classification, attempts)
    }

    #[test]
    fn test_finalize_counts_attempts() {
        let r = result("1", Classification::Hallucination, 3);
        assert_eq!(r.total_attempts(), 3);
        assert_eq!(r.attempts().len(), 3);
        assert_eq!(r.final_response(), Some("answer 3"));
    }

    #[test]
    fn test_stats_merge_is_order_independent() {
        let a = RunStats::from_result(&result("1", Classification::Correct, 1));
        let b = RunStats::from_result(&result("2", Classification::Hallucination, 3));
        let c = RunStats::from_result(&result("3", Classification::Unverifiable, 1));

        let left = a.merge(b).merge(c);
        let right = c.merge(a.merge(b));
        assert_eq!(left, right);
        assert_eq!(left.total, 3);
        assert_eq!(left.correct, 1);
        assert_eq!(left.hallucinations, 1);
        assert_eq!(left.unverifiable, 1);
        assert_eq!(left.total_attempts, 5);
        assert_eq!(left.retries(), 2);
    }

    #[test]
    fn test_accuracy_is_correct_over_total() {
        let results = vec![
            result("1", Classification::Correct, 1),
            result("2", Classification::Correct, 2),
            result("3", Classification::Hallucination, 3),
            result("4", Classification::Unverifiable, 1),
        ];
        let stats = RunStats::collect(&results);
        assert!((stats.accuracy() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_report_stats_follow_results() {
        let started = Utc::now();
        let report = ValidationReport::new(
            Uuid::new_v4(),
            "gpt-4",
            2,
            started,
            started + chrono::Duration::milliseconds(1500),
            vec![
                result("1", Classification::Correct, 1),
                result("2", Classification::Hallucination, 3),
            ],
        );
        assert_eq!(report.model(), "gpt-4");
        assert_eq!(report.stats(), &RunStats::collect(report.results()));
        assert_eq!(report.stats().retries(), 2);
        assert_eq!(report.duration_ms(), 1500);
        assert!(report.result_for("2").is_some());
    }

    #[test]
    fn test_empty_run_has_zero_accuracy() {
        assert_eq!(RunStats::default().accuracy(), 0.0);
    }
}
