//! Final classification rules.
//!
//! | domain      | verdict               | classification |
//! |-------------|-----------------------|----------------|
//! | `edge_case` | any                   | Unverifiable   |
//! | `factual`   | Match                 | Correct        |
//! | `factual`   | Mismatch or Ambiguous | Hallucination  |
//!
//! A failed model call (no verdict) on a factual entry cannot confirm
//! correctness and is classified as a hallucination.

use crate::domain::{Classification, Domain, KbEntry, Verdict};

/// Classify one verdict for an entry.
pub fn classify(entry: &KbEntry, verdict: Verdict) -> Classification {
    classify_outcome(entry, Some(verdict))
}

/// Classify an attempt that may not have produced a verdict.
pub fn classify_outcome(entry: &KbEntry, verdict: Option<Verdict>) -> Classification {
    match (entry.domain(), verdict) {
        (Domain::EdgeCase, _) => Classification::Unverifiable,
        (Domain::Factual, Some(Verdict::Match)) => Classification::Correct,
        (Domain::Factual, Some(Verdict::Mismatch | Verdict::Ambiguous) | None) => {
            Classification::Hallucination
        }
    }
}
