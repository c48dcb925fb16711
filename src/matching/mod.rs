//! Evidence scoring and two-stage allele resolution.
//!
//! This module provides the typing machinery:
//!
//! - [`candidates`]: Restriction of candidate alleles to a population reference list
//! - [`filter`]: Acceptance rules for alignments (proper pairs, no indels, bounded mismatches)
//! - [`scoring`]: Per-alignment log likelihood from base qualities and MD tokens
//! - [`engine`]: Parallel scoring of candidates (stage one) and genes (stage two)
//! - [`resolver`]: Per-gene totals and winner selection
//! - [`reallocation`]: Re-weighting of read pairs against the first-copy winner
//!
//! ## Typing Algorithm
//!
//! 1. **Stage one**: Every candidate allele is scored against its own alignments. Each read
//!    pair contributes the summed log likelihood of both mates.
//! 2. **First copy**: Per gene, the allele with the highest total wins.
//! 3. **Stage two**: Every candidate's read-pair score `s` is scaled by `s / (s + w)`, where
//!    `w` is the first winner's score for the same read pair (0 if it has none).
//! 4. **Second copy**: Per gene, the allele with the highest reallocated total wins. This can
//!    be the first winner again (a homozygous call).
//!
//! Ties are broken by choosing the lexicographically smallest allele.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use mhc_typer::{AlignmentEvidence, TypingConfig, TypingEngine};
//!
//! let evidence: HashMap<String, Vec<AlignmentEvidence>> = HashMap::new();
//! let candidates = vec!["A*01:01:01".to_string(), "A*02:01:01".to_string()];
//!
//! let engine = TypingEngine::with_config(&evidence, TypingConfig::default());
//! let result = engine.run(&candidates).unwrap();
//!
//! for call in result.calls() {
//!     println!("{} {} ({:.4})", call.gene, call.allele, call.total_score);
//! }
//! ```

pub mod candidates;
pub mod engine;
pub mod filter;
pub mod reallocation;
pub mod resolver;
pub mod scoring;
