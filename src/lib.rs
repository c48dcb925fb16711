//! # mhc-typer
//!
//! A library for calling HLA alleles from reads aligned against every candidate allele.
//!
//! Each candidate allele carries the alignments of the read pairs that mapped to it. A read
//! pair's evidence for an allele is the likelihood of its bases under that allele, computed
//! from base qualities and the MD tag. Typing is diploid and runs in two stages:
//!
//! 1. Every candidate is scored and the best allele per gene is the **first copy**.
//! 2. Read pairs are re-weighted against the first copy and the best allele per gene is
//!    the **second copy**. Calling the same allele twice is a homozygous result.
//!
//! ## Features
//!
//! - **Allele grammar**: Configurable identifier pattern (`HLA-A*02:01:01:03`, `hla_a_02_01`)
//!   with decomposition and resolution reduction
//! - **Evidence filtering**: Proper pairs only, no indels, bounded mismatches, both mates
//! - **Parallel scoring**: Bounded rayon pools over candidates and genes
//! - **Deterministic calls**: Ties resolved by the lexicographically smallest allele
//!
//! ## Example
//!
//! ```rust,no_run
//! use mhc_typer::{TypingConfig, TypingEngine};
//! use mhc_typer::parsing::evidence::parse_evidence_file;
//! use std::path::Path;
//!
//! let evidence = parse_evidence_file(Path::new("sample.evidence.tsv")).unwrap();
//! let candidates = evidence.alleles();
//!
//! let engine = TypingEngine::with_config(&evidence, TypingConfig::default());
//! let result = engine.run(&candidates).unwrap();
//!
//! for call in result.calls() {
//!     println!("{} copy {}: {} ({:.4})", call.gene, call.copy, call.allele, call.total_score);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Allele grammar, alignment evidence and score types
//! - [`matching`]: Filtering, scoring, winner resolution and reallocation
//! - [`parsing`]: Readers for alignments, evidence tables, headers, frequency tables and score tables
//! - [`cli`]: Command-line interface implementation
//! - [`utils`]: Input validation and progress logging

pub mod cli;
pub mod core;
pub mod matching;
pub mod parsing;
pub mod utils;

// Re-export commonly used types for convenience
pub use core::allele::{
    decompose, reduce_resolution, Allele, AlleleError, AllelePattern, PatternConfig, Reduction,
};
pub use core::evidence::{AlignmentEvidence, CigarOp, EvidenceError, MdToken};
pub use core::types::*;
pub use matching::engine::{
    score_first_copy, score_second_copy, EngineError, EvidenceSource, TypingConfig,
    TypingEngine, TypingResult,
};
pub use matching::resolver::resolve_winners;
pub use matching::scoring::ScoreError;
