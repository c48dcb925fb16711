//! Readers and writers for the files around a typing run.
//!
//! This module provides parsers for:
//!
//! - **Alignment files**: SAM/BAM records against the allele sequences, read as evidence
//! - **Evidence tables**: Pre-extracted alignments (`qname flag allele cigar md qual`)
//! - **SAM/BAM/CRAM files**: Candidate alleles from `@SQ` lines and the sample from `@RG`
//! - **Population frequency tables**: Alleles observed in at least one population
//! - **Score tables**: Stage one and stage two scores and the final calls
//!
//! ## Example
//!
//! ```rust,no_run
//! use mhc_typer::parsing::evidence::parse_evidence_file;
//! use mhc_typer::parsing::sam::parse_file;
//! use std::path::Path;
//!
//! let header = parse_file(Path::new("sample.bam")).unwrap();
//! let evidence = parse_evidence_file(Path::new("sample.evidence.tsv.gz")).unwrap();
//! println!("{} candidates, {} alignments", header.alleles.len(), evidence.len());
//! ```

pub mod alignments;
pub mod evidence;
pub mod freq;
pub mod sam;
pub mod scores;
