//! Core data types for HLA allele typing.
//!
//! This module provides the fundamental types used throughout the library:
//!
//! - [`AllelePattern`], [`Allele`]: The allele identifier grammar and its decomposition
//! - [`AlignmentEvidence`], [`MdToken`]: Per-alignment evidence consumed by scoring
//! - [`ReadPairScore`], [`ReallocatedScore`], [`GeneTotal`], [`Winner`]: Score tables
//!
//! ## Allele Naming
//!
//! Identifiers follow `{prefix}{locus}{sep}{digit_fields}`:
//!
//! | Identifier              | Prefix | Locus | Sep | Digit fields |
//! |-------------------------|--------|-------|-----|--------------|
//! | `A*01:01:01`            |        | A     | *   | 01:01:01     |
//! | `HLA-B*04:16N`          | HLA-   | B     | *   | 04:16N       |
//! | `hla_drb1_11_01_01_01`  | hla_   | drb1  | _   | 11_01_01_01  |
//!
//! The gene an allele competes in is its prefix followed by its locus.
//!
//! [`AllelePattern`]: allele::AllelePattern
//! [`Allele`]: allele::Allele
//! [`AlignmentEvidence`]: evidence::AlignmentEvidence
//! [`MdToken`]: evidence::MdToken
//! [`ReadPairScore`]: types::ReadPairScore
//! [`ReallocatedScore`]: types::ReallocatedScore
//! [`GeneTotal`]: types::GeneTotal
//! [`Winner`]: types::Winner

pub mod allele;
pub mod evidence;
pub mod types;
