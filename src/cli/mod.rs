//! Command-line interface for mhc-typer.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **type**: Call two alleles per gene from alignment evidence
//! - **candidates**: List the candidate alleles a typing run would score
//! - **decompose**: Split allele identifiers into their fields
//!
//! ## Usage
//!
//! ```text
//! # Type a sample, taking candidates and the sample name from the BAM header
//! mhc-typer type --evidence sample.evidence.tsv.gz --header sample.bam \
//!     --freq allele_freq.tsv --outdir results/
//!
//! # JSON output for scripting
//! mhc-typer --format json type --evidence sample.evidence.tsv --outdir results/
//!
//! # Reduce identifiers to two fields
//! mhc-typer decompose --resolution 2 HLA-A*02:01:01:03 hla_b_07_02_01
//! ```

use clap::{Parser, Subcommand};

pub mod candidates;
pub mod decompose;
pub mod typing;

#[derive(Parser)]
#[command(name = "mhc-typer")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "Two-stage HLA allele typing from alignment evidence")]
#[command(
    long_about = "mhc-typer calls two alleles per HLA gene from reads aligned against every candidate allele.\n\nEach read pair is scored by its base-quality likelihood against each candidate. The best allele per gene is the first copy; read pairs are then re-weighted against it and the best allele again is the second copy, which may repeat the first (homozygous)."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Type both allele copies of every gene
    Type(typing::TypeArgs),

    /// List candidate alleles from a header, optionally restricted to a population table
    Candidates(candidates::CandidatesArgs),

    /// Decompose allele identifiers and reduce them to a resolution
    Decompose(decompose::DecomposeArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}
