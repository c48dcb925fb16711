use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::cli::OutputFormat;
use crate::matching::candidates::select_candidates;
use crate::parsing::freq::parse_freq_file;
use crate::parsing::sam;

#[derive(Args)]
pub struct CandidatesArgs {
    /// SAM/BAM/CRAM whose @SQ lines name the candidate alleles
    #[arg(required = true)]
    pub header: PathBuf,

    /// Population allele frequency table; only alleles present in it are listed
    #[arg(long, value_name = "FILE")]
    pub freq: Option<PathBuf>,
}

/// Execute candidates subcommand
///
/// # Errors
///
/// Returns an error if the header or frequency table cannot be parsed.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: CandidatesArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let header = sam::parse_file(&args.header)
        .with_context(|| format!("Failed to read header from {}", args.header.display()))?;

    let candidates = match &args.freq {
        Some(path) => {
            let table = parse_freq_file(path).with_context(|| {
                format!("Failed to read frequency table from {}", path.display())
            })?;
            select_candidates(&header.alleles, &table.alleles())?
        }
        None => header.alleles.clone(),
    };

    if verbose {
        eprintln!(
            "{} of {} header alleles are candidates",
            candidates.len(),
            header.alleles.len()
        );
    }

    match format {
        OutputFormat::Text => {
            for allele in &candidates {
                println!("{allele}");
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&candidates)?);
        }
        OutputFormat::Tsv => {
            println!("allele");
            for allele in &candidates {
                println!("{allele}");
            }
        }
    }

    Ok(())
}
