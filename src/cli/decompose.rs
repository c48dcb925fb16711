use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use tracing::warn;

use crate::cli::OutputFormat;
use crate::core::allele::{decompose, reduce_resolution, AllelePattern, PatternConfig};

#[derive(Args)]
pub struct DecomposeArgs {
    /// Allele identifiers, e.g. HLA-A*02:01:01:03 or hla_b_07_02_01
    #[arg(required = true)]
    pub alleles: Vec<String>,

    /// JSON allele grammar (prefix, locus, sep, digit_field_sep, expr_suffix, resolution);
    /// keys left out keep their default
    #[arg(long, value_name = "FILE")]
    pub pattern_config: Option<PathBuf>,

    /// Number of digit fields to keep (clamped to 1-4) [default: 4]
    #[arg(short, long)]
    pub resolution: Option<i32>,

    /// Characters accepted between digit fields [default: :,_]
    #[arg(long, value_delimiter = ',')]
    pub digit_field_sep: Option<Vec<char>>,
}

#[derive(Debug, Serialize)]
struct Decomposed {
    input: String,
    reduced: String,
    gene: String,
    prefix: String,
    locus: String,
    sep: String,
    digit_fields: String,
}

/// Grammar from `--pattern-config`, then overridden by the explicit flags
fn pattern_config(args: &DecomposeArgs) -> anyhow::Result<PatternConfig> {
    let mut config = match &args.pattern_config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            PatternConfig::from_json(&text)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        }
        None => PatternConfig::default(),
    };

    if let Some(resolution) = args.resolution {
        config = config.with_resolution(resolution);
    }
    if let Some(seps) = &args.digit_field_sep {
        config = config.with_digit_field_sep(seps);
    }
    Ok(config)
}

/// Execute decompose subcommand
///
/// # Errors
///
/// Returns an error if the grammar cannot be built or an identifier does not follow it.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: DecomposeArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let pattern = AllelePattern::build(&pattern_config(&args)?)?;

    if verbose {
        eprintln!(
            "Resolution {}: digit fields match {}",
            pattern.resolution(),
            pattern.digit_fields()
        );
    }

    let mut rows = Vec::with_capacity(args.alleles.len());
    for input in &args.alleles {
        let reduction = reduce_resolution(input, &pattern)?;
        if !reduction.truncated {
            warn!(
                "{input} is already at or below resolution {}",
                pattern.resolution()
            );
        }

        let allele = decompose(&reduction.allele, &pattern)
            .with_context(|| format!("Failed to decompose {input}"))?;

        rows.push(Decomposed {
            input: input.clone(),
            reduced: reduction.allele,
            gene: allele.gene(),
            prefix: allele.prefix,
            locus: allele.locus,
            sep: allele.sep,
            digit_fields: allele.digit_fields,
        });
    }

    match format {
        OutputFormat::Text => {
            for r in &rows {
                println!(
                    "{} -> {} (gene {}, locus {}, fields {})",
                    r.input, r.reduced, r.gene, r.locus, r.digit_fields
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Tsv => {
            println!("input\treduced\tgene\tprefix\tlocus\tsep\tdigit_fields");
            for r in &rows {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    r.input, r.reduced, r.gene, r.prefix, r.locus, r.sep, r.digit_fields
                );
            }
        }
    }

    Ok(())
}
