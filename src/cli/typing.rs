use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use tracing::info;

use crate::cli::OutputFormat;
use crate::core::types::AlleleCall;
use crate::matching::candidates::select_candidates;
use crate::matching::engine::{TypingConfig, TypingEngine, DEFAULT_MIN_ECNT, DEFAULT_THREADS};
use crate::parsing::alignments::{is_alignment_file, read_alignments};
use crate::parsing::evidence::{parse_evidence_file, EvidenceTable};
use crate::parsing::freq::parse_freq_file;
use crate::parsing::sam::{self, AlignmentHeader};
use crate::parsing::scores::{
    read_first_copy_scores, write_calls, write_first_copy_scores, write_second_copy_scores,
    OutputPaths,
};
use crate::utils::validation::validate_sample_name;

#[derive(Args)]
pub struct TypeArgs {
    /// Reads aligned to every candidate allele: a SAM/BAM file with MD tags, or an
    /// evidence table (TSV: qname, flag, allele, cigar, md, qual; may be gzipped)
    #[arg(short, long, value_name = "FILE")]
    pub evidence: PathBuf,

    /// SAM/BAM/CRAM whose header lists the candidate alleles (@SQ) and the sample (@RG SM).
    /// Defaults to the evidence file's own header when that is SAM/BAM. Without any header
    /// every allele present in the evidence is a candidate
    #[arg(long, value_name = "FILE")]
    pub header: Option<PathBuf>,

    /// Population allele frequency table; candidates absent from it are not scored
    #[arg(long, value_name = "FILE")]
    pub freq: Option<PathBuf>,

    /// Directory for score tables and results
    #[arg(short, long, value_name = "DIR")]
    pub outdir: PathBuf,

    /// Sample name for output files. Required unless the header's read groups name
    /// exactly one sample (@RG SM)
    #[arg(short, long)]
    pub sample: Option<String>,

    /// Maximum mismatch events allowed in a scored alignment
    #[arg(long, default_value_t = DEFAULT_MIN_ECNT)]
    pub min_ecnt: u32,

    /// Number of scoring threads
    #[arg(short, long, default_value_t = DEFAULT_THREADS)]
    pub threads: usize,

    /// Recompute all scores, replacing previous outputs
    #[arg(long)]
    pub overwrite: bool,

    /// Debug mode: debug logging and a single scoring thread
    #[arg(long)]
    pub debug: bool,
}

/// Execute type subcommand
///
/// # Errors
///
/// Returns an error if an input cannot be parsed, typing fails, or outputs cannot be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: TypeArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    info!("Start HLA typing from evidence: {}", args.evidence.display());

    let (evidence, evidence_header) = load_evidence(&args.evidence)
        .with_context(|| format!("Failed to read evidence from {}", args.evidence.display()))?;

    let header = match args.header.as_deref() {
        Some(path) => Some(
            sam::parse_file(path)
                .with_context(|| format!("Failed to read header from {}", path.display()))?,
        ),
        None => evidence_header,
    };

    let candidates = collect_candidates(&evidence, header.as_ref(), args.freq.as_deref())?;
    let sample = resolve_sample(args.sample.as_deref(), header.as_ref())?;

    if verbose {
        eprintln!(
            "Loaded {} alignments; typing {} candidate alleles for sample {sample}",
            evidence.len(),
            candidates.len(),
        );
    }

    std::fs::create_dir_all(&args.outdir)
        .with_context(|| format!("Failed to create {}", args.outdir.display()))?;
    let paths = OutputPaths::new(&args.outdir, &sample);

    if args.overwrite {
        info!("Overwrite specified. Removing previously computed results");
        paths.remove_existing()?;
    }

    let config = TypingConfig {
        min_ecnt: args.min_ecnt,
        threads: if args.debug { 1 } else { args.threads },
    };
    let engine = TypingEngine::with_config(&evidence, config);

    let first_scores = if paths.first_copy.exists() {
        info!(
            "Found first allele scores previously computed: {}",
            paths.first_copy.display()
        );
        read_first_copy_scores(&paths.first_copy)
            .with_context(|| format!("Failed to read {}", paths.first_copy.display()))?
    } else {
        let scores = engine.score_first_copy(&candidates)?;
        write_first_copy_scores(&paths.first_copy, &scores)
            .with_context(|| format!("Failed to write {}", paths.first_copy.display()))?;
        scores
    };

    let result = engine.resolve(first_scores)?;
    write_second_copy_scores(&paths.second_copy, &result.second_scores)
        .with_context(|| format!("Failed to write {}", paths.second_copy.display()))?;

    let calls = result.calls();
    write_calls(&paths.result, &sample, &calls)
        .with_context(|| format!("Failed to write {}", paths.result.display()))?;
    info!("Wrote typing result to {}", paths.result.display());

    match format {
        OutputFormat::Text => print_text_results(&sample, &calls),
        OutputFormat::Json => print_json_results(&sample, &calls)?,
        OutputFormat::Tsv => print_tsv_results(&sample, &calls),
    }

    Ok(())
}

/// Evidence from an alignment file (with its header) or from an evidence table
fn load_evidence(
    path: &Path,
) -> Result<(EvidenceTable, Option<AlignmentHeader>), sam::ParseError> {
    if is_alignment_file(path) {
        let alignments = read_alignments(path)?;
        Ok((alignments.evidence, Some(alignments.header)))
    } else {
        Ok((parse_evidence_file(path)?, None))
    }
}

/// Candidates from the header when given, else every allele with evidence, restricted
/// to the population table when given
fn collect_candidates(
    evidence: &EvidenceTable,
    header: Option<&AlignmentHeader>,
    freq: Option<&Path>,
) -> anyhow::Result<Vec<String>> {
    let alleles = match header {
        Some(h) => h.alleles.clone(),
        None => evidence.alleles(),
    };

    match freq {
        Some(path) => {
            let table = parse_freq_file(path).with_context(|| {
                format!("Failed to read frequency table from {}", path.display())
            })?;
            Ok(select_candidates(&alleles, &table.alleles())?)
        }
        None => Ok(alleles),
    }
}

/// Sample name from `--sample`, else the header's single `@RG SM`
///
/// Output files are named after the sample, so a name is always required.
///
/// # Errors
///
/// Returns an error if read groups name no sample or more than one, or the name is
/// unusable in a file name.
pub fn resolve_sample(
    sample: Option<&str>,
    header: Option<&AlignmentHeader>,
) -> anyhow::Result<String> {
    let name = if let Some(name) = sample {
        name.to_string()
    } else {
        let mut samples: Vec<&str> = header
            .map(|h| h.samples.iter().map(String::as_str).collect())
            .unwrap_or_default();
        samples.sort_unstable();
        samples.dedup();

        match samples.as_slice() {
            [] => anyhow::bail!("No sample name found in read groups (@RG SM). Use --sample"),
            [one] => (*one).to_string(),
            many => anyhow::bail!(
                "Found more than one sample in read groups: {}. Use --sample to choose",
                many.join(", ")
            ),
        }
    };

    Ok(validate_sample_name(&name)?)
}

fn print_text_results(sample: &str, calls: &[AlleleCall]) {
    println!("Sample: {sample}");
    println!();
    println!("{:<10} {:<4} {:<24} {:>14}", "Gene", "Copy", "Allele", "Total score");
    for c in calls {
        println!(
            "{:<10} {:<4} {:<24} {:>14.4}",
            c.gene, c.copy, c.allele, c.total_score
        );
    }
}

fn print_json_results(sample: &str, calls: &[AlleleCall]) -> anyhow::Result<()> {
    let output = serde_json::json!({
        "sample": sample,
        "calls": calls,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv_results(sample: &str, calls: &[AlleleCall]) {
    println!("sample\tgene\tallele\tcopy\ttotal_score");
    for c in calls {
        println!(
            "{sample}\t{}\t{}\t{}\t{:.4}",
            c.gene, c.allele, c.copy, c.total_score
        );
    }
}
