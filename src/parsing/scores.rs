//! Reading and writing score tables and typing results as TSV.
//!
//! Tables written here are the intermediate and final outputs of a typing run:
//!
//! | File                         | Columns                                                    |
//! |------------------------------|------------------------------------------------------------|
//! | `{sample}.a1.tsv`            | qname, allele, gene, score                                 |
//! | `{sample}.a2.tsv`            | qname, allele, gene, score, original_score, winner_score, factor |
//! | `{sample}.hlatyping.res.tsv` | gene, allele, total_score, copy, sample                    |
//!
//! The first-copy table can be read back so an interrupted run resumes at stage two.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::types::{AlleleCall, ReadPairScore, ReallocatedScore};
use crate::parsing::sam::ParseError;

const FIRST_COPY_HEADER: [&str; 4] = ["qname", "allele", "gene", "score"];

/// Output file locations for one sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub first_copy: PathBuf,
    pub second_copy: PathBuf,
    pub result: PathBuf,
}

impl OutputPaths {
    #[must_use]
    pub fn new(outdir: &Path, sample: &str) -> Self {
        Self {
            first_copy: outdir.join(format!("{sample}.a1.tsv")),
            second_copy: outdir.join(format!("{sample}.a2.tsv")),
            result: outdir.join(format!("{sample}.hlatyping.res.tsv")),
        }
    }

    /// Remove any previously written outputs
    ///
    /// # Errors
    ///
    /// Returns an IO error if an existing file cannot be removed.
    pub fn remove_existing(&self) -> std::io::Result<()> {
        for path in [&self.first_copy, &self.second_copy, &self.result] {
            if path.exists() {
                std::fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

/// Write stage-one scores
///
/// # Errors
///
/// Returns an IO error if the file cannot be written.
pub fn write_first_copy_scores(path: &Path, scores: &[ReadPairScore]) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "{}", FIRST_COPY_HEADER.join("\t"))?;
    for s in scores {
        writeln!(out, "{}\t{}\t{}\t{}", s.qname, s.allele, s.gene, s.score)?;
    }
    out.flush()
}

/// Read stage-one scores previously written by [`write_first_copy_scores`]
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, or
/// `ParseError::InvalidFormat` if the header or a row is malformed.
pub fn read_first_copy_scores(path: &Path) -> Result<Vec<ReadPairScore>, ParseError> {
    let content = std::fs::read_to_string(path)?;
    parse_first_copy_scores(&content)
}

/// Parse stage-one score table text
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` if the header or a row is malformed.
pub fn parse_first_copy_scores(text: &str) -> Result<Vec<ReadPairScore>, ParseError> {
    let mut lines = text.lines().map(|l| l.trim_end_matches('\r'));

    let header: Vec<&str> = lines.next().unwrap_or_default().split('\t').collect();
    let column = |name: &str| {
        header.iter().position(|h| *h == name).ok_or_else(|| {
            ParseError::InvalidFormat(format!("Score table has no '{name}' column"))
        })
    };
    let (qname, allele, gene, score) = (
        column("qname")?,
        column("allele")?,
        column("gene")?,
        column("score")?,
    );

    let mut scores = Vec::new();
    for (i, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != header.len() {
            return Err(ParseError::InvalidFormat(format!(
                "Score table row {} has {} fields, expected {}",
                i + 1,
                fields.len(),
                header.len()
            )));
        }
        let value: f64 = fields[score].parse().map_err(|_| {
            ParseError::InvalidFormat(format!(
                "Invalid score on row {}: '{}'",
                i + 1,
                fields[score]
            ))
        })?;
        scores.push(ReadPairScore::new(
            fields[qname],
            fields[allele],
            fields[gene],
            value,
        ));
    }

    Ok(scores)
}

/// Write stage-two scores
///
/// # Errors
///
/// Returns an IO error if the file cannot be written.
pub fn write_second_copy_scores(path: &Path, scores: &[ReallocatedScore]) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(
        out,
        "qname\tallele\tgene\tscore\toriginal_score\twinner_score\tfactor"
    )?;
    for s in scores {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            s.qname, s.allele, s.gene, s.score, s.original_score, s.winner_score, s.factor
        )?;
    }
    out.flush()
}

/// Write the final calls of one sample
///
/// # Errors
///
/// Returns an IO error if the file cannot be written.
pub fn write_calls(path: &Path, sample: &str, calls: &[AlleleCall]) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "gene\tallele\ttotal_score\tcopy\tsample")?;
    for c in calls {
        writeln!(
            out,
            "{}\t{}\t{:.4}\t{}\t{sample}",
            c.gene, c.allele, c.total_score, c.copy
        )?;
    }
    out.flush()
}
