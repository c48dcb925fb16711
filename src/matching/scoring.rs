use std::collections::HashMap;
use std::sync::OnceLock;

use thiserror::Error;

use crate::core::evidence::{AlignmentEvidence, MdToken};
use crate::core::types::ReadPairScore;

/// Exponent of the constant every per-base likelihood is multiplied by before taking the
/// log. Each scored base therefore adds 23 to the log score, so totals grow with the number
/// of scored bases.
pub const SCALE_EXPONENT: f64 = 23.0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "Read {qname} against {allele}: MD tag covers {needed} bases but only {available} base qualities are present"
)]
pub struct ScoreError {
    pub qname: String,
    pub allele: String,
    pub needed: usize,
    pub available: usize,
}

/// Per-quality log likelihoods, indexed by Phred score
struct QualityTable {
    matched: [f64; 256],
    mismatched: [f64; 256],
}

fn quality_table() -> &'static QualityTable {
    static TABLE: OnceLock<QualityTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = QualityTable {
            matched: [0.0; 256],
            mismatched: [0.0; 256],
        };
        for q in 0..=u8::MAX {
            table.matched[q as usize] = ln_match_likelihood(q);
            table.mismatched[q as usize] = ln_mismatch_likelihood(q);
        }
        table
    })
}

/// Phred score to error probability: `10^(-Q/10)`
#[inline]
fn error_prob(phred: u8) -> f64 {
    10f64.powf(-f64::from(phred) / 10.0)
}

/// `ln((1 - 10^(-Q/10)) * e^23)`: a read base agreeing with the allele
#[must_use]
pub fn ln_match_likelihood(phred: u8) -> f64 {
    ((1.0 - error_prob(phred)) * SCALE_EXPONENT.exp()).ln()
}

/// `ln((10^(-Q/10) / 3) * e^23)`: a read base disagreeing with the allele, the error
/// spread evenly over the three other bases
#[must_use]
pub fn ln_mismatch_likelihood(phred: u8) -> f64 {
    ((error_prob(phred) / 3.0) * SCALE_EXPONENT.exp()).ln()
}

/// Log likelihood of a single alignment.
///
/// Walks the MD tokens left to right with a cursor into the base qualities: match runs
/// and mismatches consume one quality per base, deletions consume none.
///
/// # Errors
///
/// Returns `ScoreError` if the MD tag covers more bases than there are qualities.
pub fn score_alignment(record: &AlignmentEvidence) -> Result<f64, ScoreError> {
    let table = quality_table();
    let quals = &record.base_qualities;
    let mut cursor = 0;
    let mut score = 0.0;

    for token in &record.md_tokens {
        let lookup = match token {
            MdToken::Deletion(_) => continue,
            MdToken::Match(_) => &table.matched,
            MdToken::Mismatch(_) => &table.mismatched,
        };

        let end = cursor + token.read_len();
        let block = quals.get(cursor..end).ok_or_else(|| ScoreError {
            qname: record.qname.clone(),
            allele: record.allele.clone(),
            needed: end,
            available: quals.len(),
        })?;

        score += block.iter().map(|&q| lookup[q as usize]).sum::<f64>();
        cursor = end;
    }

    Ok(score)
}

/// Score filtered alignments and sum both mates into one row per read pair.
///
/// Rows are returned ordered by read name.
///
/// # Errors
///
/// Returns the first `ScoreError` hit by any alignment.
pub fn score_read_pairs(
    records: &[AlignmentEvidence],
    allele: &str,
    gene: &str,
) -> Result<Vec<ReadPairScore>, ScoreError> {
    let mut per_pair: HashMap<&str, f64> = HashMap::new();
    for record in records {
        let score = score_alignment(record)?;
        *per_pair.entry(record.qname.as_str()).or_insert(0.0) += score;
    }

    let mut scores: Vec<ReadPairScore> = per_pair
        .into_iter()
        .map(|(qname, score)| ReadPairScore::new(qname, allele, gene, score))
        .collect();
    scores.sort_by(|a, b| a.qname.cmp(&b.qname));

    Ok(scores)
}
