//! Parser for pre-extracted alignment evidence tables.
//!
//! The table holds one alignment per line with the SAM fields scoring needs:
//!
//! ```text
//! qname   flag  allele       cigar  md    qual
//! read1   99    A*01:01:01   100M   100   IIIII...
//! ```
//!
//! `qual` is Phred+33 encoded as in SAM. Files ending in `.gz` are decompressed.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use tracing::debug;

use crate::core::evidence::{AlignmentEvidence, EvidenceError, FLAG_EXCLUDE};
use crate::matching::engine::EvidenceSource;
use crate::parsing::sam::ParseError;

const COLUMNS: usize = 6;

/// Offset of Phred+33 quality encoding
const PHRED_OFFSET: u8 = 33;

/// Alignment evidence grouped by the allele it aligned to
#[derive(Debug, Clone, Default)]
pub struct EvidenceTable {
    by_allele: HashMap<String, Vec<AlignmentEvidence>>,
}

impl EvidenceTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: AlignmentEvidence) {
        self.by_allele
            .entry(record.allele.clone())
            .or_default()
            .push(record);
    }

    /// Alleles with at least one alignment, sorted
    #[must_use]
    pub fn alleles(&self) -> Vec<String> {
        let mut alleles: Vec<String> = self.by_allele.keys().cloned().collect();
        alleles.sort();
        alleles
    }

    /// Total number of alignments
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_allele.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_allele.is_empty()
    }
}

impl EvidenceSource for EvidenceTable {
    fn fetch(&self, allele: &str) -> Result<Vec<AlignmentEvidence>, EvidenceError> {
        Ok(self.by_allele.get(allele).cloned().unwrap_or_default())
    }
}

/// Parse an evidence table, decompressing `.gz` files
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, or other parse errors
/// if the content is invalid.
pub fn parse_evidence_file(path: &Path) -> Result<EvidenceTable, ParseError> {
    let is_gzipped = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gz"));

    let content = if is_gzipped {
        let mut content = String::new();
        GzDecoder::new(std::fs::File::open(path)?).read_to_string(&mut content)?;
        content
    } else {
        std::fs::read_to_string(path)?
    };

    parse_evidence_text(&content)
}

/// Parse evidence table text
///
/// Blank lines and `#` comments are skipped, as is a leading `qname` header line.
/// Alignments flagged QC-fail, duplicate or supplementary are dropped.
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` if a line has the wrong number of fields or a
/// field cannot be parsed.
pub fn parse_evidence_text(text: &str) -> Result<EvidenceTable, ParseError> {
    let mut table = EvidenceTable::new();
    let mut excluded = 0usize;
    let mut first_data_line = true;

    for (i, line) in text.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();

        if first_data_line {
            first_data_line = false;
            if fields[0].eq_ignore_ascii_case("qname") {
                continue;
            }
        }

        // Line numbers in errors are 1-based for user friendliness
        let line_num = i + 1;

        if fields.len() != COLUMNS {
            return Err(ParseError::InvalidFormat(format!(
                "Line {line_num} has {} fields, expected {COLUMNS}",
                fields.len()
            )));
        }

        let flags: u16 = fields[1].parse().map_err(|_| {
            ParseError::InvalidFormat(format!(
                "Invalid flag on line {line_num}: '{}'",
                fields[1]
            ))
        })?;

        if flags & FLAG_EXCLUDE != 0 {
            excluded += 1;
            continue;
        }

        let base_qualities = decode_qualities(fields[5]).ok_or_else(|| {
            ParseError::InvalidFormat(format!("Invalid base qualities on line {line_num}"))
        })?;

        let record = AlignmentEvidence::from_fields(
            fields[0],
            fields[2],
            flags,
            fields[3],
            fields[4],
            base_qualities,
        )
        .map_err(|e| ParseError::InvalidFormat(format!("Line {line_num}: {e}")))?;

        table.push(record);
    }

    debug!(
        alignments = table.len(),
        alleles = table.by_allele.len(),
        excluded,
        "Parsed evidence table"
    );
    Ok(table)
}

/// Decode Phred+33 qualities. `*` (missing) and characters below `!` are invalid.
fn decode_qualities(qual: &str) -> Option<Vec<u8>> {
    if qual == "*" {
        return None;
    }
    qual.bytes()
        .map(|b| b.checked_sub(PHRED_OFFSET))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_evidence_text() {
        let text = "qname\tflag\tallele\tcigar\tmd\tqual
r1\t99\tA*01:01:01\t5M\t5\tIIIII
r1\t147\tA*01:01:01\t5M\t2A2\tIII5I
r2\t99\tA*02:01:01\t3M1D2M\t3^T2\t?????
";
        let table = parse_evidence_text(text).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.alleles(), vec!["A*01:01:01", "A*02:01:01"]);

        let records = table.fetch("A*01:01:01").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].base_qualities, vec![40; 5]);
        assert_eq!(records[1].mismatch_events, 1);
        assert!(records[1].is_proper_pair);

        let records = table.fetch("A*02:01:01").unwrap();
        assert_eq!(records[0].indel_events, 1);
        assert_eq!(records[0].base_qualities, vec![30; 5]);

        assert!(table.fetch("B*07:02").unwrap().is_empty());
    }

    #[test]
    fn test_soft_clipped_qualities_not_scored() {
        use crate::matching::scoring::{ln_match_likelihood, score_alignment};

        // The two clipped bases have quality 2; the aligned four have quality 40
        let table = parse_evidence_text("r1\t99\tA*01:01\t2S4M\t4\t##IIII\n").unwrap();
        let records = table.fetch("A*01:01").unwrap();
        assert_eq!(records[0].base_qualities, vec![40; 4]);

        let score = score_alignment(&records[0]).unwrap();
        assert!((score - 4.0 * ln_match_likelihood(40)).abs() < 1e-9);
    }

    #[test]
    fn test_excluded_flags_dropped() {
        // 1123 = duplicate, 611 = QC fail, 2147 = supplementary
        let text = "r1\t1123\tA*01:01\t2M\t2\tII
r1\t611\tA*01:01\t2M\t2\tII
r1\t2147\tA*01:01\t2M\t2\tII
r1\t355\tA*01:01\t2M\t2\tII
";
        let table = parse_evidence_text(text).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_invalid_lines() {
        assert!(parse_evidence_text("r1\t99\tA*01:01\t2M\t2\n").is_err());
        assert!(parse_evidence_text("r1\tx\tA*01:01\t2M\t2\tII\n").is_err());
        assert!(parse_evidence_text("r1\t99\tA*01:01\t2M\t2\t*\n").is_err());
        assert!(parse_evidence_text("r1\t99\tA*01:01\t2M\t2^\tII\n").is_err());
    }

    #[test]
    fn test_parse_gzipped_file() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evidence.tsv.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(b"r1\t99\tA*01:01\t2M\t2\tII\nr1\t147\tA*01:01\t2M\t2\tII\n")
            .unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let table = parse_evidence_file(&path).unwrap();
        assert_eq!(table.len(), 2);
    }
}
