//! Evidence read directly from SAM/BAM alignments against the candidate alleles.
//!
//! Each `@SQ` is one allele sequence; a record aligned to it is evidence for that
//! allele. Records need a read name, base qualities and an `MD` tag.

use std::io::{self, BufReader};
use std::path::Path;

use noodles::sam::alignment::record::cigar::op::Kind;
use noodles::sam::alignment::record::data::field::Tag;
use noodles::sam::alignment::record_buf::data::field::Value;
use noodles::sam::alignment::record_buf::RecordBuf;
use tracing::{debug, info};

use crate::core::evidence::{AlignmentEvidence, CigarOp, FLAG_EXCLUDE};
use crate::parsing::evidence::EvidenceTable;
use crate::parsing::sam::{alignment_header, AlignmentHeader, ParseError};
use crate::utils::progress::ProgressTracker;

/// Evidence and header of one alignment file
#[derive(Debug, Clone)]
pub struct Alignments {
    pub header: AlignmentHeader,
    pub evidence: EvidenceTable,
}

/// Whether the path names an alignment file this module can read
#[must_use]
pub fn is_alignment_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("sam") || e.eq_ignore_ascii_case("bam"))
}

/// Read every usable alignment of a SAM or BAM file
///
/// Unmapped records, records flagged QC-fail, duplicate or supplementary, and records
/// that are not part of a proper pair are skipped.
///
/// # Errors
///
/// Returns `ParseError::UnsupportedFormat` for other extensions, `ParseError::Noodles`
/// if a record cannot be decoded, or `ParseError::InvalidFormat` if a usable record
/// lacks its name, qualities or `MD` tag.
pub fn read_alignments(path: &Path) -> Result<Alignments, ParseError> {
    use noodles::{bam, sam};

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    match extension.as_deref() {
        Some("sam") => {
            let mut reader = std::fs::File::open(path)
                .map(BufReader::new)
                .map(sam::io::Reader::new)?;
            let header = reader
                .read_header()
                .map_err(|e| ParseError::Noodles(e.to_string()))?;
            collect_evidence(&header, reader.record_bufs(&header))
        }
        Some("bam") => {
            let mut reader = std::fs::File::open(path).map(bam::io::Reader::new)?;
            let header = reader
                .read_header()
                .map_err(|e| ParseError::Noodles(e.to_string()))?;
            collect_evidence(&header, reader.record_bufs(&header))
        }
        Some(ext) => Err(ParseError::UnsupportedFormat(ext.to_string())),
        None => Err(ParseError::UnsupportedFormat(path.display().to_string())),
    }
}

fn collect_evidence(
    header: &noodles::sam::Header,
    records: impl Iterator<Item = io::Result<RecordBuf>>,
) -> Result<Alignments, ParseError> {
    let parsed_header = alignment_header(header)?;
    let mut evidence = EvidenceTable::new();
    let mut skipped = 0usize;
    let progress = ProgressTracker::new("Read alignments").with_interval(1_000_000);

    for result in records {
        let record = result.map_err(|e| ParseError::Noodles(e.to_string()))?;
        progress.log_if_needed(1);

        let flags = record.flags();
        if flags.is_unmapped() || !flags.is_properly_segmented() {
            skipped += 1;
            continue;
        }
        let flag_bits = u16::from(flags);
        if flag_bits & FLAG_EXCLUDE != 0 {
            skipped += 1;
            continue;
        }

        let Some(allele) = record
            .reference_sequence_id()
            .and_then(|id| header.reference_sequences().get_index(id))
            .map(|(name, _)| name.to_string())
        else {
            skipped += 1;
            continue;
        };

        let qname = record
            .name()
            .map(|n| n.to_string())
            .ok_or_else(|| ParseError::InvalidFormat(format!("Unnamed record on {allele}")))?;

        let invalid = |what: &str| {
            ParseError::InvalidFormat(format!("Record {qname} on {allele} has no {what}"))
        };

        let md = match record.data().get(&Tag::MISMATCHED_POSITIONS) {
            Some(Value::String(md)) => md.to_string(),
            _ => return Err(invalid("MD tag")),
        };

        let base_qualities = record.quality_scores().as_ref().to_vec();
        if base_qualities.is_empty() {
            return Err(invalid("base qualities"));
        }

        let cigar: Vec<CigarOp> = record
            .cigar()
            .as_ref()
            .iter()
            .map(|op| cigar_op(op.kind(), op.len()))
            .collect();

        let aligned =
            AlignmentEvidence::from_parts(qname, allele, flag_bits, &cigar, &md, base_qualities)
                .map_err(|e| ParseError::InvalidFormat(e.to_string()))?;
        evidence.push(aligned);
    }
    progress.log_final();

    info!(
        alignments = evidence.len(),
        alleles = evidence.alleles().len(),
        "Read alignment evidence"
    );
    debug!(skipped, "Alignments skipped before scoring");

    Ok(Alignments {
        header: parsed_header,
        evidence,
    })
}

fn cigar_op(kind: Kind, len: usize) -> CigarOp {
    let kind = match kind {
        Kind::Match => 'M',
        Kind::Insertion => 'I',
        Kind::Deletion => 'D',
        Kind::Skip => 'N',
        Kind::SoftClip => 'S',
        Kind::HardClip => 'H',
        Kind::Pad => 'P',
        Kind::SequenceMatch => '=',
        Kind::SequenceMismatch => 'X',
    };
    CigarOp::new(kind, u32::try_from(len).unwrap_or(u32::MAX))
}
