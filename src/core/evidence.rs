//! Per-alignment evidence consumed by the scoring engine.
//!
//! Records are read from an alignment file or an evidence table; this module only defines
//! their shape plus the small CIGAR/MD helpers needed to derive edit counts from raw fields.

use thiserror::Error;

/// SAM flag: each segment properly aligned according to the aligner
pub const FLAG_PROPER_PAIR: u16 = 0x2;

/// SAM flags for QC failure, PCR/optical duplicate and supplementary alignment.
/// Records carrying any of them never reach scoring.
pub const FLAG_EXCLUDE: u16 = 0x200 | 0x400 | 0x800;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvidenceError {
    #[error("Invalid MD tag '{0}'")]
    InvalidMd(String),

    #[error("Invalid CIGAR '{0}'")]
    InvalidCigar(String),

    #[error("CIGAR soft clips {clipped} bases but the read has only {qualities} base qualities")]
    ClippedQualities { clipped: usize, qualities: usize },

    #[error("Evidence source failed for allele {allele}: {message}")]
    Source { allele: String, message: String },
}

/// One element of an MD tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MdToken {
    /// Run of bases matching the reference
    Match(u32),
    /// Reference bases at mismatched positions, one read base each
    Mismatch(String),
    /// Reference bases deleted from the read (`^` prefix), no read bases
    Deletion(String),
}

impl MdToken {
    /// Number of read bases (and base qualities) this token covers
    #[must_use]
    pub fn read_len(&self) -> usize {
        match self {
            Self::Match(n) => *n as usize,
            Self::Mismatch(bases) => bases.len(),
            Self::Deletion(_) => 0,
        }
    }
}

/// Evidence for one alignment of one mate against one candidate allele
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentEvidence {
    /// Read (pair) name shared by both mates
    pub qname: String,
    /// Candidate allele the read aligned to
    pub allele: String,
    /// Phred base qualities of the aligned read bases
    pub base_qualities: Vec<u8>,
    pub md_tokens: Vec<MdToken>,
    pub is_proper_pair: bool,
    /// Number of insertion and deletion operations in the CIGAR
    pub indel_events: u32,
    /// Number of mismatch runs in the MD tag
    pub mismatch_events: u32,
}

impl AlignmentEvidence {
    /// Build evidence from raw SAM-like fields, deriving the edit counts.
    ///
    /// `base_qualities` is the whole read's quality string as stored in SAM; the qualities
    /// of soft-clipped bases are dropped so the remainder lines up with the MD tag.
    ///
    /// # Errors
    ///
    /// Returns `EvidenceError` if the CIGAR or MD strings are malformed, or the clips are
    /// longer than the read.
    pub fn from_fields(
        qname: impl Into<String>,
        allele: impl Into<String>,
        flags: u16,
        cigar: &str,
        md: &str,
        base_qualities: Vec<u8>,
    ) -> Result<Self, EvidenceError> {
        let ops = parse_cigar(cigar)?;
        Self::from_parts(qname, allele, flags, &ops, md, base_qualities)
    }

    /// Build evidence from an already parsed CIGAR.
    ///
    /// # Errors
    ///
    /// Returns `EvidenceError` if the MD tag is malformed or the clips are longer than
    /// the read.
    pub fn from_parts(
        qname: impl Into<String>,
        allele: impl Into<String>,
        flags: u16,
        cigar: &[CigarOp],
        md: &str,
        mut base_qualities: Vec<u8>,
    ) -> Result<Self, EvidenceError> {
        let md_tokens = tokenize_md(md)?;
        let mismatch_events = count_mismatch_events(&md_tokens);
        let indel_events = count_indel_ops(cigar);

        let (leading, trailing) = soft_clips(cigar);
        let clipped = leading + trailing;
        if clipped > base_qualities.len() {
            return Err(EvidenceError::ClippedQualities {
                clipped,
                qualities: base_qualities.len(),
            });
        }
        base_qualities.truncate(base_qualities.len() - trailing);
        base_qualities.drain(..leading);

        Ok(Self {
            qname: qname.into(),
            allele: allele.into(),
            base_qualities,
            md_tokens,
            is_proper_pair: flags & FLAG_PROPER_PAIR != 0,
            indel_events,
            mismatch_events,
        })
    }
}

/// One CIGAR operation: its SAM letter and length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    pub kind: char,
    pub len: u32,
}

impl CigarOp {
    #[must_use]
    pub fn new(kind: char, len: u32) -> Self {
        Self { kind, len }
    }
}

/// Parse a CIGAR string. An unavailable CIGAR (`*`) has no operations.
///
/// # Errors
///
/// Returns `EvidenceError::InvalidCigar` if an operation lacks its length, uses an
/// unknown letter, or the string ends with a dangling length.
pub fn parse_cigar(cigar: &str) -> Result<Vec<CigarOp>, EvidenceError> {
    let invalid = || EvidenceError::InvalidCigar(cigar.to_string());

    if cigar == "*" {
        return Ok(Vec::new());
    }

    let mut ops = Vec::new();
    let mut start = 0;

    for (i, c) in cigar.char_indices() {
        if c.is_ascii_digit() {
            continue;
        }
        if i == start || !"MIDNSHP=X".contains(c) {
            return Err(invalid());
        }
        let len: u32 = cigar[start..i].parse().map_err(|_| invalid())?;
        ops.push(CigarOp::new(c, len));
        start = i + 1;
    }

    if start != cigar.len() {
        return Err(invalid());
    }

    Ok(ops)
}

/// Number of `I` and `D` operations
#[must_use]
pub fn count_indel_ops(ops: &[CigarOp]) -> u32 {
    let n = ops.iter().filter(|op| matches!(op.kind, 'I' | 'D')).count();
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Soft-clipped read bases at the start and end of the alignment, looking past hard clips
#[must_use]
pub fn soft_clips(ops: &[CigarOp]) -> (usize, usize) {
    let leading = soft_clipped(ops.iter());
    if ops.iter().all(|op| matches!(op.kind, 'S' | 'H')) {
        return (leading, 0);
    }
    (leading, soft_clipped(ops.iter().rev()))
}

fn soft_clipped<'a>(ops: impl Iterator<Item = &'a CigarOp>) -> usize {
    ops.skip_while(|op| op.kind == 'H')
        .take_while(|op| op.kind == 'S')
        .map(|op| op.len as usize)
        .sum()
}

/// Split an MD tag into match runs, mismatched bases and deletions.
///
/// `10A5^AC6` becomes `[Match(10), Mismatch("A"), Match(5), Deletion("AC"), Match(6)]`.
/// Adjacent mismatch letters without a separating `0` form a single token.
///
/// # Errors
///
/// Returns `EvidenceError::InvalidMd` for empty tags, stray characters, a dangling `^`,
/// or a match run that does not fit in `u32`.
pub fn tokenize_md(md: &str) -> Result<Vec<MdToken>, EvidenceError> {
    let invalid = || EvidenceError::InvalidMd(md.to_string());

    if md.is_empty() {
        return Err(invalid());
    }

    let bytes = md.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let start = i;
        match bytes[i] {
            b'0'..=b'9' => {
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                let n: u32 = md[start..i].parse().map_err(|_| invalid())?;
                tokens.push(MdToken::Match(n));
            }
            b'^' => {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
                    i += 1;
                }
                if i == start + 1 {
                    return Err(invalid());
                }
                tokens.push(MdToken::Deletion(md[start + 1..i].to_string()));
            }
            c if c.is_ascii_alphabetic() => {
                while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
                    i += 1;
                }
                tokens.push(MdToken::Mismatch(md[start..i].to_string()));
            }
            _ => return Err(invalid()),
        }
    }

    Ok(tokens)
}

/// Number of mismatch runs in a tokenized MD tag
#[must_use]
pub fn count_mismatch_events(tokens: &[MdToken]) -> u32 {
    let n = tokens
        .iter()
        .filter(|t| matches!(t, MdToken::Mismatch(_)))
        .count();
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_md() {
        let tokens = tokenize_md("10A5^AC6").unwrap();
        assert_eq!(
            tokens,
            vec![
                MdToken::Match(10),
                MdToken::Mismatch("A".to_string()),
                MdToken::Match(5),
                MdToken::Deletion("AC".to_string()),
                MdToken::Match(6),
            ]
        );
        assert_eq!(tokens.iter().map(MdToken::read_len).sum::<usize>(), 22);
    }

    #[test]
    fn test_tokenize_md_zero_separated_mismatches() {
        let tokens = tokenize_md("0T0G48").unwrap();
        assert_eq!(tokens.len(), 5);
        assert_eq!(count_mismatch_events(&tokens), 2);

        let tokens = tokenize_md("3GT4").unwrap();
        assert_eq!(tokens[1], MdToken::Mismatch("GT".to_string()));
        assert_eq!(count_mismatch_events(&tokens), 1);
    }

    #[test]
    fn test_tokenize_md_invalid() {
        assert!(tokenize_md("").is_err());
        assert!(tokenize_md("10^").is_err());
        assert!(tokenize_md("10*5").is_err());
    }

    #[test]
    fn test_count_indel_ops() {
        let count = |cigar: &str| count_indel_ops(&parse_cigar(cigar).unwrap());
        assert_eq!(count("100M"), 0);
        assert_eq!(count("50M2I48M"), 1);
        assert_eq!(count("10S20M1D30M3I37M"), 2);
        assert_eq!(count("*"), 0);
        assert!(parse_cigar("M").is_err());
        assert!(parse_cigar("10M5").is_err());
        assert!(parse_cigar("10Q").is_err());
    }

    #[test]
    fn test_from_fields() {
        let evidence =
            AlignmentEvidence::from_fields("r1", "A*01:01", 99, "4M1I5M", "1C7", vec![30; 10])
                .unwrap();
        assert!(evidence.is_proper_pair);
        assert_eq!(evidence.indel_events, 1);
        assert_eq!(evidence.mismatch_events, 1);

        let evidence =
            AlignmentEvidence::from_fields("r1", "A*01:01", 65, "10M", "10", vec![30; 10]).unwrap();
        assert!(!evidence.is_proper_pair);
        assert_eq!(evidence.mismatch_events, 0);
    }

    #[test]
    fn test_from_fields_drops_soft_clipped_qualities() {
        let evidence =
            AlignmentEvidence::from_fields("r1", "A*01:01", 99, "2S4M", "4", vec![2, 2, 40, 40, 40, 40])
                .unwrap();
        assert_eq!(evidence.base_qualities, vec![40; 4]);

        let quals = vec![2, 30, 31, 32, 33, 3, 4];
        let evidence =
            AlignmentEvidence::from_fields("r1", "A*01:01", 99, "5H1S4M2S3H", "4", quals).unwrap();
        assert_eq!(evidence.base_qualities, vec![30, 31, 32, 33]);
    }

    #[test]
    fn test_from_fields_clip_longer_than_read() {
        let err = AlignmentEvidence::from_fields("r1", "A*01:01", 99, "3S4M", "4", vec![30; 2])
            .unwrap_err();
        assert_eq!(
            err,
            EvidenceError::ClippedQualities {
                clipped: 3,
                qualities: 2
            }
        );
    }

    #[test]
    fn test_parse_cigar_and_clips() {
        let ops = parse_cigar("3S10M2I5M1S").unwrap();
        assert_eq!(ops.len(), 5);
        assert_eq!(ops[2], CigarOp::new('I', 2));
        assert_eq!(soft_clips(&ops), (3, 1));
        assert_eq!(soft_clips(&parse_cigar("10M").unwrap()), (0, 0));
        assert_eq!(soft_clips(&parse_cigar("*").unwrap()), (0, 0));
        assert_eq!(soft_clips(&parse_cigar("7S").unwrap()), (7, 0));
    }
}
