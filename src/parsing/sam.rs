use std::io::BufReader;
use std::path::Path;

use noodles::sam::header::record::value::map::read_group::tag as rg_tag;
use thiserror::Error;
use tracing::debug;

use crate::utils::validation::check_reference_limit;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("noodles error: {0}")]
    Noodles(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Too many reference sequences: {0} exceeds maximum allowed (100000)")]
    TooManyReferences(usize),
}

/// What typing needs from an alignment file header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignmentHeader {
    /// `@SQ SN` values: the allele sequences reads were aligned to
    pub alleles: Vec<String>,
    /// `@RG SM` values, one per read group carrying a sample
    pub samples: Vec<String>,
}

/// Parse the header of a SAM/BAM/CRAM file
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, `ParseError::Noodles` if
/// parsing fails, `ParseError::UnsupportedFormat` for unknown extensions,
/// `ParseError::InvalidFormat` if no reference sequences are found, or
/// `ParseError::TooManyReferences` if the limit is exceeded.
pub fn parse_file(path: &Path) -> Result<AlignmentHeader, ParseError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    let header = match extension.as_deref() {
        Some("sam") | None => read_sam_header(path)?,
        Some("bam") => read_bam_header(path)?,
        Some("cram") => read_cram_header(path)?,
        Some(ext) => return Err(ParseError::UnsupportedFormat(ext.to_string())),
    };

    alignment_header(&header)
}

/// Collect `@SQ` names and `@RG SM` values from a parsed noodles header
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` if there are no reference sequences, or
/// `ParseError::TooManyReferences` if the limit is exceeded.
pub fn alignment_header(header: &noodles::sam::Header) -> Result<AlignmentHeader, ParseError> {
    let references = header.reference_sequences();
    if check_reference_limit(references.len()).is_some() {
        return Err(ParseError::TooManyReferences(references.len()));
    }

    let alleles: Vec<String> = references.keys().map(ToString::to_string).collect();
    if alleles.is_empty() {
        return Err(ParseError::InvalidFormat(
            "No @SQ lines found in header".to_string(),
        ));
    }

    let samples = header
        .read_groups()
        .values()
        .filter_map(|rg| rg.other_fields().get(&rg_tag::SAMPLE))
        .map(ToString::to_string)
        .collect();

    let parsed = AlignmentHeader { alleles, samples };
    debug!(
        alleles = parsed.alleles.len(),
        read_groups = parsed.samples.len(),
        "Parsed alignment header"
    );
    Ok(parsed)
}

/// Read the header of a SAM file (text format)
fn read_sam_header(path: &Path) -> Result<noodles::sam::Header, ParseError> {
    use noodles::sam;

    let mut reader = std::fs::File::open(path)
        .map(BufReader::new)
        .map(sam::io::Reader::new)?;

    reader
        .read_header()
        .map_err(|e| ParseError::Noodles(e.to_string()))
}

/// Read the header of a BAM file (binary format)
fn read_bam_header(path: &Path) -> Result<noodles::sam::Header, ParseError> {
    use noodles::bam;

    let mut reader = std::fs::File::open(path).map(bam::io::Reader::new)?;

    reader
        .read_header()
        .map_err(|e| ParseError::Noodles(e.to_string()))
}

/// Read the header of a CRAM file
fn read_cram_header(path: &Path) -> Result<noodles::sam::Header, ParseError> {
    use noodles::cram;

    let mut reader = std::fs::File::open(path).map(cram::io::Reader::new)?;

    reader
        .read_file_definition()
        .map_err(|e| ParseError::Noodles(e.to_string()))?;

    reader
        .read_file_header()
        .map_err(|e| ParseError::Noodles(e.to_string()))
}

/// Parse raw SAM header text, collecting `@SQ SN` and `@RG SM` values
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` if no `@SQ` lines are found, or
/// `ParseError::TooManyReferences` if the limit is exceeded.
pub fn parse_header_text(text: &str) -> Result<AlignmentHeader, ParseError> {
    let mut header = AlignmentHeader::default();

    for line in text.lines() {
        let record_type = line.split('\t').next().unwrap_or_default();
        let tag = match record_type {
            "@SQ" => "SN",
            "@RG" => "SM",
            _ => continue,
        };

        let value = line
            .split('\t')
            .skip(1)
            .filter_map(|field| field.split_once(':'))
            .find(|(t, _)| *t == tag)
            .map(|(_, v)| v.to_string());

        match (record_type, value) {
            ("@SQ", Some(name)) => {
                if check_reference_limit(header.alleles.len()).is_some() {
                    return Err(ParseError::TooManyReferences(header.alleles.len()));
                }
                header.alleles.push(name);
            }
            ("@RG", Some(sample)) => header.samples.push(sample),
            _ => {}
        }
    }

    if header.alleles.is_empty() {
        return Err(ParseError::InvalidFormat(
            "No @SQ lines found in header".to_string(),
        ));
    }

    debug!(
        alleles = header.alleles.len(),
        read_groups = header.samples.len(),
        "Parsed alignment header"
    );
    Ok(header)
}
