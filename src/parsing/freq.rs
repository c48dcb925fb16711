//! Parser for population allele frequency tables.
//!
//! A tab-separated table with a header row, an `Allele` column and one numeric column
//! per population:
//!
//! ```text
//! Allele     EUR     AFR
//! A*01:01    0.15    0.04
//! A*02:01    0.28    0.11
//! ```
//!
//! Alleles whose frequencies sum to zero are never observed and are dropped.

use std::path::Path;

use tracing::debug;

use crate::parsing::sam::ParseError;

/// Name of the column holding allele identifiers
pub const ALLELE_COLUMN: &str = "Allele";

/// One row of the frequency table
#[derive(Debug, Clone, PartialEq)]
pub struct AlleleFrequency {
    pub allele: String,
    /// Values of the numeric columns, in [`FrequencyTable::populations`] order
    pub frequencies: Vec<f64>,
}

impl AlleleFrequency {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.frequencies.iter().sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequencyTable {
    /// Names of the numeric columns
    pub populations: Vec<String>,
    pub rows: Vec<AlleleFrequency>,
}

impl FrequencyTable {
    /// Alleles observed in at least one population, in table order
    #[must_use]
    pub fn alleles(&self) -> Vec<String> {
        self.rows.iter().map(|r| r.allele.clone()).collect()
    }
}

/// Parse a frequency table file
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, or other parse errors
/// if the content is invalid.
pub fn parse_freq_file(path: &Path) -> Result<FrequencyTable, ParseError> {
    let content = std::fs::read_to_string(path)?;
    parse_freq_text(&content)
}

/// Parse frequency table text
///
/// A column is numeric when every one of its values parses as a number. Other columns
/// besides `Allele` are carried as annotation and ignored.
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` if the header is missing, has no `Allele`
/// column, or a row has the wrong number of fields.
pub fn parse_freq_text(text: &str) -> Result<FrequencyTable, ParseError> {
    let mut lines = text
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty() && !l.starts_with('#'));

    let header: Vec<&str> = lines
        .next()
        .ok_or_else(|| ParseError::InvalidFormat("Frequency table is empty".to_string()))?
        .split('\t')
        .map(str::trim)
        .collect();

    let allele_col = header
        .iter()
        .position(|h| *h == ALLELE_COLUMN)
        .ok_or_else(|| {
            ParseError::InvalidFormat(format!(
                "Frequency table has no '{ALLELE_COLUMN}' column"
            ))
        })?;

    let mut records: Vec<Vec<&str>> = Vec::new();
    for (i, line) in lines.enumerate() {
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        if fields.len() != header.len() {
            return Err(ParseError::InvalidFormat(format!(
                "Row {} has {} fields, expected {}",
                i + 1,
                fields.len(),
                header.len()
            )));
        }
        records.push(fields);
    }

    let numeric: Vec<usize> = (0..header.len())
        .filter(|&col| col != allele_col)
        .filter(|&col| records.iter().all(|r| r[col].parse::<f64>().is_ok()))
        .collect();

    let populations = numeric.iter().map(|&c| header[c].to_string()).collect();

    let total_rows = records.len();
    let rows: Vec<AlleleFrequency> = records
        .iter()
        .map(|r| AlleleFrequency {
            allele: r[allele_col].to_string(),
            frequencies: numeric
                .iter()
                .map(|&c| r[c].parse::<f64>().unwrap_or_default())
                .collect(),
        })
        .filter(|f| f.total() > 0.0)
        .collect();

    debug!(
        rows = rows.len(),
        dropped = total_rows - rows.len(),
        populations = numeric.len(),
        "Parsed frequency table"
    );

    Ok(FrequencyTable { populations, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_freq_text() {
        let text = "Allele\tSource\tEUR\tAFR
A*01:01\tcat\t0.15\t0.04
A*02:01\tcat\t0.28\t0.11
A*03:99\tcat\t0\t0
B*07:02\tcat\t0.0\t0.01
";
        let table = parse_freq_text(text).unwrap();
        assert_eq!(table.populations, vec!["EUR", "AFR"]);
        assert_eq!(table.alleles(), vec!["A*01:01", "A*02:01", "B*07:02"]);
        assert!((table.rows[1].total() - 0.39).abs() < 1e-9);
    }

    #[test]
    fn test_allele_column_anywhere() {
        let text = "EUR\tAllele\n0.5\tC*07:01\n";
        let table = parse_freq_text(text).unwrap();
        assert_eq!(table.alleles(), vec!["C*07:01"]);
    }

    #[test]
    fn test_column_with_text_is_not_numeric() {
        let text = "Allele\tEUR\tNote\nA*01:01\t0\t1\nA*02:01\t0.2\tn/a\n";
        let table = parse_freq_text(text).unwrap();
        assert_eq!(table.populations, vec!["EUR"]);
        // A*01:01 sums to 0 once the text column is excluded
        assert_eq!(table.alleles(), vec!["A*02:01"]);
    }

    #[test]
    fn test_invalid_tables() {
        assert!(parse_freq_text("").is_err());
        assert!(parse_freq_text("Name\tEUR\nA*01:01\t0.1\n").is_err());
        assert!(parse_freq_text("Allele\tEUR\nA*01:01\n").is_err());
    }
}
