//! HLA allele identifier grammar.
//!
//! An allele identifier is `{prefix}{locus}{sep}{digit_fields}`, e.g. `HLA-A*02:01:01`
//! or `hla_drb1_11_01_01`. The grammar is compiled from a [`PatternConfig`] into an
//! [`AllelePattern`], which can then decompose identifiers into their parts or reduce
//! them to a coarser resolution.

use std::fmt;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

/// Loci an identifier may name. Compared case-insensitively.
pub const VALID_LOCI: &[&str] = &[
    "A", "B", "C", "E", "F", "G", "H", "J", "K", "L", "N", "P", "R", "S", "T", "U", "V", "W",
    "X", "Y", "Z", "DRA", "DRB1", "DRB2", "DRB3", "DRB4", "DRB5", "DRB6", "DRB7", "DRB8", "DRB9",
    "DQA1", "DQB1", "DQA2", "DQB2", "DQB3", "DOA", "DOB", "DMA", "DMB", "DPA1", "DPB1", "DPA2",
    "DPB2", "DPA3",
];

/// Lowest resolution (number of digit fields) a pattern can target
pub const MIN_RESOLUTION: i32 = 1;

/// Highest resolution (number of digit fields) a pattern can target
pub const MAX_RESOLUTION: i32 = 4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlleleError {
    #[error("Invalid allele pattern configuration: {0}")]
    InvalidPatternConfig(String),

    #[error("Failed to decompose allele '{allele}': {reason}")]
    Decompose { allele: String, reason: String },
}

impl AlleleError {
    fn decompose(allele: &str, reason: impl Into<String>) -> Self {
        Self::Decompose {
            allele: allele.to_string(),
            reason: reason.into(),
        }
    }
}

/// User-facing description of the allele grammar.
///
/// `prefix`, `locus` and `sep` are regular-expression fragments; they are trimmed
/// before use and must not be blank.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PatternConfig {
    pub prefix: String,
    pub locus: String,
    pub sep: String,
    /// Characters allowed between two digit fields
    pub digit_field_sep: Vec<char>,
    /// Expression suffix letters (null, low, secreted, ...), matched in either case
    pub expr_suffix: Vec<char>,
    /// Number of digit fields to capture, clamped to `[1, 4]`
    pub resolution: i32,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            prefix: "(?:HLA|hla)[-_]".to_string(),
            locus: "[a-zA-Z]+[0-9]?".to_string(),
            sep: r"[\*_]".to_string(),
            digit_field_sep: vec![':', '_'],
            expr_suffix: vec!['N', 'L', 'S', 'C', 'A', 'Q'],
            resolution: MAX_RESOLUTION,
        }
    }
}

impl PatternConfig {
    /// Read a grammar from JSON. Keys left out keep their default value.
    ///
    /// ```
    /// use mhc_typer::PatternConfig;
    ///
    /// let config = PatternConfig::from_json(r#"{"resolution": 2}"#).unwrap();
    /// assert_eq!(config.resolution, 2);
    /// assert_eq!(config.digit_field_sep, vec![':', '_']);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `AlleleError::InvalidPatternConfig` if the JSON is malformed or names an
    /// unknown key.
    pub fn from_json(text: &str) -> Result<Self, AlleleError> {
        serde_json::from_str(text).map_err(|e| AlleleError::InvalidPatternConfig(e.to_string()))
    }

    #[must_use]
    pub fn with_resolution(mut self, resolution: i32) -> Self {
        self.resolution = resolution;
        self
    }

    #[must_use]
    pub fn with_digit_field_sep(mut self, seps: &[char]) -> Self {
        self.digit_field_sep = seps.to_vec();
        self
    }
}

/// A compiled allele grammar.
#[derive(Debug, Clone)]
pub struct AllelePattern {
    resolution: i32,
    digit_fields: String,
    /// Full-string match, used by [`decompose`]
    anchored: Regex,
    /// First match anywhere, used by [`reduce_resolution`]
    unanchored: Regex,
}

impl AllelePattern {
    /// Compile a grammar from its configuration.
    ///
    /// # Errors
    ///
    /// Returns `AlleleError::InvalidPatternConfig` if a sub-pattern is blank, no
    /// digit-field separator is given, or the assembled expression does not compile.
    pub fn build(config: &PatternConfig) -> Result<Self, AlleleError> {
        let prefix = non_blank("prefix", &config.prefix)?;
        let locus = non_blank("locus", &config.locus)?;
        let sep = non_blank("sep", &config.sep)?;

        if config.digit_field_sep.is_empty() {
            return Err(AlleleError::InvalidPatternConfig(
                "digit_field_sep cannot be empty".to_string(),
            ));
        }

        let resolution = config.resolution.clamp(MIN_RESOLUTION, MAX_RESOLUTION);
        let digit_fields = digit_fields_pattern(
            &config.digit_field_sep,
            &config.expr_suffix,
            resolution,
        );

        let body = format!(
            "(?:(?P<prefix>{prefix}))?(?P<locus>{locus})(?P<sep>{sep})(?P<digit_fields>{digit_fields})"
        );
        let anchored = compile(&format!("^{body}$"))?;
        let unanchored = compile(&body)?;

        Ok(Self {
            resolution,
            digit_fields,
            anchored,
            unanchored,
        })
    }

    /// The effective (clamped) resolution
    #[must_use]
    pub fn resolution(&self) -> i32 {
        self.resolution
    }

    /// The digit-field sub-expression derived from the configuration
    #[must_use]
    pub fn digit_fields(&self) -> &str {
        &self.digit_fields
    }
}

impl Default for AllelePattern {
    fn default() -> Self {
        // The default configuration is a fixed, known-good grammar.
        Self::build(&PatternConfig::default()).expect("default allele pattern compiles")
    }
}

fn non_blank<'a>(name: &str, value: &'a str) -> Result<&'a str, AlleleError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AlleleError::InvalidPatternConfig(format!(
            "{name} cannot be empty or just whitespace"
        )));
    }
    Ok(trimmed)
}

fn compile(pattern: &str) -> Result<Regex, AlleleError> {
    Regex::new(pattern).map_err(|e| AlleleError::InvalidPatternConfig(e.to_string()))
}

/// `(?:[0-9]+[SEPS]){0,R-1}[0-9]+[SUFFIXES]?`
fn digit_fields_pattern(seps: &[char], suffixes: &[char], resolution: i32) -> String {
    let sep_class: String = seps
        .iter()
        .map(|c| regex::escape(&c.to_string()))
        .collect();

    let mut pattern = format!("(?:[0-9]+[{sep_class}]){{0,{}}}[0-9]+", resolution - 1);

    if !suffixes.is_empty() {
        let mut letters = String::new();
        for c in suffixes {
            letters.push(c.to_ascii_uppercase());
        }
        for c in suffixes {
            letters.push(c.to_ascii_lowercase());
        }
        pattern.push('[');
        pattern.push_str(&regex::escape(&letters));
        pattern.push_str("]?");
    }

    pattern
}

/// An allele identifier split into its grammatical parts
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Allele {
    /// Leading prefix such as `HLA-`, empty when absent
    pub prefix: String,
    pub locus: String,
    pub digit_fields: String,
    pub sep: String,
}

impl Allele {
    /// The gene (locus group) this allele competes in: prefix followed by locus
    #[must_use]
    pub fn gene(&self) -> String {
        format!("{}{}", self.prefix, self.locus)
    }
}

impl fmt::Display for Allele {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}",
            self.prefix, self.locus, self.sep, self.digit_fields
        )
    }
}

/// Whether `locus` is one of [`VALID_LOCI`], ignoring case
#[must_use]
pub fn is_valid_locus(locus: &str) -> bool {
    VALID_LOCI.iter().any(|valid| valid.eq_ignore_ascii_case(locus))
}

/// Split an identifier into prefix, locus, separator and digit fields.
///
/// The whole string must match the grammar at the pattern's resolution.
///
/// # Errors
///
/// Returns `AlleleError::Decompose` if the identifier is blank, does not match,
/// or names a locus outside [`VALID_LOCI`].
pub fn decompose(allele: &str, pattern: &AllelePattern) -> Result<Allele, AlleleError> {
    if allele.trim().is_empty() {
        return Err(AlleleError::decompose(
            allele,
            "allele cannot be empty or just whitespace",
        ));
    }

    let caps = pattern
        .anchored
        .captures(allele)
        .ok_or_else(|| AlleleError::decompose(allele, "no match for allele pattern"))?;

    let locus = &caps["locus"];
    if !is_valid_locus(locus) {
        return Err(AlleleError::decompose(
            allele,
            format!("invalid locus '{locus}'"),
        ));
    }

    Ok(Allele {
        prefix: caps
            .name("prefix")
            .map(|m| m.as_str().to_string())
            .unwrap_or_default(),
        locus: locus.to_string(),
        digit_fields: caps["digit_fields"].to_string(),
        sep: caps["sep"].to_string(),
    })
}

/// Outcome of [`reduce_resolution`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reduction {
    /// The identifier truncated to the pattern's resolution
    pub allele: String,
    /// False when the input was already at or below the target resolution
    pub truncated: bool,
}

/// Truncate an identifier to the pattern's resolution.
///
/// Uses the first match anywhere in the string. When that match is the entire input
/// nothing was cut, which [`Reduction::truncated`] reports; callers decide whether that
/// deserves a warning.
///
/// # Errors
///
/// Returns `AlleleError::Decompose` if no part of the string matches the grammar.
pub fn reduce_resolution(allele: &str, pattern: &AllelePattern) -> Result<Reduction, AlleleError> {
    let m = pattern
        .unanchored
        .find(allele)
        .ok_or_else(|| AlleleError::decompose(allele, "no match for allele pattern"))?;

    Ok(Reduction {
        allele: m.as_str().to_string(),
        truncated: m.as_str() != allele,
    })
}
