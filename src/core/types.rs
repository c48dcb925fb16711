use serde::Serialize;

/// A row of a score table: one read pair's evidence for one allele
pub trait AlleleScore {
    fn qname(&self) -> &str;
    fn allele(&self) -> &str;
    fn gene(&self) -> &str;
    fn score(&self) -> f64;
}

/// Summed log-likelihood of both mates of a read pair against one allele
#[derive(Debug, Clone, PartialEq)]
pub struct ReadPairScore {
    pub qname: String,
    pub allele: String,
    pub gene: String,
    pub score: f64,
}

impl ReadPairScore {
    pub fn new(
        qname: impl Into<String>,
        allele: impl Into<String>,
        gene: impl Into<String>,
        score: f64,
    ) -> Self {
        Self {
            qname: qname.into(),
            allele: allele.into(),
            gene: gene.into(),
            score,
        }
    }
}

impl AlleleScore for ReadPairScore {
    fn qname(&self) -> &str {
        &self.qname
    }

    fn allele(&self) -> &str {
        &self.allele
    }

    fn gene(&self) -> &str {
        &self.gene
    }

    fn score(&self) -> f64 {
        self.score
    }
}

/// A stage-one score re-weighted against the first-copy winner of its gene
#[derive(Debug, Clone, PartialEq)]
pub struct ReallocatedScore {
    pub qname: String,
    pub allele: String,
    pub gene: String,
    /// Adjusted score: `original_score * factor`
    pub score: f64,
    pub original_score: f64,
    /// The winner's score for the same read pair, 0 when it has no evidence for it
    pub winner_score: f64,
    /// `original_score / (original_score + winner_score)`
    pub factor: f64,
}

impl AlleleScore for ReallocatedScore {
    fn qname(&self) -> &str {
        &self.qname
    }

    fn allele(&self) -> &str {
        &self.allele
    }

    fn gene(&self) -> &str {
        &self.gene
    }

    fn score(&self) -> f64 {
        self.score
    }
}

/// Total score of one allele over every read pair scored against it
#[derive(Debug, Clone, PartialEq)]
pub struct GeneTotal {
    pub gene: String,
    pub allele: String,
    /// Rounded to [`TOTAL_DECIMALS`] places
    pub total_score: f64,
}

/// The allele selected for one copy of a gene
#[derive(Debug, Clone, PartialEq)]
pub struct Winner {
    pub gene: String,
    pub allele: String,
    pub total_score: f64,
}

impl From<GeneTotal> for Winner {
    fn from(total: GeneTotal) -> Self {
        Self {
            gene: total.gene,
            allele: total.allele,
            total_score: total.total_score,
        }
    }
}

/// Which of the two diploid copies a winner was called for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlleleCopy {
    First,
    Second,
}

impl std::fmt::Display for AlleleCopy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::First => write!(f, "1"),
            Self::Second => write!(f, "2"),
        }
    }
}

/// A winner tagged with the copy it was called for
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlleleCall {
    pub gene: String,
    pub allele: String,
    pub total_score: f64,
    pub copy: AlleleCopy,
}

impl AlleleCall {
    #[must_use]
    pub fn new(winner: &Winner, copy: AlleleCopy) -> Self {
        Self {
            gene: winner.gene.clone(),
            allele: winner.allele.clone(),
            total_score: winner.total_score,
            copy,
        }
    }
}

/// Decimal places totals are rounded to before comparison
pub const TOTAL_DECIMALS: i32 = 4;

/// Round a total so floating-point noise cannot break ties
#[must_use]
pub fn round_total(value: f64) -> f64 {
    let scale = 10f64.powi(TOTAL_DECIMALS);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_total() {
        assert!((round_total(1.234_56) - 1.2346).abs() < 1e-12);
        assert!((round_total(0.1 + 0.2) - 0.3).abs() < 1e-12);
        assert_eq!(round_total(0.1 + 0.2), round_total(0.3));
        assert!((round_total(-2.000_04) + 2.0).abs() < 1e-12);
    }
}
