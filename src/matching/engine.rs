use std::collections::{BTreeSet, HashMap};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::allele::{decompose, AllelePattern};
use crate::core::evidence::{AlignmentEvidence, EvidenceError};
use crate::core::types::{AlleleCall, AlleleCopy, ReadPairScore, ReallocatedScore, Winner};
use crate::matching::filter::filter_evidence;
use crate::matching::reallocation::{reallocate, winner_scores};
use crate::matching::resolver::resolve_winners;
use crate::matching::scoring::{score_read_pairs, ScoreError};
use crate::utils::progress::ProgressTracker;

/// Default upper bound on mismatch events per alignment (effectively unbounded)
pub const DEFAULT_MIN_ECNT: u32 = 999;

/// Default number of scoring workers
pub const DEFAULT_THREADS: usize = 8;

/// Candidates scored between progress messages in stage one
pub const PROGRESS_INTERVAL: u64 = 100;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Scoring failed: {0}")]
    Score(#[from] ScoreError),

    #[error(transparent)]
    Evidence(#[from] EvidenceError),

    #[error("Failed to score any of {0} candidate alleles for the first copy")]
    NoScorableCandidates(usize),

    #[error("Failed to score any of {0} genes for the second copy")]
    NoScorableGenes(usize),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Read-only access to the alignments of each candidate allele.
///
/// Implementations are queried concurrently, once per allele per stage.
pub trait EvidenceSource: Sync {
    /// All alignments recorded against `allele`; empty when there are none.
    ///
    /// # Errors
    ///
    /// Returns `EvidenceError` if the underlying source cannot be read.
    fn fetch(&self, allele: &str) -> Result<Vec<AlignmentEvidence>, EvidenceError>;
}

impl EvidenceSource for HashMap<String, Vec<AlignmentEvidence>> {
    fn fetch(&self, allele: &str) -> Result<Vec<AlignmentEvidence>, EvidenceError> {
        Ok(self.get(allele).cloned().unwrap_or_default())
    }
}

/// Configuration for the typing engine
#[derive(Debug, Clone)]
pub struct TypingConfig {
    /// Alignments with more mismatch events than this are not scored
    pub min_ecnt: u32,
    /// Upper bound on concurrent scoring workers
    pub threads: usize,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            min_ecnt: DEFAULT_MIN_ECNT,
            threads: DEFAULT_THREADS,
        }
    }
}

/// Worker pool sized to the work available, never more than `threads`
fn build_pool(threads: usize, units: usize) -> Result<rayon::ThreadPool, EngineError> {
    let num_threads = threads.min(units).max(1);
    debug!(num_threads, units, "Building worker pool");
    Ok(rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()?)
}

/// Filter and score one candidate's evidence. Empty when nothing survives filtering.
fn score_candidate<E: EvidenceSource + ?Sized>(
    allele: &str,
    source: &E,
    min_ecnt: u32,
    pattern: &AllelePattern,
) -> Result<Vec<ReadPairScore>, EngineError> {
    let gene = match decompose(allele, pattern) {
        Ok(decomposed) => decomposed.gene(),
        Err(e) => {
            warn!(allele, error = %e, "Skipping candidate allele");
            return Ok(Vec::new());
        }
    };

    let records = source.fetch(allele)?;
    debug!(allele, alignments = records.len(), "Fetched alignments");

    let filtered = filter_evidence(records, min_ecnt);
    if filtered.is_empty() {
        debug!(allele, "No alignments left for scoring after filtering");
        return Ok(Vec::new());
    }

    Ok(score_read_pairs(&filtered, allele, &gene)?)
}

/// Score every candidate allele against its own evidence (first copy).
///
/// One task per candidate runs on a pool of at most `threads` workers. Candidates without
/// surviving evidence simply contribute nothing.
///
/// # Errors
///
/// Returns `EngineError::NoScorableCandidates` if no candidate produced a score, or the
/// first `ScoreError`/`EvidenceError` raised by any task.
pub fn score_first_copy<E: EvidenceSource + ?Sized>(
    candidates: &[String],
    source: &E,
    min_ecnt: u32,
    threads: usize,
) -> Result<Vec<ReadPairScore>, EngineError> {
    info!(candidates = candidates.len(), "Scoring first allele");

    let pattern = AllelePattern::default();
    let progress = ProgressTracker::new("Scored alleles").with_interval(PROGRESS_INTERVAL);
    let pool = build_pool(threads, candidates.len())?;
    let batches: Vec<Vec<ReadPairScore>> = pool.install(|| {
        candidates
            .par_iter()
            .map(|allele| {
                let scores = score_candidate(allele, source, min_ecnt, &pattern);
                progress.log_if_needed(1);
                scores
            })
            .collect::<Result<_, _>>()
    })?;
    progress.log_final();

    let scored = batches.iter().filter(|b| !b.is_empty()).count();
    if scored == 0 {
        return Err(EngineError::NoScorableCandidates(candidates.len()));
    }
    info!(scored, "Alleles scored");

    Ok(batches.into_iter().flatten().collect())
}

/// Reallocate stage-one scores against the first-copy winners (second copy).
///
/// One task per gene present in `winner_scores`; workers are capped at the gene count.
///
/// # Errors
///
/// Returns `EngineError::NoScorableGenes` if reallocation produced no rows.
pub fn score_second_copy(
    scores: &[ReadPairScore],
    winner_scores: &[ReadPairScore],
    threads: usize,
) -> Result<Vec<ReallocatedScore>, EngineError> {
    let genes: Vec<&str> = winner_scores
        .iter()
        .map(|w| w.gene.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    info!(genes = genes.len(), "Scoring second allele");

    let pool = build_pool(threads, genes.len())?;
    let batches: Vec<Vec<ReallocatedScore>> = pool.install(|| {
        genes
            .par_iter()
            .map(|gene| reallocate(gene, scores, winner_scores))
            .collect()
    });

    if batches.iter().all(Vec::is_empty) {
        return Err(EngineError::NoScorableGenes(genes.len()));
    }

    Ok(batches.into_iter().flatten().collect())
}

/// Score tables and winners of a full two-stage run
#[derive(Debug, Clone)]
pub struct TypingResult {
    pub first_scores: Vec<ReadPairScore>,
    pub first_winners: Vec<Winner>,
    pub second_scores: Vec<ReallocatedScore>,
    pub second_winners: Vec<Winner>,
}

impl TypingResult {
    /// Both copies of every gene, ordered by allele then copy
    #[must_use]
    pub fn calls(&self) -> Vec<AlleleCall> {
        let first = self
            .first_winners
            .iter()
            .map(|w| AlleleCall::new(w, AlleleCopy::First));
        let second = self
            .second_winners
            .iter()
            .map(|w| AlleleCall::new(w, AlleleCopy::Second));

        let mut calls: Vec<AlleleCall> = first.chain(second).collect();
        calls.sort_by(|a, b| a.allele.cmp(&b.allele).then(a.copy.cmp(&b.copy)));
        calls
    }
}

/// Two-stage diploid typing over one evidence source
pub struct TypingEngine<'a, E: EvidenceSource + ?Sized> {
    source: &'a E,
    config: TypingConfig,
}

impl<'a, E: EvidenceSource + ?Sized> TypingEngine<'a, E> {
    /// Create a new typing engine with default configuration
    pub fn new(source: &'a E) -> Self {
        Self {
            source,
            config: TypingConfig::default(),
        }
    }

    /// Create a new typing engine with custom configuration
    pub fn with_config(source: &'a E, config: TypingConfig) -> Self {
        Self { source, config }
    }

    /// Stage one only
    ///
    /// # Errors
    ///
    /// See [`score_first_copy`].
    pub fn score_first_copy(&self, candidates: &[String]) -> Result<Vec<ReadPairScore>, EngineError> {
        score_first_copy(
            candidates,
            self.source,
            self.config.min_ecnt,
            self.config.threads,
        )
    }

    /// Type all candidates from scratch
    ///
    /// # Errors
    ///
    /// Returns any error of either scoring stage.
    pub fn run(&self, candidates: &[String]) -> Result<TypingResult, EngineError> {
        let first_scores = self.score_first_copy(candidates)?;
        self.resolve(first_scores)
    }

    /// Finish typing from previously computed stage-one scores
    ///
    /// # Errors
    ///
    /// See [`score_second_copy`].
    pub fn resolve(&self, first_scores: Vec<ReadPairScore>) -> Result<TypingResult, EngineError> {
        info!("Getting winners for the first allele");
        let first_winners = resolve_winners(&first_scores);
        let winners_rows = winner_scores(&first_scores, &first_winners);

        let second_scores = score_second_copy(&first_scores, &winners_rows, self.config.threads)?;
        info!("Getting winners for the second allele");
        let second_winners = resolve_winners(&second_scores);

        Ok(TypingResult {
            first_scores,
            first_winners,
            second_scores,
            second_winners,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::evidence::tokenize_md;
    use crate::core::types::round_total;

    fn mate(qname: &str, allele: &str, md: &str, len: usize) -> AlignmentEvidence {
        AlignmentEvidence {
            qname: qname.to_string(),
            allele: allele.to_string(),
            base_qualities: vec![30; len],
            md_tokens: tokenize_md(md).unwrap(),
            is_proper_pair: true,
            indel_events: 0,
            mismatch_events: 0,
        }
    }

    fn source(records: Vec<AlignmentEvidence>) -> HashMap<String, Vec<AlignmentEvidence>> {
        let mut map: HashMap<String, Vec<AlignmentEvidence>> = HashMap::new();
        for r in records {
            map.entry(r.allele.clone()).or_default().push(r);
        }
        map
    }

    fn s(qname: &str, allele: &str, gene: &str, score: f64) -> ReadPairScore {
        ReadPairScore::new(qname, allele, gene, score)
    }

    #[test]
    fn test_score_first_copy() {
        let evidence = source(vec![
            mate("r1", "A*01:01:01", "10", 10),
            mate("r1", "A*01:01:01", "10", 10),
            mate("r1", "A*02:01:01", "4T5", 10),
            mate("r1", "A*02:01:01", "10", 10),
            mate("lone", "A*02:01:01", "10", 10),
        ]);
        let candidates = vec![
            "A*01:01:01".to_string(),
            "A*02:01:01".to_string(),
            "A*03:01:01".to_string(),
        ];

        let scores = score_first_copy(&candidates, &evidence, 999, 4).unwrap();
        assert_eq!(scores.len(), 2);
        assert!(scores.iter().all(|s| s.gene == "A" && s.qname == "r1"));

        let winners = resolve_winners(&scores);
        assert_eq!(winners.len(), 1);
        assert_eq!(winners[0].allele, "A*01:01:01");
    }

    #[test]
    fn test_order_independent_of_threads() {
        let mut records = Vec::new();
        for i in 0..10 {
            let allele = format!("B*0{}:01", i % 5 + 1);
            let qname = format!("r{i}");
            records.push(mate(&qname, &allele, "20", 20));
            records.push(mate(&qname, &allele, "9A10", 20));
        }
        let evidence = source(records);
        let candidates: Vec<String> = (1..=5).map(|i| format!("B*0{i}:01")).collect();

        let mut single = score_first_copy(&candidates, &evidence, 999, 1).unwrap();
        let mut many = score_first_copy(&candidates, &evidence, 999, 8).unwrap();
        let key = |a: &ReadPairScore, b: &ReadPairScore| {
            (a.allele.as_str(), a.qname.as_str()).cmp(&(b.allele.as_str(), b.qname.as_str()))
        };
        single.sort_by(key);
        many.sort_by(key);
        assert_eq!(single, many);
    }

    #[test]
    fn test_no_scorable_candidates() {
        let evidence = source(vec![mate("lone", "A*01:01:01", "10", 10)]);
        let candidates = vec!["A*01:01:01".to_string(), "not an allele".to_string()];
        let err = score_first_copy(&candidates, &evidence, 999, 2).unwrap_err();
        assert!(matches!(err, EngineError::NoScorableCandidates(2)));
    }

    #[test]
    fn test_malformed_evidence_fails_stage() {
        let evidence = source(vec![
            mate("r1", "A*01:01:01", "10", 10),
            mate("r1", "A*01:01:01", "12", 10),
        ]);
        let candidates = vec!["A*01:01:01".to_string()];
        let err = score_first_copy(&candidates, &evidence, 999, 1).unwrap_err();
        assert!(matches!(err, EngineError::Score(_)));
    }

    #[test]
    fn test_no_scorable_genes() {
        let err = score_second_copy(&[], &[], 4).unwrap_err();
        assert!(matches!(err, EngineError::NoScorableGenes(0)));
    }

    #[test]
    fn test_two_stage_scenario() {
        let scores = vec![
            s("r1", "A*01:01:01", "A", 10.0),
            s("r1", "A*02:01:01", "A", 2.0),
            s("r2", "A*02:01:01", "A", 5.0),
        ];
        let evidence: HashMap<String, Vec<AlignmentEvidence>> = HashMap::new();
        let engine = TypingEngine::new(&evidence);
        let result = engine.resolve(scores).unwrap();

        assert_eq!(result.first_winners.len(), 1);
        assert_eq!(result.first_winners[0].allele, "A*01:01:01");
        assert!((result.first_winners[0].total_score - 10.0).abs() < 1e-12);

        assert_eq!(result.second_winners.len(), 1);
        assert_eq!(result.second_winners[0].allele, "A*02:01:01");
        let expected = round_total(2.0 * 2.0 / 12.0 + 5.0);
        assert!((result.second_winners[0].total_score - expected).abs() < 1e-12);

        let calls = result.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].allele, "A*01:01:01");
        assert_eq!(calls[0].copy, AlleleCopy::First);
        assert_eq!(calls[1].copy, AlleleCopy::Second);
    }

    #[test]
    fn test_homozygous_call_preserved() {
        let scores = vec![
            s("r1", "A*01:01:01", "A", 10.0),
            s("r2", "A*01:01:01", "A", 10.0),
            s("r1", "A*02:01:01", "A", 9.0),
        ];
        let evidence: HashMap<String, Vec<AlignmentEvidence>> = HashMap::new();
        let result = TypingEngine::new(&evidence).resolve(scores).unwrap();
        assert_eq!(result.first_winners[0].allele, "A*01:01:01");
        // winner keeps 10, the competitor only 9 * 9/19
        assert_eq!(result.second_winners[0].allele, "A*01:01:01");
    }

    #[test]
    fn test_run_multiple_genes() {
        let evidence = source(vec![
            mate("r1", "A*01:01:01", "10", 10),
            mate("r1", "A*01:01:01", "10", 10),
            mate("r2", "B*07:02:01", "10", 10),
            mate("r2", "B*07:02:01", "10", 10),
            mate("r3", "B*08:01:01", "10", 10),
            mate("r3", "B*08:01:01", "10", 10),
        ]);
        let candidates: Vec<String> = ["A*01:01:01", "B*07:02:01", "B*08:01:01"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let config = TypingConfig {
            min_ecnt: 999,
            threads: 2,
        };
        let result = TypingEngine::with_config(&evidence, config)
            .run(&candidates)
            .unwrap();

        assert_eq!(result.first_winners.len(), 2);
        assert_eq!(result.second_winners.len(), 2);
        let b_first = &result.first_winners[1];
        let b_second = &result.second_winners[1];
        // identical evidence: tie goes to the smaller allele first, then r3 is untouched
        assert_eq!(b_first.allele, "B*07:02:01");
        assert_eq!(b_second.allele, "B*08:01:01");
    }
}
