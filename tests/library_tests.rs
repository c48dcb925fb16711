//! Typing through the public library API.

use mhc_typer::parsing::evidence::parse_evidence_text;
use mhc_typer::{
    resolve_winners, score_first_copy, score_second_copy, AlignmentEvidence, AlleleCopy,
    EngineError, EvidenceError, EvidenceSource, TypingConfig, TypingEngine,
};

/// Pairs of perfect 4-base mates for each `(qname, allele)`
fn perfect_pairs(pairs: &[(&str, &str)]) -> String {
    let mut text = String::new();
    for (qname, allele) in pairs {
        text.push_str(&format!("{qname}\t99\t{allele}\t4M\t4\t????\n"));
        text.push_str(&format!("{qname}\t147\t{allele}\t4M\t4\t????\n"));
    }
    text
}

#[test]
fn test_homozygous_call() {
    // B*07:02:01 explains every read pair, B*08:01:01 only a subset
    let text = perfect_pairs(&[
        ("r1", "B*07:02:01"),
        ("r2", "B*07:02:01"),
        ("r3", "B*07:02:01"),
        ("r1", "B*08:01:01"),
        ("r2", "B*08:01:01"),
    ]);
    let evidence = parse_evidence_text(&text).unwrap();

    let engine = TypingEngine::with_config(
        &evidence,
        TypingConfig {
            threads: 2,
            ..TypingConfig::default()
        },
    );
    let result = engine.run(&evidence.alleles()).unwrap();

    let calls = result.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.allele == "B*07:02:01" && c.gene == "B"));
    assert_eq!(calls[0].copy, AlleleCopy::First);
    assert_eq!(calls[1].copy, AlleleCopy::Second);
    assert!(calls[1].total_score < calls[0].total_score);
}

#[test]
fn test_stage_functions_compose() {
    let text = perfect_pairs(&[
        ("r1", "C*07:01:01"),
        ("r2", "C*07:01:01"),
        ("r5", "C*07:01:01"),
        ("r1", "C*04:01:01"),
        ("r3", "C*04:01:01"),
        ("r4", "C*04:01:01"),
        ("r6", "C*04:01:01"),
    ]);
    let evidence = parse_evidence_text(&text).unwrap();
    let candidates = vec!["C*07:01:01".to_string(), "C*04:01:01".to_string()];

    let first = score_first_copy(&candidates, &evidence, 999, 4).unwrap();
    assert_eq!(first.len(), 7);

    let winners = resolve_winners(&first);
    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].allele, "C*04:01:01");

    let winner_rows = mhc_typer::matching::reallocation::winner_scores(&first, &winners);
    let second = score_second_copy(&first, &winner_rows, 4).unwrap();
    let second_winners = resolve_winners(&second);
    assert_eq!(second_winners[0].allele, "C*07:01:01");
}

struct BrokenSource;

impl EvidenceSource for BrokenSource {
    fn fetch(&self, allele: &str) -> Result<Vec<AlignmentEvidence>, EvidenceError> {
        Err(EvidenceError::Source {
            allele: allele.to_string(),
            message: "index unavailable".to_string(),
        })
    }
}

#[test]
fn test_evidence_source_failure_is_fatal() {
    let candidates = vec!["A*01:01:01".to_string()];
    let err = TypingEngine::new(&BrokenSource).run(&candidates).unwrap_err();
    assert!(matches!(err, EngineError::Evidence(_)));
}
