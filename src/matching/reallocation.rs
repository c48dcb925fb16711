use std::collections::HashMap;

use crate::core::types::{ReadPairScore, ReallocatedScore, Winner};

/// Stage-one rows belonging to the winning allele of their gene.
///
/// This is the table [`reallocate`] compares every candidate against.
#[must_use]
pub fn winner_scores(scores: &[ReadPairScore], winners: &[Winner]) -> Vec<ReadPairScore> {
    let winning: HashMap<&str, &str> = winners
        .iter()
        .map(|w| (w.gene.as_str(), w.allele.as_str()))
        .collect();

    scores
        .iter()
        .filter(|s| winning.get(s.gene.as_str()) == Some(&s.allele.as_str()))
        .cloned()
        .collect()
}

/// Re-weight every candidate of `gene` against the first-copy winner.
///
/// Each read pair keeps `score * score / (score + winner)`, where `winner` is the winning
/// allele's score for the same read pair (0 if it has none). Read pairs the winner explains
/// well are mostly handed to the winner; pairs it cannot explain stay with the candidate.
/// The winner itself is rescored too (factor 0.5), so it may win the second copy as well.
#[must_use]
pub fn reallocate(
    gene: &str,
    scores: &[ReadPairScore],
    winner_scores: &[ReadPairScore],
) -> Vec<ReallocatedScore> {
    let by_qname: HashMap<&str, f64> = winner_scores
        .iter()
        .filter(|w| w.gene == gene)
        .map(|w| (w.qname.as_str(), w.score))
        .collect();

    scores
        .iter()
        .filter(|s| s.gene == gene)
        .map(|s| {
            let winner_score = by_qname.get(s.qname.as_str()).copied().unwrap_or(0.0);
            let denominator = s.score + winner_score;
            let factor = if denominator == 0.0 {
                0.0
            } else {
                s.score / denominator
            };
            ReallocatedScore {
                qname: s.qname.clone(),
                allele: s.allele.clone(),
                gene: s.gene.clone(),
                score: s.score * factor,
                original_score: s.score,
                winner_score,
                factor,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(qname: &str, allele: &str, gene: &str, score: f64) -> ReadPairScore {
        ReadPairScore::new(qname, allele, gene, score)
    }

    #[test]
    fn test_winner_alone_is_halved() {
        let scores = vec![
            s("r1", "A*01:01:01", "A", 10.0),
            s("r2", "A*01:01:01", "A", 6.0),
            s("r3", "A*01:01:01", "A", 3.5),
        ];
        let realloc = reallocate("A", &scores, &scores);
        assert_eq!(realloc.len(), 3);
        for (r, orig) in realloc.iter().zip(&scores) {
            assert!((r.factor - 0.5).abs() < 1e-12);
            assert!((r.score - orig.score / 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_missing_winner_read_keeps_full_score() {
        let scores = vec![
            s("r1", "A*01:01:01", "A", 10.0),
            s("r1", "A*02:01:01", "A", 2.0),
            s("r2", "A*02:01:01", "A", 5.0),
        ];
        let winners = vec![Winner {
            gene: "A".to_string(),
            allele: "A*01:01:01".to_string(),
            total_score: 10.0,
        }];
        let ws = winner_scores(&scores, &winners);
        assert_eq!(ws.len(), 1);

        let realloc = reallocate("A", &scores, &ws);
        let r1 = realloc
            .iter()
            .find(|r| r.qname == "r1" && r.allele == "A*02:01:01")
            .unwrap();
        assert!((r1.factor - 2.0 / 12.0).abs() < 1e-12);
        assert!((r1.score - 2.0 * 2.0 / 12.0).abs() < 1e-12);

        let r2 = realloc.iter().find(|r| r.qname == "r2").unwrap();
        assert!((r2.winner_score - 0.0).abs() < 1e-12);
        assert!((r2.factor - 1.0).abs() < 1e-12);
        assert!((r2.score - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_restricted_to_gene() {
        let scores = vec![
            s("r1", "A*01:01:01", "A", 10.0),
            s("r1", "B*07:02:01", "B", 8.0),
        ];
        let realloc = reallocate("B", &scores, &scores[..1]);
        assert_eq!(realloc.len(), 1);
        assert_eq!(realloc[0].allele, "B*07:02:01");
        assert!((realloc[0].factor - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_denominator() {
        let scores = vec![s("r1", "A*01:01:01", "A", 0.0)];
        let realloc = reallocate("A", &scores, &scores);
        assert!((realloc[0].score - 0.0).abs() < 1e-12);
        assert!((realloc[0].factor - 0.0).abs() < 1e-12);
    }
}
