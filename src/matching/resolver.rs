use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::core::types::{round_total, AlleleScore, GeneTotal, Winner};

/// Sum read-pair scores per (allele, gene), rounding each total.
///
/// Totals are returned ordered by gene, then allele.
#[must_use]
pub fn gene_totals<S: AlleleScore>(scores: &[S]) -> Vec<GeneTotal> {
    let mut sums: BTreeMap<(&str, &str), f64> = BTreeMap::new();
    for s in scores {
        *sums.entry((s.gene(), s.allele())).or_insert(0.0) += s.score();
    }

    sums.into_iter()
        .map(|((gene, allele), sum)| GeneTotal {
            gene: gene.to_string(),
            allele: allele.to_string(),
            total_score: round_total(sum),
        })
        .collect()
}

/// Pick one winner per gene: the allele with the highest rounded total.
///
/// On an exact tie the lexicographically smallest allele wins, e.g. `hla_a_26_01_01`
/// over `hla_a_26_01_24`. A NaN total ranks below every number. Winners are returned
/// ordered by gene.
#[must_use]
pub fn resolve_winners<S: AlleleScore>(scores: &[S]) -> Vec<Winner> {
    let mut best: BTreeMap<String, GeneTotal> = BTreeMap::new();
    let mut ties: HashMap<String, usize> = HashMap::new();

    // Totals arrive sorted by allele within each gene, so the first allele seen at the
    // maximum is already the smallest one.
    for total in gene_totals(scores) {
        match best.get(&total.gene) {
            Some(current) if rank(total.total_score) < rank(current.total_score) => {}
            Some(current) if rank(total.total_score) == rank(current.total_score) => {
                *ties.entry(total.gene.clone()).or_insert(1) += 1;
            }
            _ => {
                ties.remove(&total.gene);
                best.insert(total.gene.clone(), total);
            }
        }
    }

    for (gene, n) in &ties {
        debug!(gene = %gene, alleles = n, "Tied alleles at maximum score");
    }

    best.into_values().map(Winner::from).collect()
}

fn rank(total: f64) -> f64 {
    if total.is_nan() {
        f64::NEG_INFINITY
    } else {
        total
    }
}
