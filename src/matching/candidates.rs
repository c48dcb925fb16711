use std::collections::HashSet;

use tracing::{debug, info};

use crate::core::allele::{reduce_resolution, AlleleError, AllelePattern, PatternConfig};

/// Resolution at which population frequency tables name their alleles
pub const POPULATION_RESOLUTION: i32 = 2;

/// Restrict candidate alleles to those seen in a population.
///
/// Each allele is reduced to two fields (`A*02:01:01:03` becomes `A*02:01`) and kept when
/// the reduced form is in `accepted`. Alleles that do not follow the grammar are dropped.
/// Input order is preserved.
///
/// # Errors
///
/// Returns `AlleleError::InvalidPatternConfig` if the two-field grammar cannot be built.
pub fn select_candidates(
    alleles: &[String],
    accepted: &[String],
) -> Result<Vec<String>, AlleleError> {
    let pattern =
        AllelePattern::build(&PatternConfig::default().with_resolution(POPULATION_RESOLUTION))?;
    let accepted: HashSet<&str> = accepted.iter().map(String::as_str).collect();

    let selected: Vec<String> = alleles
        .iter()
        .filter(|allele| match reduce_resolution(allele, &pattern) {
            Ok(reduced) => accepted.contains(reduced.allele.as_str()),
            Err(e) => {
                debug!(error = %e, "Dropping candidate");
                false
            }
        })
        .cloned()
        .collect();

    info!(
        total = alleles.len(),
        selected = selected.len(),
        "Selected candidate alleles present in population"
    );
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_select_candidates() {
        let alleles = strings(&[
            "hla_a_01_01_01_01",
            "hla_a_01_02",
            "hla_b_07_02_01",
            "hla_b_07_02",
            "not_an_allele",
        ]);
        let accepted = strings(&["hla_a_01_01", "hla_b_07_02"]);
        let selected = select_candidates(&alleles, &accepted).unwrap();
        assert_eq!(
            selected,
            strings(&["hla_a_01_01_01_01", "hla_b_07_02_01", "hla_b_07_02"])
        );
    }

    #[test]
    fn test_select_candidates_none_accepted() {
        let alleles = strings(&["A*01:01:01"]);
        assert!(select_candidates(&alleles, &[]).unwrap().is_empty());
    }
}
