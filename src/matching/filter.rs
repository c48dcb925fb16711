use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::core::evidence::AlignmentEvidence;

/// Keep alignments fit for scoring against one allele.
///
/// A record survives when it is a proper pair, has no indel events and at most
/// `min_ecnt` mismatch events. Afterwards only read names with exactly two survivors
/// (both mates) are kept; a lone mate drops the whole pair.
#[must_use]
pub fn filter_evidence(records: Vec<AlignmentEvidence>, min_ecnt: u32) -> Vec<AlignmentEvidence> {
    let total = records.len();

    let accepted: Vec<AlignmentEvidence> = records
        .into_iter()
        .filter(|r| r.is_proper_pair && r.indel_events == 0 && r.mismatch_events <= min_ecnt)
        .collect();

    let mut mates: HashMap<&str, usize> = HashMap::new();
    for record in &accepted {
        *mates.entry(record.qname.as_str()).or_insert(0) += 1;
    }
    let paired: HashSet<String> = mates
        .into_iter()
        .filter(|(_, n)| *n == 2)
        .map(|(qname, _)| qname.to_string())
        .collect();

    let kept: Vec<AlignmentEvidence> = accepted
        .into_iter()
        .filter(|r| paired.contains(&r.qname))
        .collect();

    debug!(total, kept = kept.len(), pairs = paired.len(), "Filtered alignments");
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(qname: &str, proper: bool, indels: u32, mismatches: u32) -> AlignmentEvidence {
        AlignmentEvidence {
            qname: qname.to_string(),
            allele: "A*01:01:01".to_string(),
            base_qualities: vec![30; 4],
            md_tokens: vec![],
            is_proper_pair: proper,
            indel_events: indels,
            mismatch_events: mismatches,
        }
    }

    fn count(records: &[AlignmentEvidence], qname: &str) -> usize {
        records.iter().filter(|r| r.qname == qname).count()
    }

    #[test]
    fn test_keeps_complete_pairs() {
        let records = vec![record("r1", true, 0, 0), record("r1", true, 0, 1)];
        let kept = filter_evidence(records, 999);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_drops_pair_when_one_mate_fails() {
        let records = vec![
            record("improper", true, 0, 0),
            record("improper", false, 0, 0),
            record("indel", true, 1, 0),
            record("indel", true, 0, 0),
            record("mismatch", true, 0, 3),
            record("mismatch", true, 0, 2),
            record("ok", true, 0, 2),
            record("ok", true, 0, 2),
        ];
        let kept = filter_evidence(records, 2);
        assert_eq!(kept.len(), 2);
        assert_eq!(count(&kept, "ok"), 2);
    }

    #[test]
    fn test_drops_lone_mates_and_extra_records() {
        let records = vec![
            record("lone", true, 0, 0),
            record("triple", true, 0, 0),
            record("triple", true, 0, 0),
            record("triple", true, 0, 0),
            record("pair", true, 0, 0),
            record("pair", true, 0, 0),
        ];
        let kept = filter_evidence(records, 999);
        assert_eq!(count(&kept, "lone"), 0);
        assert_eq!(count(&kept, "triple"), 0);
        assert_eq!(count(&kept, "pair"), 2);
    }

    #[test]
    fn test_every_surviving_pair_appears_twice() {
        let mut records = Vec::new();
        for i in 0..20u32 {
            let qname = format!("r{i}");
            records.push(record(&qname, true, 0, i % 3));
            records.push(record(&qname, i % 4 != 0, i % 5 / 4, 0));
            if i % 7 == 0 {
                records.push(record(&qname, true, 0, 0));
            }
        }
        let kept = filter_evidence(records, 1);
        assert!(!kept.is_empty());
        for r in &kept {
            assert_eq!(count(&kept, &r.qname), 2, "{}", r.qname);
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(filter_evidence(vec![], 999).is_empty());
    }
}
