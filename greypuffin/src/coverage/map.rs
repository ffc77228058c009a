use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::coverage::{PathId, Signature};

/// Tally of signatures for exactly one execution.
#[derive(Debug, Default, Clone)]
pub struct CoverageMap {
    hits: HashMap<Signature, u64>,
}

impl CoverageMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, signature: Signature) {
        *self.hits.entry(signature).or_insert(0) += 1;
    }

    pub fn snapshot(&self) -> CoverageFact {
        CoverageFact {
            hits: self.hits.iter().map(|(sig, count)| (*sig, *count)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Read-only coverage of one execution: signature to occurrence count.
///
/// Signatures are kept sorted, so two facts over the same signatures serialize identically and
/// share a [`PathId`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageFact {
    hits: BTreeMap<Signature, u64>,
}

impl CoverageFact {
    pub fn signatures(&self) -> impl Iterator<Item = &Signature> {
        self.hits.keys()
    }

    pub fn hits(&self) -> &BTreeMap<Signature, u64> {
        &self.hits
    }

    pub fn count(&self, signature: &Signature) -> u64 {
        self.hits.get(signature).copied().unwrap_or(0)
    }

    pub fn contains(&self, signature: &Signature) -> bool {
        self.hits.contains_key(signature)
    }

    /// Number of distinct signatures
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Number of recorded steps
    pub fn total_hits(&self) -> u64 {
        self.hits.values().sum()
    }

    pub fn is_disjoint(&self, other: &CoverageFact) -> bool {
        self.signatures().all(|signature| !other.contains(signature))
    }

    /// Signatures of this fact which are absent from `seen`
    pub fn unseen<'a>(
        &'a self,
        seen: &'a HashSet<Signature>,
    ) -> impl Iterator<Item = &'a Signature> + 'a {
        self.signatures().filter(move |signature| !seen.contains(signature))
    }

    pub fn path_id(&self) -> PathId {
        PathId::of_sorted(self.hits.keys())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::StepLocation;

    fn sig(line: u32) -> Signature {
        Signature::of(&[StepLocation::new("f", line)])
    }

    #[test]
    fn test_record_counts_occurrences() {
        let mut map = CoverageMap::new();
        map.record(sig(1));
        map.record(sig(1));
        map.record(sig(2));

        let fact = map.snapshot();
        assert_eq!(fact.count(&sig(1)), 2);
        assert_eq!(fact.count(&sig(2)), 1);
        assert_eq!(fact.count(&sig(3)), 0);
        assert_eq!(fact.len(), 2);
        assert_eq!(fact.total_hits(), 3);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut map = CoverageMap::new();
        map.record(sig(1));
        let fact = map.snapshot();

        map.record(sig(2));
        assert!(!fact.contains(&sig(2)));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_path_id_ignores_counts_and_insertion_order() {
        let mut a = CoverageMap::new();
        a.record(sig(1));
        a.record(sig(2));

        let mut b = CoverageMap::new();
        b.record(sig(2));
        b.record(sig(2));
        b.record(sig(1));

        assert_eq!(a.snapshot().path_id(), b.snapshot().path_id());
        assert_ne!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn test_unseen_and_disjoint() {
        let mut a = CoverageMap::new();
        a.record(sig(1));
        a.record(sig(2));
        let fact = a.snapshot();

        let seen: HashSet<Signature> = [sig(1)].into_iter().collect();
        assert_eq!(fact.unseen(&seen).copied().collect::<Vec<_>>(), vec![sig(2)]);

        let mut b = CoverageMap::new();
        b.record(sig(3));
        assert!(fact.is_disjoint(&b.snapshot()));
        assert!(!fact.is_disjoint(&fact));
    }

    #[test]
    fn test_fact_round_trips_through_json() {
        let mut map = CoverageMap::new();
        map.record(sig(7));
        let fact = map.snapshot();

        let json = serde_json::to_string(&fact).unwrap();
        let back: CoverageFact = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fact);
    }
}
