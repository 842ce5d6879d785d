use super::{fingerprint, Fingerprint};
use thiserror::Error;
use tracing::*;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Tanimoto coefficient `|A ∩ B| / |A ∪ B|`.
///
/// Two empty fingerprints are identical (1.0); one empty fingerprint shares nothing (0.0).
pub fn tanimoto(a: &Fingerprint, b: &Fingerprint) -> f64 {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        _ => {}
    }
    let shared = a.intersection_count(b);
    let union = a.bit_count() + b.bit_count() - shared;
    shared as f64 / union as f64
}

/// One molecule to compare against, optionally with a stored fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: String,
    pub smiles: String,
    pub fingerprint: Option<Fingerprint>,
}

impl Candidate {
    pub fn new(id: impl Into<String>, smiles: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            smiles: smiles.into(),
            fingerprint: None,
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    /// The stored fingerprint, or one computed from the SMILES text.
    pub fn resolve_fingerprint(&self) -> Fingerprint {
        match &self.fingerprint {
            Some(fp) => fp.clone(),
            None => fingerprint(&self.smiles),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatch {
    pub id: String,
    pub smiles: String,
    pub similarity: f64,
}

fn check_threshold(threshold: f64) -> Result<f64, SearchError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(SearchError::InvalidArgument(format!(
            "similarity threshold {threshold} is outside [0, 1]"
        )))
    }
}

/// Upper bound on the Tanimoto coefficient given only the two bit counts.
fn bit_count_bound(a: usize, b: usize) -> f64 {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    if high == 0 {
        1.0
    } else {
        low as f64 / high as f64
    }
}

/// A one-to-many similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilaritySearch {
    threshold: f64,
    max_results: Option<usize>,
}

impl SimilaritySearch {
    /// A search keeping every candidate scoring at least `threshold`, which must be in [0, 1].
    pub fn new(threshold: f64) -> Result<Self, SearchError> {
        Ok(Self {
            threshold: check_threshold(threshold)?,
            max_results: None,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn max_results(&self) -> Option<usize> {
        self.max_results
    }

    pub fn set_threshold(&mut self, threshold: f64) -> Result<(), SearchError> {
        self.threshold = check_threshold(threshold)?;
        Ok(())
    }

    /// Keep at most `limit` matches. A limit of zero is rejected.
    pub fn with_max_results(mut self, limit: usize) -> Result<Self, SearchError> {
        if limit == 0 {
            return Err(SearchError::InvalidArgument(
                "result limit must be at least 1".to_string(),
            ));
        }
        self.max_results = Some(limit);
        Ok(self)
    }

    /// Score every candidate against the query SMILES and rank the ones at or above the
    /// threshold, best first. Ties keep candidate order.
    pub fn find_similar(&self, query: &str, candidates: &[Candidate]) -> Vec<SimilarityMatch> {
        let query_fp = fingerprint(query);
        let mut pruned = 0;
        let mut matches = Vec::new();

        for candidate in candidates {
            let similarity = match &candidate.fingerprint {
                Some(fp) => {
                    if bit_count_bound(query_fp.bit_count(), fp.bit_count()) < self.threshold {
                        pruned += 1;
                        continue;
                    }
                    tanimoto(&query_fp, fp)
                }
                None => tanimoto(&query_fp, &fingerprint(&candidate.smiles)),
            };
            if similarity >= self.threshold {
                matches.push(SimilarityMatch {
                    id: candidate.id.clone(),
                    smiles: candidate.smiles.clone(),
                    similarity,
                });
            }
        }

        matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        if let Some(limit) = self.max_results {
            matches.truncate(limit);
        }
        debug!(
            "Found {} of {} candidates similar to {query:?} ({pruned} pruned)",
            matches.len(),
            candidates.len()
        );
        matches
    }
}

/// Rank candidates similar to the query at or above `threshold`.
pub fn find_similar(
    query: &str,
    candidates: &[Candidate],
    threshold: f64,
) -> Result<Vec<SimilarityMatch>, SearchError> {
    Ok(SimilaritySearch::new(threshold)?.find_similar(query, candidates))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(bits: &[u32]) -> Fingerprint {
        Fingerprint::from_bits(bits.iter().copied()).unwrap()
    }

    fn candidates() -> Vec<Candidate> {
        vec![
            Candidate::new("ethanol", "CCO"),
            Candidate::new("propanol", "CCCO"),
            Candidate::new("benzene", "c1ccccc1"),
            Candidate::new("aspirin", "CC(=O)Oc1ccccc1C(=O)O"),
        ]
    }

    #[test]
    fn test_tanimoto() {
        assert_eq!(tanimoto(&fp(&[]), &fp(&[])), 1.0);
        assert_eq!(tanimoto(&fp(&[]), &fp(&[1])), 0.0);
        assert_eq!(tanimoto(&fp(&[1]), &fp(&[])), 0.0);
        assert_eq!(tanimoto(&fp(&[1, 2, 3]), &fp(&[1, 2, 3])), 1.0);
        assert_eq!(tanimoto(&fp(&[1, 2]), &fp(&[2, 3])), 1.0 / 3.0);
        assert_eq!(tanimoto(&fp(&[1, 2]), &fp(&[3, 4])), 0.0);
    }

    #[test]
    fn test_exact_match_ranks_first() -> Result<(), SearchError> {
        let matches = find_similar("CCO", &candidates(), 0.0)?;
        assert_eq!(matches.len(), 4);
        assert_eq!(matches[0].id, "ethanol");
        assert_eq!(matches[0].similarity, 1.0);
        for pair in matches.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
        Ok(())
    }

    #[test]
    fn test_threshold_monotonic() -> Result<(), SearchError> {
        let loose = find_similar("CCO", &candidates(), 0.3)?;
        let strict = find_similar("CCO", &candidates(), 0.95)?;
        assert!(strict.len() <= loose.len());
        assert!(strict.iter().all(|m| m.similarity >= 0.95));
        Ok(())
    }

    #[test]
    fn test_rejects_bad_settings() {
        assert!(matches!(
            SimilaritySearch::new(1.5),
            Err(SearchError::InvalidArgument(_))
        ));
        assert!(SimilaritySearch::new(-0.1).is_err());
        assert!(SimilaritySearch::new(f64::NAN).is_err());
        assert!(find_similar("CCO", &candidates(), 2.0).is_err());

        let mut search = SimilaritySearch::new(0.5).unwrap();
        assert!(search.set_threshold(1.01).is_err());
        assert_eq!(search.threshold(), 0.5);
        assert!(search.clone().with_max_results(0).is_err());
        assert_eq!(search.with_max_results(2).unwrap().max_results(), Some(2));
    }

    #[test]
    fn test_result_limit() -> Result<(), SearchError> {
        let search = SimilaritySearch::new(0.0)?.with_max_results(2)?;
        let matches = search.find_similar("CCO", &candidates());
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "ethanol");
        Ok(())
    }

    #[test]
    fn test_precomputed_fingerprints_are_used() -> Result<(), SearchError> {
        // a stored fingerprint wins over the text
        let stored = fingerprint("CCO");
        let candidates = vec![Candidate::new("relabelled", "c1ccccc1").with_fingerprint(stored)];
        let matches = find_similar("CCO", &candidates, 0.9)?;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].similarity, 1.0);
        Ok(())
    }

    #[test]
    fn test_bit_count_pruning() -> Result<(), SearchError> {
        let query_bits = fingerprint("CCO").bit_count();
        // far larger than the query, so the bound is well under the threshold
        let big = Fingerprint::from_bits(0..(query_bits as u32 * 4)).unwrap();
        let candidates = vec![Candidate::new("big", "").with_fingerprint(big)];
        assert!(find_similar("CCO", &candidates, 0.5)?.is_empty());
        assert_eq!(find_similar("CCO", &candidates, 0.0)?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_bound() {
        assert_eq!(bit_count_bound(0, 0), 1.0);
        assert_eq!(bit_count_bound(2, 4), 0.5);
        assert_eq!(bit_count_bound(4, 2), 0.5);
    }
}
