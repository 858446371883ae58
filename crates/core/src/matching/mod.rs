//! Generic set-to-set element matcher.
//!
//! Given two ordered collections of same-kind elements, classifies pairs as
//! identical (equal content hash), similar (best available oracle score),
//! new, deleted, or skipped. The resulting matches always form a partial
//! bijection: no element appears in more than one pair.

use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fingerprint::{ElementPolicy, Fingerprint};
use crate::similarity::{Oracle, OracleResult};

/// Skip predicate and similarity boundary for one matching pass.
///
/// The similar-versus-new boundary is deliberately explicit configuration:
/// only a score of exactly `0.0` (or an equal content hash) guarantees an
/// identical match.
#[derive(Debug, Clone, Default)]
pub struct MatchConfig {
    /// Elements with content shorter than this are skipped, not matched.
    /// Skipped is distinct from deleted for reporting purposes.
    pub min_len: usize,
    /// Elements whose identity matches this pattern are skipped.
    pub exclude_name: Option<Regex>,
    /// Reject similar-candidates scoring strictly above this value. `None`
    /// accepts every best-available pairing.
    pub threshold: Option<f64>,
}

impl MatchConfig {
    pub fn with_min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len;
        self
    }

    pub fn with_exclude_name(mut self, pattern: Regex) -> Self {
        self.exclude_name = Some(pattern);
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }
}

/// One approximate match with its oracle score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredPair {
    /// Index into the A-side collection.
    pub a: usize,
    /// Index into the B-side collection.
    pub b: usize,
    /// Distance score in `[0, 1]`; lower is more similar.
    pub score: f64,
}

/// Outcome of one matching pass, as indices into the two input slices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Pairs with equal content hashes (score 0).
    pub identical: Vec<(usize, usize)>,
    /// Approximate pairs with their scores, best-first.
    pub similar: Vec<ScoredPair>,
    /// B-side elements with no counterpart in A.
    pub new: Vec<usize>,
    /// A-side elements with no counterpart in B.
    pub deleted: Vec<usize>,
    /// A-side elements excluded by the skip predicate.
    pub skipped_a: Vec<usize>,
    /// B-side elements excluded by the skip predicate.
    pub skipped_b: Vec<usize>,
}

impl MatchResult {
    /// Total number of matched pairs (identical plus similar).
    pub fn matched(&self) -> usize {
        self.identical.len() + self.similar.len()
    }

    /// Mean distance over all matched pairs; identical pairs count as `0.0`.
    /// `None` when nothing matched.
    pub fn mean_score(&self) -> Option<f64> {
        let matched = self.matched();
        if matched == 0 {
            return None;
        }
        let total: f64 = self.similar.iter().map(|p| p.score).sum();
        Some(total / matched as f64)
    }
}

fn should_skip<P: ElementPolicy>(policy: &P, config: &MatchConfig, elem: &P::Elem) -> bool {
    if policy.content_len(elem) < config.min_len {
        return true;
    }
    if let Some(pattern) = &config.exclude_name {
        if pattern.is_match(&policy.identity(elem)) {
            return true;
        }
    }
    false
}

/// Match two collections of same-kind elements.
///
/// Steps: skip filter, exact content-hash pass, parallel scoring of the
/// remaining cross product, then deterministic greedy assignment over the
/// candidates sorted by (score, b index, a index). The assignment is
/// independent of thread scheduling because all scores are merged before it
/// runs.
pub fn match_elements<P: ElementPolicy>(
    policy: &P,
    oracle: &Oracle,
    a: &[P::Elem],
    b: &[P::Elem],
    config: &MatchConfig,
) -> OracleResult<MatchResult> {
    let mut result = MatchResult::default();

    let mut live_a: Vec<usize> = Vec::new();
    for (i, elem) in a.iter().enumerate() {
        if should_skip(policy, config, elem) {
            result.skipped_a.push(i);
        } else {
            live_a.push(i);
        }
    }
    let mut live_b: Vec<usize> = Vec::new();
    for (i, elem) in b.iter().enumerate() {
        if should_skip(policy, config, elem) {
            result.skipped_b.push(i);
        } else {
            live_b.push(i);
        }
    }

    let prints_a: Vec<Fingerprint> = live_a.iter().map(|&i| policy.fingerprint(&a[i])).collect();
    let prints_b: Vec<Fingerprint> = live_b.iter().map(|&i| policy.fingerprint(&b[i])).collect();

    let mut used_a = vec![false; live_a.len()];
    let mut used_b = vec![false; live_b.len()];

    // Exact pass: equal 128-bit content hashes match without oracle calls.
    for (ia, fa) in prints_a.iter().enumerate() {
        for (ib, fb) in prints_b.iter().enumerate() {
            if !used_b[ib] && fa.hash == fb.hash {
                result.identical.push((live_a[ia], live_b[ib]));
                used_a[ia] = true;
                used_b[ib] = true;
                break;
            }
        }
    }

    // Approximate pass: score every remaining (a, b) pair. This is the only
    // expensive step; each score is pure, so the cross product runs in
    // parallel and is merged before assignment.
    let open_a: Vec<usize> = (0..live_a.len()).filter(|&i| !used_a[i]).collect();
    let open_b: Vec<usize> = (0..live_b.len()).filter(|&i| !used_b[i]).collect();
    let mut candidates: Vec<ScoredPair> = open_a
        .par_iter()
        .flat_map_iter(|&ia| open_b.iter().map(move |&ib| (ia, ib)))
        .map(|(ia, ib)| {
            let score = policy.similarity(oracle, &prints_a[ia], &prints_b[ib])?;
            Ok(ScoredPair { a: ia, b: ib, score })
        })
        .collect::<OracleResult<Vec<_>>>()?;

    candidates.sort_by(|x, y| {
        x.score.total_cmp(&y.score).then(x.b.cmp(&y.b)).then(x.a.cmp(&y.a))
    });

    for pair in candidates {
        if used_a[pair.a] || used_b[pair.b] {
            continue;
        }
        if let Some(threshold) = config.threshold {
            if pair.score > threshold {
                continue;
            }
        }
        used_a[pair.a] = true;
        used_b[pair.b] = true;
        result.similar.push(ScoredPair {
            a: live_a[pair.a],
            b: live_b[pair.b],
            score: pair.score,
        });
    }

    result.deleted.extend((0..live_a.len()).filter(|&i| !used_a[i]).map(|i| live_a[i]));
    result.new.extend((0..live_b.len()).filter(|&i| !used_b[i]).map(|i| live_b[i]));

    debug!(
        identical = result.identical.len(),
        similar = result.similar.len(),
        new = result.new.len(),
        deleted = result.deleted.len(),
        skipped = result.skipped_a.len() + result.skipped_b.len(),
        "matching pass complete"
    );

    Ok(result)
}
