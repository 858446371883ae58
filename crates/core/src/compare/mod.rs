//! Whole-program comparison: method- and string-level matching plus block
//! diffs for every similar method pair.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::diff::{diff_method, MethodDiff};
use crate::fingerprint::{MethodPolicy, StringPolicy};
use crate::matching::{match_elements, MatchConfig, MatchResult};
use crate::model::Program;
use crate::similarity::{Oracle, OracleResult};

/// Per-granularity matching configuration for one comparison run.
#[derive(Debug, Clone, Default)]
pub struct CompareConfig {
    pub methods: MatchConfig,
    pub strings: MatchConfig,
    pub blocks: MatchConfig,
    /// Score methods over their structural control-flow signatures when
    /// available instead of the plain instruction buffer.
    pub use_structural: bool,
}

/// Block-level diff of one similar method pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDiffEntry {
    /// Method index in program A.
    pub a: usize,
    /// Method index in program B.
    pub b: usize,
    /// Method-level distance score.
    pub score: f64,
    pub diff: MethodDiff,
}

/// Result of comparing two programs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub methods: MatchResult,
    pub strings: MatchResult,
    /// One entry per similar method pair; identical pairs carry no diff.
    pub diffs: Vec<MethodDiffEntry>,
    /// Mean method-level distance over matched pairs: `0.0` when everything
    /// matched exactly, `1.0` when nothing matched at all.
    pub score: f64,
}

/// Compare two programs end to end.
///
/// A fatal oracle error aborts the whole run; empty programs and filtered
/// elements degrade into the result sets instead.
pub fn compare_programs(
    oracle: &Oracle,
    a: &Program,
    b: &Program,
    config: &CompareConfig,
) -> OracleResult<Comparison> {
    let method_policy = MethodPolicy { use_structural: config.use_structural };
    let methods = match_elements(&method_policy, oracle, &a.methods, &b.methods, &config.methods)?;
    let strings = match_elements(&StringPolicy, oracle, &a.strings, &b.strings, &config.strings)?;

    let mut diffs = Vec::with_capacity(methods.similar.len());
    for pair in &methods.similar {
        let diff = diff_method(oracle, &a.methods[pair.a], &b.methods[pair.b], &config.blocks)?;
        diffs.push(MethodDiffEntry { a: pair.a, b: pair.b, score: pair.score, diff });
    }

    let score = if a.methods.is_empty() && b.methods.is_empty() {
        0.0
    } else {
        methods.mean_score().unwrap_or(1.0)
    };

    debug!(
        matched = methods.matched(),
        diffed = diffs.len(),
        score,
        "program comparison complete"
    );

    Ok(Comparison { methods, strings, diffs, score })
}
