//! Block-level diffing of one matched method pair.
//!
//! Runs the matching engine at basic-block granularity, aligns every
//! similar block pair at instruction level, and assembles a merged,
//! offset-sorted block list whose successor edges reflect the post-diff
//! topology. Original blocks are never mutated; changed blocks are
//! represented by freshly allocated wrapper nodes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::diff::instructions::{diff_instructions, reconstruct, TaggedInstruction};
use crate::fingerprint::BlockPolicy;
use crate::matching::{match_elements, MatchConfig, MatchResult};
use crate::model::{BasicBlock, BlockEdge, Method};
use crate::similarity::{Oracle, OracleResult};

/// Classification of a block in the merged view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockTag {
    /// Unchanged block from the source method.
    Orig,
    /// Matched pair whose content differs; carries the instruction alignment.
    Diff,
    /// Block present only in the target method.
    New,
}

/// One node of the merged block list. Exactly one tag per block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MergedBlock {
    Orig {
        block: BasicBlock,
    },
    Diff {
        source: BasicBlock,
        target: BasicBlock,
        score: f64,
        /// Instruction-level alignment of source against target.
        instructions: Vec<TaggedInstruction>,
        /// Target-side successors, redirected into the merged graph.
        successors: Vec<BlockEdge>,
    },
    New {
        block: BasicBlock,
        /// Successors redirected into the merged graph.
        successors: Vec<BlockEdge>,
    },
}

impl MergedBlock {
    pub fn tag(&self) -> BlockTag {
        match self {
            MergedBlock::Orig { .. } => BlockTag::Orig,
            MergedBlock::Diff { .. } => BlockTag::Diff,
            MergedBlock::New { .. } => BlockTag::New,
        }
    }

    /// Start offset the merged list is sorted by.
    pub fn start(&self) -> u64 {
        match self {
            MergedBlock::Orig { block } => block.start,
            MergedBlock::Diff { source, .. } => source.start,
            MergedBlock::New { block, .. } => block.start,
        }
    }
}

/// Rendered diff view of one method pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodDiff {
    /// All blocks of the merged graph, sorted by start offset.
    pub blocks: Vec<MergedBlock>,
    /// The block-level matching outcome the view was assembled from.
    pub block_match: MatchResult,
}

impl MethodDiff {
    /// Number of blocks reclassified as [`BlockTag::Diff`].
    pub fn diff_blocks(&self) -> usize {
        self.blocks.iter().filter(|b| b.tag() == BlockTag::Diff).count()
    }

    /// Number of blocks reclassified as [`BlockTag::New`].
    pub fn new_blocks(&self) -> usize {
        self.blocks.iter().filter(|b| b.tag() == BlockTag::New).count()
    }
}

fn remap_edges(edges: &[BlockEdge], assoc: &HashMap<u64, u64>) -> Vec<BlockEdge> {
    edges
        .iter()
        .map(|e| BlockEdge { target: *assoc.get(&e.target).unwrap_or(&e.target), kind: e.kind })
        .collect()
}

/// Diff `source` against `target` at block granularity.
///
/// A method with no basic blocks on either side yields a well-defined
/// result (no diff/new blocks) without error. Blocks matched with score 0
/// are never passed to the instruction differ.
pub fn diff_method(
    oracle: &Oracle,
    source: &Method,
    target: &Method,
    config: &MatchConfig,
) -> OracleResult<MethodDiff> {
    let block_match =
        match_elements(&BlockPolicy, oracle, &source.blocks, &target.blocks, config)?;

    // Association from target-side block starts to the start offsets their
    // merged counterparts carry: matched targets collapse onto the source
    // block, unmatched targets stand for themselves.
    let mut assoc: HashMap<u64, u64> = HashMap::new();
    for &(ia, ib) in &block_match.identical {
        assoc.insert(target.blocks[ib].start, source.blocks[ia].start);
    }
    for pair in &block_match.similar {
        assoc.insert(target.blocks[pair.b].start, source.blocks[pair.a].start);
    }
    for &ib in &block_match.new {
        assoc.insert(target.blocks[ib].start, target.blocks[ib].start);
    }

    let diff_of: HashMap<usize, (usize, f64)> =
        block_match.similar.iter().map(|p| (p.a, (p.b, p.score))).collect();

    let mut blocks: Vec<MergedBlock> = Vec::with_capacity(source.blocks.len());
    for (ia, block) in source.blocks.iter().enumerate() {
        if let Some(&(ib, score)) = diff_of.get(&ia) {
            let target_block = &target.blocks[ib];
            let alignment = diff_instructions(&block.instructions, &target_block.instructions);
            blocks.push(MergedBlock::Diff {
                source: block.clone(),
                target: target_block.clone(),
                score,
                instructions: reconstruct(&block.instructions, &alignment),
                successors: remap_edges(&target_block.successors, &assoc),
            });
        } else {
            blocks.push(MergedBlock::Orig { block: block.clone() });
        }
    }
    for &ib in &block_match.new {
        let block = &target.blocks[ib];
        blocks.push(MergedBlock::New {
            block: block.clone(),
            successors: remap_edges(&block.successors, &assoc),
        });
    }

    blocks.sort_by_key(|b| b.start());

    Ok(MethodDiff { blocks, block_match })
}
