//! Control-flow-aware diffing of matched method pairs.
//!
//! [`instructions`] aligns two instruction sequences with an LCS pass and
//! tags the result; [`method`] orchestrates block-level matching for a
//! method pair and rewires the merged control-flow graph.

pub mod instructions;
pub mod method;

pub use instructions::{
    apply, diff_instructions, reconstruct, DiffInstruction, DiffTag, InstructionDiff,
    TaggedInstruction,
};
pub use method::{diff_method, BlockTag, MergedBlock, MethodDiff};
