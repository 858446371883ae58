//! Input IR for programs under comparison.
//!
//! Everything here is produced by an external extraction layer (disassembler,
//! bytecode parser) and is treated as read-only by the engine: matching and
//! diffing allocate their own wrapper records and never mutate these types.

use serde::{Deserialize, Serialize};

/// A single decoded instruction with pre-rendered opcode/operand text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Opcode mnemonic as rendered by the extractor (e.g. `invoke-virtual`).
    pub opcode: String,
    /// Operand text. May still contain position-dependent literals; the
    /// fingerprint layer normalizes those away.
    pub operand: String,
    /// Byte offset of the instruction within its method body.
    pub offset: u64,
    /// Encoded length in bytes.
    pub len: u32,
}

impl Instruction {
    pub fn new(
        opcode: impl Into<String>,
        operand: impl Into<String>,
        offset: u64,
        len: u32,
    ) -> Self {
        Self { opcode: opcode.into(), operand: operand.into(), offset, len }
    }
}

/// Kind of control-flow edge for a basic block successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockEdgeKind {
    Fallthrough,
    Jump,
    ConditionalJump,
    IndirectJump,
    Call,
}

/// Successor edge with target block start offset and edge classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEdge {
    pub target: u64,
    pub kind: BlockEdgeKind,
}

/// A basic block: maximal straight-line run of instructions plus its
/// successor edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicBlock {
    /// Start offset within the method body.
    pub start: u64,
    /// End offset (exclusive) within the method body.
    pub end: u64,
    pub instructions: Vec<Instruction>,
    pub successors: Vec<BlockEdge>,
}

impl BasicBlock {
    /// Total encoded length of the block's instructions, in bytes.
    pub fn code_len(&self) -> usize {
        self.instructions.iter().map(|i| i.len as usize).sum()
    }
}

/// A method with its ordered instruction list and basic-block graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    pub class_name: String,
    pub name: String,
    pub descriptor: String,
    /// All instructions in program order (the concatenation of the blocks).
    pub instructions: Vec<Instruction>,
    /// Basic blocks sorted by start offset.
    pub blocks: Vec<BasicBlock>,
}

impl Method {
    /// Structural identity: class + name + descriptor.
    pub fn id(&self) -> String {
        format!("{}->{}{}", self.class_name, self.name, self.descriptor)
    }

    /// Total encoded code length in bytes.
    pub fn code_len(&self) -> usize {
        self.instructions.iter().map(|i| i.len as usize).sum()
    }
}

/// One extracted program: its methods plus the deduplicated string table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Program {
    pub methods: Vec<Method>,
    /// Ordered, deduplicated string literals.
    pub strings: Vec<String>,
}
