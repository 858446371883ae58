//! LCS-based alignment of two instruction sequences.
//!
//! Both sequences are tokenized through one shared dictionary keyed by
//! normalized instruction text, aligned with the standard LCS table, and the
//! divergences recorded as ordered add/remove lists. The backtrack is
//! iterative; long straight-line blocks must not be limited by recursion
//! depth.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::fingerprint::normalized_text;
use crate::model::Instruction;

/// Tag attached to each instruction of a reconstructed, aligned sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffTag {
    Orig,
    Add,
    Remove,
}

/// One divergent instruction: its sequence position, byte offset and an
/// owned copy of the instruction record. The original is never touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffInstruction {
    /// Index within its source sequence (Y for additions, X for removals).
    pub position: usize,
    /// Byte offset of the instruction within its method body.
    pub offset: u64,
    pub instruction: Instruction,
}

/// Alignment result: instructions present only in Y (`added`) or only in X
/// (`removed`), both ordered by position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstructionDiff {
    pub added: Vec<DiffInstruction>,
    pub removed: Vec<DiffInstruction>,
}

impl InstructionDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// One entry of a reconstructed, tagged instruction sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedInstruction {
    pub tag: DiffTag,
    pub position: usize,
    pub offset: u64,
    pub instruction: Instruction,
}

/// Shared token dictionary: each distinct normalized instruction text maps
/// to one synthetic token, valid across both sequences.
#[derive(Debug, Default)]
struct TokenTable {
    tokens: HashMap<String, u32>,
}

impl TokenTable {
    fn tokenize(&mut self, instructions: &[Instruction]) -> Vec<u32> {
        instructions
            .iter()
            .map(|ins| {
                let next = self.tokens.len() as u32;
                *self.tokens.entry(normalized_text(ins)).or_insert(next)
            })
            .collect()
    }
}

fn lcs_table(x: &[u32], y: &[u32]) -> Vec<Vec<u32>> {
    let (m, n) = (x.len(), y.len());
    let mut table = vec![vec![0u32; n + 1]; m + 1];
    for i in 1..=m {
        for j in 1..=n {
            table[i][j] = if x[i - 1] == y[j - 1] {
                table[i - 1][j - 1] + 1
            } else {
                table[i][j - 1].max(table[i - 1][j])
            };
        }
    }
    table
}

/// Align `x` against `y` and record the divergences.
///
/// The backtrack walks the LCS table from the end. On divergence the current
/// Y-token is preferred as an insertion when the table values tie, so the
/// classification is deterministically biased toward "added".
pub fn diff_instructions(x: &[Instruction], y: &[Instruction]) -> InstructionDiff {
    let mut dictionary = TokenTable::default();
    let tx = dictionary.tokenize(x);
    let ty = dictionary.tokenize(y);
    let table = lcs_table(&tx, &ty);

    let mut added = Vec::new();
    let mut removed = Vec::new();
    let (mut i, mut j) = (tx.len(), ty.len());
    while i > 0 || j > 0 {
        if i > 0 && j > 0 && tx[i - 1] == ty[j - 1] {
            i -= 1;
            j -= 1;
        } else if j > 0 && (i == 0 || table[i][j - 1] >= table[i - 1][j]) {
            added.push(DiffInstruction {
                position: j - 1,
                offset: y[j - 1].offset,
                instruction: y[j - 1].clone(),
            });
            j -= 1;
        } else {
            removed.push(DiffInstruction {
                position: i - 1,
                offset: x[i - 1].offset,
                instruction: x[i - 1].clone(),
            });
            i -= 1;
        }
    }
    added.reverse();
    removed.reverse();
    InstructionDiff { added, removed }
}

/// Merge `x` and an alignment into one tagged sequence.
///
/// Walks X's positions in order: additions recorded at a position are
/// spliced in first, then a removal recorded there (the removed instruction
/// is retained for display), otherwise the original instruction is emitted.
/// Trailing entries past the shorter sequence's end are drained at the end.
pub fn reconstruct(x: &[Instruction], diff: &InstructionDiff) -> Vec<TaggedInstruction> {
    let mut by_add: HashMap<usize, &DiffInstruction> =
        diff.added.iter().map(|d| (d.position, d)).collect();
    let mut by_rm: HashMap<usize, &DiffInstruction> =
        diff.removed.iter().map(|d| (d.position, d)).collect();

    let mut out = Vec::new();
    let mut pos = 0usize;
    for ins in x {
        if let Some(add) = by_add.remove(&pos) {
            out.push(TaggedInstruction {
                tag: DiffTag::Add,
                position: add.position,
                offset: add.offset,
                instruction: add.instruction.clone(),
            });
        }
        if let Some(rm) = by_rm.remove(&pos) {
            out.push(TaggedInstruction {
                tag: DiffTag::Remove,
                position: rm.position,
                offset: rm.offset,
                instruction: rm.instruction.clone(),
            });
        } else {
            out.push(TaggedInstruction {
                tag: DiffTag::Orig,
                position: pos,
                offset: ins.offset,
                instruction: ins.clone(),
            });
        }
        pos += 1;
    }

    let last = by_add.keys().chain(by_rm.keys()).copied().max();
    if let Some(last) = last {
        while pos <= last {
            if let Some(add) = by_add.remove(&pos) {
                out.push(TaggedInstruction {
                    tag: DiffTag::Add,
                    position: add.position,
                    offset: add.offset,
                    instruction: add.instruction.clone(),
                });
            }
            if let Some(rm) = by_rm.remove(&pos) {
                out.push(TaggedInstruction {
                    tag: DiffTag::Remove,
                    position: rm.position,
                    offset: rm.offset,
                    instruction: rm.instruction.clone(),
                });
            }
            pos += 1;
        }
    }
    out
}

/// Apply an alignment to `x`: drop the removals, then splice the additions
/// in at their recorded positions. The result matches Y token-for-token.
pub fn apply(x: &[Instruction], diff: &InstructionDiff) -> Vec<Instruction> {
    let removed: std::collections::HashSet<usize> =
        diff.removed.iter().map(|d| d.position).collect();
    let mut out: Vec<Instruction> = x
        .iter()
        .enumerate()
        .filter(|(i, _)| !removed.contains(i))
        .map(|(_, ins)| ins.clone())
        .collect();
    for add in &diff.added {
        let at = add.position.min(out.len());
        out.insert(at, add.instruction.clone());
    }
    out
}
