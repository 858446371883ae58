//! Fingerprints: canonical byte buffers plus fast content hashes.
//!
//! Each element kind (method, basic block, string literal) defines how its
//! semantic content is rendered into a canonical buffer. The 128-bit content
//! hash gives an exact-duplicate test that avoids oracle calls entirely; the
//! entropy value is descriptive and exposed for reporting.

use std::sync::OnceLock;

use regex::Regex;
use xxhash_rust::xxh3::xxh3_128;

use crate::model::{BasicBlock, Instruction, Method};
use crate::similarity::{entropy, Oracle, OracleResult};

/// Immutable fingerprint of one element.
#[derive(Debug, Clone, PartialEq)]
pub struct Fingerprint {
    /// Canonical byte buffer the distance oracle operates on.
    pub buffer: Vec<u8>,
    /// 128-bit content hash of the buffer. Equal hashes are treated as
    /// identical content without consulting the oracle.
    pub hash: u128,
    /// Shannon entropy of the buffer, bits per symbol.
    pub entropy: f64,
    /// Optional structural control-flow signature (methods only).
    pub structural: Option<Vec<u8>>,
}

impl Fingerprint {
    fn from_buffer(buffer: Vec<u8>, structural: Option<Vec<u8>>) -> Self {
        let hash = xxh3_128(&buffer);
        let entropy = entropy(&buffer);
        Self { buffer, hash, entropy, structural }
    }
}

fn position_literal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Hex addresses and bare decimal offsets are position-dependent: two
    // structurally identical but relocated bodies must fingerprint equally.
    RE.get_or_init(|| Regex::new(r"0x[0-9a-fA-F]+|[+-]?\b\d+\b").unwrap())
}

/// Normalized text of one instruction: lowercase opcode plus operand text
/// with position-dependent literals stripped.
pub fn normalized_text(ins: &Instruction) -> String {
    let opcode = ins.opcode.to_lowercase();
    let operand = position_literal_re().replace_all(&ins.operand, "");
    let mut text = opcode;
    for token in operand.split_whitespace() {
        text.push_str(token);
    }
    text
}

fn instruction_buffer<'a>(instructions: impl Iterator<Item = &'a Instruction>) -> Vec<u8> {
    let mut buffer = Vec::new();
    for ins in instructions {
        buffer.extend_from_slice(normalized_text(ins).as_bytes());
    }
    buffer
}

/// Branch-topology encoding of a method's block graph: per block (in start
/// order), the instruction count and the kinds of its outgoing edges.
fn structural_signature(method: &Method) -> Vec<u8> {
    let mut sig = String::new();
    for block in &method.blocks {
        sig.push_str(&format!("B{}", block.instructions.len()));
        for edge in &block.successors {
            sig.push(match edge.kind {
                crate::model::BlockEdgeKind::Fallthrough => 'f',
                crate::model::BlockEdgeKind::Jump => 'j',
                crate::model::BlockEdgeKind::ConditionalJump => 'c',
                crate::model::BlockEdgeKind::IndirectJump => 'i',
                crate::model::BlockEdgeKind::Call => 'x',
            });
        }
        sig.push(';');
    }
    sig.into_bytes()
}

/// Fingerprint of a whole method body.
pub fn method_fingerprint(method: &Method, with_structural: bool) -> Fingerprint {
    let buffer = instruction_buffer(method.instructions.iter());
    let structural = if with_structural && !method.blocks.is_empty() {
        Some(structural_signature(method))
    } else {
        None
    };
    Fingerprint::from_buffer(buffer, structural)
}

/// Fingerprint of a single basic block.
pub fn block_fingerprint(block: &BasicBlock) -> Fingerprint {
    Fingerprint::from_buffer(instruction_buffer(block.instructions.iter()), None)
}

/// Fingerprint of a string literal: its UTF-8 bytes, verbatim.
pub fn string_fingerprint(value: &str) -> Fingerprint {
    Fingerprint::from_buffer(value.as_bytes().to_vec(), None)
}

/// Per-kind construction, fingerprinting and scoring policy.
///
/// One concrete implementation per element kind, selected statically at call
/// sites; the matching engine is generic over this trait.
pub trait ElementPolicy: Sync {
    type Elem: Sync;

    fn fingerprint(&self, elem: &Self::Elem) -> Fingerprint;

    /// Structural identity used for reporting and name-based skip filters.
    fn identity(&self, elem: &Self::Elem) -> String;

    /// Content length the minimum-size skip predicate applies to.
    fn content_len(&self, elem: &Self::Elem) -> usize;

    /// Similarity score in `[0, 1]`; lower is more similar. Defaults to NCD
    /// over the canonical buffers.
    fn similarity(&self, oracle: &Oracle, a: &Fingerprint, b: &Fingerprint) -> OracleResult<f64> {
        oracle.ncd(&a.buffer, &b.buffer)
    }
}

/// Policy for whole methods.
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodPolicy {
    /// Score over the structural control-flow signature when both sides
    /// carry one; falls back to the plain buffer otherwise.
    pub use_structural: bool,
}

impl ElementPolicy for MethodPolicy {
    type Elem = Method;

    fn fingerprint(&self, elem: &Method) -> Fingerprint {
        method_fingerprint(elem, self.use_structural)
    }

    fn identity(&self, elem: &Method) -> String {
        elem.id()
    }

    fn content_len(&self, elem: &Method) -> usize {
        elem.code_len()
    }

    fn similarity(&self, oracle: &Oracle, a: &Fingerprint, b: &Fingerprint) -> OracleResult<f64> {
        if self.use_structural {
            if let (Some(sa), Some(sb)) = (&a.structural, &b.structural) {
                return oracle.ncd(sa, sb);
            }
        }
        oracle.ncd(&a.buffer, &b.buffer)
    }
}

/// Policy for basic blocks within one method pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockPolicy;

impl ElementPolicy for BlockPolicy {
    type Elem = BasicBlock;

    fn fingerprint(&self, elem: &BasicBlock) -> Fingerprint {
        block_fingerprint(elem)
    }

    fn identity(&self, elem: &BasicBlock) -> String {
        format!("0x{:x}", elem.start)
    }

    fn content_len(&self, elem: &BasicBlock) -> usize {
        elem.code_len()
    }
}

/// Policy for string literals.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringPolicy;

impl ElementPolicy for StringPolicy {
    type Elem = String;

    fn fingerprint(&self, elem: &String) -> Fingerprint {
        string_fingerprint(elem)
    }

    fn identity(&self, elem: &String) -> String {
        elem.clone()
    }

    fn content_len(&self, elem: &String) -> usize {
        elem.len()
    }
}
