//! kindred-core
//!
//! Similarity and diff engine for compiled program code, built for
//! malware-family and code-reuse analysis. The pipeline: fingerprint
//! elements (methods, basic blocks, string literals), match two collections
//! through a compression-based distance oracle, then align every similar
//! method pair block-by-block into a merged, tagged control-flow view.
//!
//! Extraction of instructions and block graphs from a concrete binary
//! format is an external collaborator's job; this crate consumes the IR in
//! [`model`] read-only.

pub mod compare;
pub mod diff;
pub mod fingerprint;
pub mod matching;
pub mod model;
pub mod similarity;
pub mod store;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
