//! Distance oracle: compression-based similarity and complexity measures.
//!
//! All measures operate on byte buffers and are pure given a fixed codec and
//! level. The codec itself is a pluggable seam (`Codec`); the default is
//! zlib. A missing or broken codec is a fatal condition surfaced as
//! [`OracleError::Codec`], while empty inputs are always well-defined and
//! never error.

use std::collections::HashMap;
use std::io::Write;
use std::sync::RwLock;
use std::time::Instant;

use thiserror::Error;
use xxhash_rust::xxh3::xxh3_128;

/// Error type for oracle operations.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The compression backend failed or is misconfigured. Unrecoverable;
    /// callers abort the batch comparison.
    #[error("compression codec '{codec}' failed: {reason}")]
    Codec { codec: &'static str, reason: String },

    /// Input exceeds the configured size guard (compression-bomb protection).
    #[error("input of {len} bytes exceeds the configured limit of {limit} bytes")]
    InputTooLarge { len: usize, limit: usize },
}

/// Convenience result type for oracle operations.
pub type OracleResult<T> = Result<T, OracleError>;

/// Byte-compression backend behind the oracle.
///
/// Implementations must be deterministic for a given level so that all
/// derived measures stay pure.
pub trait Codec: Send + Sync {
    fn name(&self) -> &'static str;
    fn compress(&self, level: u32, data: &[u8]) -> OracleResult<Vec<u8>>;
    fn decompress(&self, data: &[u8]) -> OracleResult<Vec<u8>>;
}

/// Default codec: zlib via flate2.
#[derive(Debug, Default)]
pub struct ZlibCodec;

impl Codec for ZlibCodec {
    fn name(&self) -> &'static str {
        "zlib"
    }

    fn compress(&self, level: u32, data: &[u8]) -> OracleResult<Vec<u8>> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::new(level.min(9)));
        encoder
            .write_all(data)
            .and_then(|_| encoder.finish())
            .map_err(|e| OracleError::Codec { codec: self.name(), reason: e.to_string() })
    }

    fn decompress(&self, data: &[u8]) -> OracleResult<Vec<u8>> {
        let mut decoder = flate2::write::ZlibDecoder::new(Vec::new());
        decoder
            .write_all(data)
            .and_then(|_| decoder.finish())
            .map_err(|e| OracleError::Codec { codec: self.name(), reason: e.to_string() })
    }
}

/// Monotonic timing seam for the logical-depth proxy.
///
/// Abstracted so tests (and platforms without a stable cycle counter) can
/// inject their own clock.
pub trait TimeSource: Send + Sync {
    /// Nanoseconds elapsed since an arbitrary fixed origin.
    fn now_ns(&self) -> u128;
}

/// Default clock backed by `std::time::Instant`.
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self { origin: Instant::now() }
    }
}

impl TimeSource for MonotonicClock {
    fn now_ns(&self) -> u128 {
        self.origin.elapsed().as_nanos()
    }
}

/// Classical Shannon entropy in bits per symbol over the byte histogram.
///
/// `entropy(b"")` is defined as `0.0`.
pub fn entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut histogram = [0usize; 256];
    for &b in data {
        histogram[b as usize] += 1;
    }
    let len = data.len() as f64;
    let mut h = 0.0;
    for &count in histogram.iter().filter(|&&c| c > 0) {
        let p = count as f64 / len;
        h -= p * p.log2();
    }
    h
}

/// Standard Levenshtein edit distance over byte sequences (two-row DP).
pub fn levenshtein(a: &[u8], b: &[u8]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Compression-based distance oracle.
///
/// Holds the codec, compression level, timing source and an internal
/// compressed-length cache keyed by content hash (a performance aid only;
/// results never depend on the cache).
pub struct Oracle {
    codec: Box<dyn Codec>,
    level: u32,
    clock: Box<dyn TimeSource>,
    max_input_len: Option<usize>,
    len_cache: RwLock<HashMap<u128, usize>>,
}

impl Default for Oracle {
    fn default() -> Self {
        Self::new()
    }
}

impl Oracle {
    /// Oracle with the default zlib codec at maximum level.
    pub fn new() -> Self {
        Self::with_codec(Box::new(ZlibCodec), 9)
    }

    pub fn with_codec(codec: Box<dyn Codec>, level: u32) -> Self {
        Self {
            codec,
            level,
            clock: Box::new(MonotonicClock::default()),
            max_input_len: None,
            len_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the timing source used by [`Oracle::bennett`].
    pub fn with_clock(mut self, clock: Box<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    /// Reject inputs larger than `limit` bytes before compressing them.
    ///
    /// Compression cost can spike on adversarial inputs; this is the guard
    /// the engine applies instead of a wall-clock timeout.
    pub fn with_max_input_len(mut self, limit: usize) -> Self {
        self.max_input_len = Some(limit);
        self
    }

    /// Name of the configured codec, for diagnostics.
    pub fn codec_name(&self) -> &'static str {
        self.codec.name()
    }

    fn check_input(&self, data: &[u8]) -> OracleResult<()> {
        if let Some(limit) = self.max_input_len {
            if data.len() > limit {
                return Err(OracleError::InputTooLarge { len: data.len(), limit });
            }
        }
        Ok(())
    }

    /// Compressed size of `data` under the configured codec and level.
    pub fn compress_len(&self, data: &[u8]) -> OracleResult<usize> {
        self.check_input(data)?;
        let key = xxh3_128(data);
        if let Ok(cache) = self.len_cache.read() {
            if let Some(&len) = cache.get(&key) {
                return Ok(len);
            }
        }
        let len = self.codec.compress(self.level, data)?.len();
        if let Ok(mut cache) = self.len_cache.write() {
            cache.insert(key, len);
        }
        Ok(len)
    }

    fn pair_lens(&self, a: &[u8], b: &[u8]) -> OracleResult<(usize, usize, usize)> {
        self.check_input(a)?;
        self.check_input(b)?;
        let ca = self.compress_len(a)?;
        let cb = self.compress_len(b)?;
        let mut joined = Vec::with_capacity(a.len() + b.len());
        joined.extend_from_slice(a);
        joined.extend_from_slice(b);
        let cab = self.compress_len(&joined)?;
        Ok((ca, cb, cab))
    }

    /// Normalized Compression Distance in `[0, 1]`.
    ///
    /// `0` means the inputs are (as far as the codec can tell) identical,
    /// `1` maximally dissimilar. Two empty inputs are at distance `0`.
    pub fn ncd(&self, a: &[u8], b: &[u8]) -> OracleResult<f64> {
        // Equal buffers are identical by definition; real codecs do not
        // compress a doubled input to exactly C(x), so short-circuit instead
        // of reporting a spurious nonzero distance.
        if a == b {
            return Ok(0.0);
        }
        let (ca, cb, cab) = self.pair_lens(a, b)?;
        let max = ca.max(cb);
        if max == 0 {
            return Ok(0.0);
        }
        let d = (cab as f64 - ca.min(cb) as f64) / max as f64;
        Ok(d.clamp(0.0, 1.0))
    }

    /// Normalized Compression Similarity: `1 - ncd`.
    pub fn ncs(&self, a: &[u8], b: &[u8]) -> OracleResult<f64> {
        Ok(1.0 - self.ncd(a, b)?)
    }

    /// Compression-based Mutual Inclusion Degree.
    ///
    /// Computed as `(C(a) + C(b) - C(a||b)) / min(C(a), C(b))`, clamped to
    /// `[0, 1]`: the share of the smaller input's information that the codec
    /// finds repeated in the pair. The exact value is codec-dependent by
    /// construction; swapping the codec changes it uniformly.
    pub fn cmid(&self, a: &[u8], b: &[u8]) -> OracleResult<f64> {
        if a.is_empty() || b.is_empty() {
            return Ok(0.0);
        }
        let (ca, cb, cab) = self.pair_lens(a, b)?;
        let min = ca.min(cb);
        if min == 0 {
            return Ok(0.0);
        }
        let shared = ca as f64 + cb as f64 - cab as f64;
        Ok((shared / min as f64).clamp(0.0, 1.0))
    }

    /// Kolmogorov-complexity upper bound: the compressed length itself.
    pub fn kolmogorov(&self, data: &[u8]) -> OracleResult<usize> {
        self.compress_len(data)
    }

    /// Logical-depth proxy: decompression cost in nanoseconds per input
    /// byte, measured through the injected [`TimeSource`].
    pub fn bennett(&self, data: &[u8]) -> OracleResult<f64> {
        if data.is_empty() {
            return Ok(0.0);
        }
        self.check_input(data)?;
        let compressed = self.codec.compress(self.level, data)?;
        let start = self.clock.now_ns();
        let restored = self.codec.decompress(&compressed)?;
        let elapsed = self.clock.now_ns().saturating_sub(start);
        debug_assert_eq!(restored.len(), data.len());
        Ok(elapsed as f64 / data.len() as f64)
    }

    /// Shannon entropy; see [`entropy`].
    pub fn entropy(&self, data: &[u8]) -> f64 {
        entropy(data)
    }

    /// Levenshtein distance; see [`levenshtein`].
    pub fn levenshtein(&self, a: &[u8], b: &[u8]) -> usize {
        levenshtein(a, b)
    }
}
