use std::sync::atomic::{AtomicU64, Ordering};

use kindred_core::similarity::{
    entropy, levenshtein, Codec, Oracle, OracleError, OracleResult, TimeSource,
};

fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() < tolerance,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn entropy_of_empty_is_zero() {
    assert_eq!(entropy(b""), 0.0);
}

#[test]
fn entropy_matches_known_vectors() {
    assert_close(entropy(b"aaaaaaaaaa"), 0.0, 1e-9);
    assert_close(entropy(b"ababababab"), 1.0, 1e-9);
    assert_close(entropy(b"aaabbbccc"), 1.58496, 1e-5);
    assert_close(entropy(b"hello world"), 2.84535, 1e-5);
    assert_close(entropy(b"abcdefghijklmnopqrstuvwxyz"), 4.70044, 1e-5);
}

#[test]
fn entropy_of_uniform_alphabet_is_log2_of_size() {
    let all: Vec<u8> = (0..=255u8).collect();
    assert_close(entropy(&all), 8.0, 1e-9);
    let doubled: Vec<u8> = all.iter().chain(all.iter()).copied().collect();
    assert_close(entropy(&doubled), 8.0, 1e-9);

    let half: Vec<u8> = (0..128u8).collect();
    assert_close(entropy(&half), 7.0, 1e-9);
    let upper: Vec<u8> = (128..=255u8).map(|b| b as u8).collect();
    assert_close(entropy(&upper), 7.0, 1e-9);
}

#[test]
fn ncd_of_identical_inputs_is_zero() {
    let oracle = Oracle::new();
    for input in [&b"x"[..], &b"hello world"[..], &b"some longer buffer with content"[..]] {
        assert_eq!(oracle.ncd(input, input).unwrap(), 0.0);
    }
    assert_eq!(oracle.ncd(b"", b"").unwrap(), 0.0);
}

#[test]
fn ncd_is_bounded_and_roughly_symmetric() {
    let oracle = Oracle::new();
    let a = b"the quick brown fox jumps over the lazy dog".repeat(4);
    let b = b"pack my box with five dozen liquor jugs jugs".repeat(4);
    let ab = oracle.ncd(&a, &b).unwrap();
    let ba = oracle.ncd(&b, &a).unwrap();
    assert!((0.0..=1.0).contains(&ab));
    // Compressors are not perfectly symmetric.
    assert_close(ab, ba, 0.1);
}

#[test]
fn ncd_separates_related_from_unrelated() {
    let oracle = Oracle::new();
    let base = b"invoke-virtual move-result-object const-string return-void".repeat(8);
    let mut related = base.clone();
    related.extend_from_slice(b"nop");
    let unrelated: Vec<u8> = (0..base.len()).map(|i| (i * 37 % 251) as u8).collect();

    let close = oracle.ncd(&base, &related).unwrap();
    let far = oracle.ncd(&base, &unrelated).unwrap();
    assert!(close < far, "related {close} should beat unrelated {far}");
}

#[test]
fn ncs_is_complement_of_ncd() {
    let oracle = Oracle::new();
    let a = b"alpha beta gamma delta".repeat(4);
    let b = b"alpha beta gamma epsilon".repeat(4);
    let ncd = oracle.ncd(&a, &b).unwrap();
    let ncs = oracle.ncs(&a, &b).unwrap();
    assert_close(ncd + ncs, 1.0, 1e-12);
}

#[test]
fn cmid_is_bounded_and_defined_on_empty() {
    let oracle = Oracle::new();
    assert_eq!(oracle.cmid(b"", b"whatever").unwrap(), 0.0);
    assert_eq!(oracle.cmid(b"whatever", b"").unwrap(), 0.0);

    let a = b"shared prefix shared prefix shared prefix".to_vec();
    let b = b"shared prefix shared prefix entirely new tail".to_vec();
    let degree = oracle.cmid(&a, &b).unwrap();
    assert!((0.0..=1.0).contains(&degree));
}

#[test]
fn kolmogorov_bounds_repetitive_below_random() {
    let oracle = Oracle::new();
    let repetitive = vec![b'a'; 4096];
    let pseudo_random: Vec<u8> =
        (0..4096u32).map(|i| (i.wrapping_mul(2654435761) >> 24) as u8).collect();
    let k_rep = oracle.kolmogorov(&repetitive).unwrap();
    let k_rand = oracle.kolmogorov(&pseudo_random).unwrap();
    assert!(k_rep < k_rand);
    assert!(k_rand <= pseudo_random.len() + 64);
}

/// Clock that advances a fixed step per query, making the logical-depth
/// proxy deterministic.
struct SteppingClock {
    ticks: AtomicU64,
}

impl TimeSource for SteppingClock {
    fn now_ns(&self) -> u128 {
        self.ticks.fetch_add(1000, Ordering::SeqCst) as u128
    }
}

#[test]
fn bennett_uses_injected_time_source() {
    let oracle =
        Oracle::new().with_clock(Box::new(SteppingClock { ticks: AtomicU64::new(0) }));
    let data = vec![b'q'; 100];
    // One start and one end query, 1000ns apart, over 100 bytes.
    assert_close(oracle.bennett(&data).unwrap(), 10.0, 1e-9);
    assert_eq!(oracle.bennett(b"").unwrap(), 0.0);
}

#[test]
fn levenshtein_matches_textbook_cases() {
    assert_eq!(levenshtein(b"", b""), 0);
    assert_eq!(levenshtein(b"abc", b""), 3);
    assert_eq!(levenshtein(b"", b"abcd"), 4);
    assert_eq!(levenshtein(b"kitten", b"sitting"), 3);
    assert_eq!(levenshtein(b"flaw", b"lawn"), 2);
    assert_eq!(levenshtein(b"same", b"same"), 0);
}

#[test]
fn oversized_input_is_rejected_before_compression() {
    let oracle = Oracle::new().with_max_input_len(8);
    let err = oracle.compress_len(b"far too large for the limit").unwrap_err();
    assert!(matches!(err, OracleError::InputTooLarge { len: 27, limit: 8 }));

    // Within the limit everything still works.
    assert!(oracle.compress_len(b"tiny").is_ok());
}

struct BrokenCodec;

impl Codec for BrokenCodec {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn compress(&self, _level: u32, _data: &[u8]) -> OracleResult<Vec<u8>> {
        Err(OracleError::Codec { codec: "broken", reason: "backend missing".into() })
    }

    fn decompress(&self, _data: &[u8]) -> OracleResult<Vec<u8>> {
        Err(OracleError::Codec { codec: "broken", reason: "backend missing".into() })
    }
}

#[test]
fn codec_failure_is_fatal_and_names_the_codec() {
    let oracle = Oracle::with_codec(Box::new(BrokenCodec), 9);
    let err = oracle.ncd(b"abc", b"abd").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("broken"), "diagnostic should name the codec: {message}");
}
