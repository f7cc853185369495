//! Human-comparable key fingerprints.
//!
//! A fingerprint is a deterministic 6-symbol digest of a public encryption
//! key, short enough to compare out-of-band (read aloud, shown side by side)
//! to detect a man-in-the-middle during key exchange. It is not
//! cryptographically binding - it is a comparison aid, nothing more.

use sha2::{Digest, Sha256};

/// Number of symbols in a fingerprint.
pub const FINGERPRINT_SYMBOLS: usize = 6;

/// Fixed symbol palette. Order is part of the protocol: both sides must map
/// digest chunks to the same symbols or manual comparison breaks.
const PALETTE: [char; 16] = [
    '\u{1F431}', // cat
    '\u{1F436}', // dog
    '\u{1F98A}', // fox
    '\u{1F43B}', // bear
    '\u{1F43C}', // panda
    '\u{1F438}', // frog
    '\u{1F989}', // owl
    '\u{1F419}', // octopus
    '\u{1F984}', // unicorn
    '\u{1F41D}', // bee
    '\u{1F98B}', // butterfly
    '\u{1F335}', // cactus
    '\u{1F340}', // clover
    '\u{1F319}', // moon
    '\u{2B50}',  // star
    '\u{1F525}', // fire
];

/// Derive the 6-symbol fingerprint of a public encryption key.
///
/// SHA-256 over the key bytes; the first six big-endian 32-bit chunks of the
/// digest each select one palette symbol.
pub fn fingerprint(key_bytes: &[u8]) -> String {
    let digest = Sha256::digest(key_bytes);
    digest
        .chunks_exact(4)
        .take(FINGERPRINT_SYMBOLS)
        .map(|chunk| {
            let value = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            PALETTE[value as usize % PALETTE.len()]
        })
        .collect()
}

/// Combine two fingerprints into one canonical comparison string.
///
/// The twelve symbols are sorted by code point, so both parties derive an
/// identical string no matter which direction they compute from.
pub fn combine(a: &str, b: &str) -> String {
    let mut symbols: Vec<char> = a.chars().chain(b.chars()).collect();
    symbols.sort_unstable();
    symbols.into_iter().collect()
}
