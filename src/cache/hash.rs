//! Keyed Shard Hashing
//!
//! Seeded DJB2-family hash used by the router, and the per-instance seed
//! source that keeps adversarial key sets from piling into one shard.

use tracing::warn;

/// Initial DJB2 state
const DJB_INIT: u32 = 5381;

/// DJB2 multiplier
const DJB_MUL: u32 = 33;

/// djb2 with a seeded start state and a high-to-low fold for avalanche.
///
/// Walks the key four bytes at a time, then mixes the 0-3 trailing bytes.
#[inline]
pub fn djb33(seed: u32, key: &str) -> u32 {
    let bytes = key.as_bytes();
    let mut d = DJB_INIT
        .wrapping_add(seed)
        .wrapping_add(bytes.len() as u32);

    let mut chunks = bytes.chunks_exact(4);
    for chunk in &mut chunks {
        d = d.wrapping_mul(DJB_MUL) ^ chunk[0] as u32;
        d = d.wrapping_mul(DJB_MUL) ^ chunk[1] as u32;
        d = d.wrapping_mul(DJB_MUL) ^ chunk[2] as u32;
        d = d.wrapping_mul(DJB_MUL) ^ chunk[3] as u32;
    }
    for &byte in chunks.remainder() {
        d = d.wrapping_mul(DJB_MUL) ^ byte as u32;
    }

    d ^ (d >> 16)
}

/// Where a cache's hash seed came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedSource {
    /// Operating system CSPRNG
    Secure,
    /// Non-cryptographic fallback; hash flooding is possible
    Insecure,
}

impl std::fmt::Display for SeedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeedSource::Secure => write!(f, "secure"),
            SeedSource::Insecure => write!(f, "insecure"),
        }
    }
}

/// Draw a fresh hash seed, preferring the system CSPRNG
pub fn random_seed() -> (u32, SeedSource) {
    let mut buf = [0u8; 4];
    let secure = getrandom::getrandom(&mut buf).map(|()| buf);
    seed_or_fallback(secure)
}

/// Never fails: a CSPRNG error degrades to an insecure seed plus a warning.
fn seed_or_fallback(secure: Result<[u8; 4], getrandom::Error>) -> (u32, SeedSource) {
    match secure {
        Ok(bytes) => (u32::from_ne_bytes(bytes), SeedSource::Secure),
        Err(e) => {
            warn!(
                error = %e,
                "Failed to read from the system CSPRNG; your system's security may be \
                 compromised. Continuing with an insecure hash seed."
            );
            (fastrand::u32(..), SeedSource::Insecure)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
