//! Seed derivation for reproducible batches and matches.
//!
//! A session seed is expanded into independent streams with an HMAC-SHA256
//! domain tag, so each iteration's batch and each match inside it draw from
//! their own stream.
use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;

/// Random stream used for a single batch or match.
pub type MatchRng = ChaCha20Rng;

/// Derive a stream seed from a user-visible seed and a domain tag.
#[must_use]
pub fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()).expect("64-bit seed is valid key");
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}

/// Seed for the batch run at `iteration` of a session.
#[must_use]
pub fn batch_seed(session_seed: u64, iteration: u32) -> u64 {
    derive_stream_seed(session_seed, format!("batch/{iteration}").as_bytes())
}

#[must_use]
pub fn stream(seed: u64) -> MatchRng {
    MatchRng::seed_from_u64(seed)
}

/// Fresh session seed when the caller did not pin one.
#[must_use]
pub fn entropy_seed() -> u64 {
    rand::random()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    #[test]
    fn derived_seeds_are_stable_and_domain_separated() {
        assert_eq!(derive_stream_seed(7, b"batch/0"), derive_stream_seed(7, b"batch/0"));
        assert_ne!(derive_stream_seed(7, b"batch/0"), derive_stream_seed(7, b"batch/1"));
        assert_ne!(derive_stream_seed(7, b"batch/0"), derive_stream_seed(8, b"batch/0"));
        assert_eq!(batch_seed(7, 3), derive_stream_seed(7, b"batch/3"));
    }

    #[test]
    fn streams_replay_from_seed() {
        let mut first = stream(42);
        let mut second = stream(42);
        assert_eq!(first.next_u64(), second.next_u64());
    }
}
