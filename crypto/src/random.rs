//! Random output for the engine's random operations.

use rand::rngs::OsRng;
use rand::{Rng, RngCore};

use crate::zbase32;

/// `count` random bytes from the operating system.
pub fn random_bytes(count: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; count];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// A uniformly distributed value in `[0, limit)`. `limit` must not be 0.
pub fn random_value(limit: u32) -> u32 {
    OsRng.gen_range(0..limit)
}

/// `chars` random z-base-32 characters.
pub fn random_zbase32(chars: usize) -> String {
    let byte_count = (chars * 5 + 7) / 8;
    let mut text = zbase32::encode(&random_bytes(byte_count));
    text.truncate(chars);
    text
}
