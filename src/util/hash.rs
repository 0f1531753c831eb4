//! Content addressing primitives: SHA-256 over a serialized payload, base32
//! encoding of the digest, and the FNV-1a hashing used by the cuckoo filter
//! chain. These must produce identical bytes on every platform, so nothing
//! here may depend on hashmap iteration order, host endianness assumptions,
//! or locale.

use sha2::{Digest, Sha256};

const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// RFC 4648 base32, no padding, uppercase — used for the `<hash>` segment of
/// `fluree:<location>:<path>/<hash>.json` addresses.
pub fn base32_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity((bytes.len() * 8 + 4) / 5);
    let mut buffer: u32 = 0;
    let mut bits_in_buffer = 0u32;
    for &b in bytes {
        buffer = (buffer << 8) | b as u32;
        bits_in_buffer += 8;
        while bits_in_buffer >= 5 {
            bits_in_buffer -= 5;
            let idx = (buffer >> bits_in_buffer) & 0x1f;
            out.push(BASE32_ALPHABET[idx as usize] as char);
        }
    }
    if bits_in_buffer > 0 {
        let idx = (buffer << (5 - bits_in_buffer)) & 0x1f;
        out.push(BASE32_ALPHABET[idx as usize] as char);
    }
    out
}

pub fn base32_decode(s: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(s.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits_in_buffer = 0u32;
    for c in s.chars() {
        let val = BASE32_ALPHABET
            .iter()
            .position(|&a| a as char == c.to_ascii_uppercase())? as u32;
        buffer = (buffer << 5) | val;
        bits_in_buffer += 5;
        if bits_in_buffer >= 8 {
            bits_in_buffer -= 8;
            out.push((buffer >> bits_in_buffer) as u8);
        }
    }
    Some(out)
}

/// SHA-256 digest of `content`, returned raw (32 bytes).
pub fn sha256(content: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hasher.finalize().into()
}

/// `base32(sha256(content))`, the hash segment used in content addresses.
pub fn sha256_base32(content: &[u8]) -> String {
    base32_encode(&sha256(content))
}

/// FNV-1a over an arbitrary byte slice. Used both for the cuckoo filter's
/// primary bucket hash (over the first 8 address-hash bytes) and, applied
/// again to the fingerprint, for the alternate bucket.
pub fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

#[cfg(test)]
#[path = "hash_test.rs"]
mod hash_test;
