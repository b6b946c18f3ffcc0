//! Key hashing algorithms
//!
//! Pluggable string hashes used for ring placement and lookup. The FNV and
//! CRC implementations follow the spymemcached definitions; every variant
//! truncates its result to an unsigned 32-bit range so keys and ring points
//! share one hash space.

use md5::{Digest, Md5};

/// Mask applied to every hash result.
///
/// The 64-bit FNV variants intentionally truncate to 32 bits as well; ring
/// placement depends on this and it must not be "fixed".
const HASH_MASK: u64 = 0xffff_ffff;

const FNV_64_INIT: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_64_PRIME: u64 = 0x1_0000_01b3;

const FNV_32_INIT: u64 = 2_166_136_261;
const FNV_32_PRIME: u64 = 16_777_619;

/// Supported key hashing algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// Fixed, portable stand-in for the host-language "native" string hash.
    ///
    /// A platform hash code is not stable across runtimes, so this aliases
    /// [`HashAlgorithm::Fnv1a_64`]; configurations naming the native hash
    /// get deterministic ring placement instead of a per-platform one.
    Native,

    /// CRC-32 of the key, folded to 15 bits: `(crc >> 16) & 0x7fff`
    Crc,

    /// FNV-1 with 64-bit basis/prime, truncated to 32 bits
    Fnv1_64,

    /// FNV-1a with 64-bit basis/prime, truncated to 32 bits
    Fnv1a_64,

    /// FNV-1 with 32-bit basis/prime
    Fnv1_32,

    /// FNV-1a with 32-bit basis/prime
    Fnv1a_32,

    /// First 4 bytes of the MD5 digest, assembled little-endian
    Ketama,
}

impl HashAlgorithm {
    /// Compute the hash for the given key.
    ///
    /// The result always fits in an unsigned 32-bit range.
    pub fn hash(&self, key: &str) -> u64 {
        let bytes = key.as_bytes();
        let rv = match self {
            HashAlgorithm::Native | HashAlgorithm::Fnv1a_64 => {
                let mut rv = FNV_64_INIT;
                for &b in bytes {
                    rv ^= u64::from(b);
                    rv = rv.wrapping_mul(FNV_64_PRIME);
                }
                rv
            }
            HashAlgorithm::Fnv1_64 => {
                let mut rv = FNV_64_INIT;
                for &b in bytes {
                    rv = rv.wrapping_mul(FNV_64_PRIME);
                    rv ^= u64::from(b);
                }
                rv
            }
            HashAlgorithm::Fnv1_32 => {
                let mut rv = FNV_32_INIT;
                for &b in bytes {
                    rv = rv.wrapping_mul(FNV_32_PRIME);
                    rv ^= u64::from(b);
                }
                rv
            }
            HashAlgorithm::Fnv1a_32 => {
                let mut rv = FNV_32_INIT;
                for &b in bytes {
                    rv ^= u64::from(b);
                    rv = rv.wrapping_mul(FNV_32_PRIME);
                }
                rv
            }
            HashAlgorithm::Crc => u64::from((crc32fast::hash(bytes) >> 16) & 0x7fff),
            HashAlgorithm::Ketama => {
                let digest = Md5::digest(bytes);
                u64::from(u32::from_le_bytes([
                    digest[0], digest[1], digest[2], digest[3],
                ]))
            }
        };
        rv & HASH_MASK
    }
}
