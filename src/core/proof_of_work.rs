//! Proof-of-work target and verification
//!
//! The trial value of a nonce is the first eight bytes (big-endian) of
//! `doubleSha512(nonce || initialHash)`. A nonce is accepted when the trial
//! value does not exceed the target.

use crate::crypto::Cryptography;
use crate::error::{BitmessageError, Result};
use num_bigint::BigUint;
use once_cell::sync::Lazy;

/// Network minimum for nonce trials per byte
pub const DEFAULT_NONCE_TRIALS_PER_BYTE: u64 = 1000;
/// Network minimum for the payload length extra
pub const DEFAULT_EXTRA_BYTES: u64 = 1000;

static TWO_POW_64: Lazy<BigUint> = Lazy::new(|| BigUint::from(1u8) << 64);

/// `2^64 / (ntpb * (L + L * ttl / 2^16))` with `L = payload_length + extra + 8`.
///
/// `payload_length` is the object without its nonce. Zero difficulty
/// parameters fall back to the network defaults.
pub fn target(payload_length: u64, nonce_trials_per_byte: u64, extra_bytes: u64, ttl: u64) -> u64 {
    let ntpb = if nonce_trials_per_byte == 0 {
        DEFAULT_NONCE_TRIALS_PER_BYTE
    } else {
        nonce_trials_per_byte
    };
    let extra = if extra_bytes == 0 {
        DEFAULT_EXTRA_BYTES
    } else {
        extra_bytes
    };

    let length = BigUint::from(payload_length) + BigUint::from(extra) + BigUint::from(8u8);
    let ttl_term = (&length * BigUint::from(ttl)) >> 16;
    let denominator = BigUint::from(ntpb) * (length + ttl_term);
    saturating_u64(&(&*TWO_POW_64 / denominator))
}

/// Big-endian u64 of the first eight bytes of `doubleSha512(nonce || initial_hash)`
pub fn trial_value<C: Cryptography + ?Sized>(
    crypto: &C,
    nonce: &[u8; 8],
    initial_hash: &[u8; 64],
) -> u64 {
    let hash = crypto.double_sha512(&[&nonce[..], &initial_hash[..]]);
    let mut head = [0u8; 8];
    head.copy_from_slice(&hash[..8]);
    u64::from_be_bytes(head)
}

pub fn check(target: u64, value: u64) -> Result<()> {
    if value > target {
        return Err(BitmessageError::InsufficientProofOfWork { target, value });
    }
    Ok(())
}

/// Sequential search from nonce 0
pub fn solve<C: Cryptography + ?Sized>(crypto: &C, initial_hash: &[u8; 64], target: u64) -> [u8; 8] {
    let mut nonce = 0u64;
    loop {
        let candidate = nonce.to_be_bytes();
        if trial_value(crypto, &candidate, initial_hash) <= target {
            return candidate;
        }
        nonce = nonce.wrapping_add(1);
    }
}

fn saturating_u64(value: &BigUint) -> u64 {
    let digits = value.to_u64_digits();
    match digits.len() {
        0 => 0,
        1 => digits[0],
        _ => u64::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Secp256k1Cryptography;

    #[test]
    fn test_target_without_ttl() {
        assert_eq!(target(100, 1000, 1000, 0), 16_648_685_987_102);
        assert_eq!(target(50, 1, 1, 0), 312_656_679_215_416_129);
    }

    #[test]
    fn test_target_with_ttl() {
        assert_eq!(target(100, 1000, 1000, 86_400), 7_183_311_555_182);
    }

    #[test]
    fn test_zero_parameters_use_defaults() {
        assert_eq!(target(100, 0, 0, 0), target(100, 1000, 1000, 0));
    }

    #[test]
    fn test_longer_payload_means_smaller_target() {
        assert!(target(1000, 1000, 1000, 0) < target(100, 1000, 1000, 0));
        assert!(target(100, 2000, 1000, 0) < target(100, 1000, 1000, 0));
    }

    #[test]
    fn test_check_boundary() {
        assert!(check(100, 100).is_ok());
        assert!(check(100, 0).is_ok());
        assert_eq!(
            check(100, 101).unwrap_err(),
            BitmessageError::InsufficientProofOfWork {
                target: 100,
                value: 101
            }
        );
    }

    #[test]
    fn test_solve_produces_valid_nonce() {
        let crypto = Secp256k1Cryptography::new();
        let initial_hash = crypto.sha512(&[b"some object bytes"]);
        // Roughly one in 256 nonces qualifies
        let target = u64::MAX >> 8;
        let nonce = solve(&crypto, &initial_hash, target);
        let value = trial_value(&crypto, &nonce, &initial_hash);
        assert!(check(target, value).is_ok());
    }
}
