//! Single-bit avalanche check.
//!
//! Hashes a buffer, flips the least-significant bit of its final byte,
//! hashes again and reports how many of the digest bits changed.

use crate::error::{BenchError, BenchResult};
use crate::hasher::{digest_bytes, HashAlgorithm};
use std::fs;
use std::path::Path;

/// Expands a digest to its MSB-first bit string, eight characters per byte.
pub fn to_bit_string(digest: &[u8]) -> String {
    digest.iter().map(|byte| format!("{:08b}", byte)).collect()
}

/// Number of differing bit positions between two equal-length digests.
pub fn hamming_distance(a: &[u8], b: &[u8]) -> BenchResult<u32> {
    if a.len() != b.len() {
        return Err(BenchError::validation(format!(
            "digest lengths differ ({} vs {} bytes)",
            a.len(),
            b.len()
        )));
    }
    Ok(a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum())
}

/// Percentage of digest bits that flip when the last input bit flips,
/// rounded to two decimals.
pub fn avalanche_percent(buffer: &[u8], algo: HashAlgorithm) -> BenchResult<f64> {
    if buffer.is_empty() {
        return Err(BenchError::validation(
            "avalanche test needs at least one input byte",
        ));
    }

    let original = digest_bytes(algo, buffer);

    let mut modified = buffer.to_vec();
    if let Some(last) = modified.last_mut() {
        *last ^= 0x01;
    }
    let flipped = digest_bytes(algo, &modified);

    let diff = hamming_distance(&original, &flipped)?;
    let total = original.len() * 8;

    let percent = diff as f64 / total as f64 * 100.0;
    Ok((percent * 100.0).round() / 100.0)
}

/// Reads the whole file into memory and runs [`avalanche_percent`] on it.
pub fn avalanche_file<P: AsRef<Path>>(path: P, algo: HashAlgorithm) -> BenchResult<f64> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|e| BenchError::io(path, e))?;
    avalanche_percent(&data, algo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_string_is_msb_first_and_padded() {
        assert_eq!(to_bit_string(&[0x01, 0x80]), "0000000110000000");
        assert_eq!(to_bit_string(&[0u8; 32]).len(), 256);
    }

    #[test]
    fn test_hamming_distance() {
        assert_eq!(hamming_distance(&[0xFF, 0x00], &[0x0F, 0x01]).unwrap(), 5);
        assert_eq!(hamming_distance(&[0xAA], &[0xAA]).unwrap(), 0);
        assert!(hamming_distance(&[0x00], &[0x00, 0x00]).is_err());
    }

    #[test]
    fn test_hamming_agrees_with_bit_strings() {
        let a = digest_bytes(HashAlgorithm::Sha256, b"left");
        let b = digest_bytes(HashAlgorithm::Sha256, b"right");
        let by_chars = to_bit_string(&a)
            .chars()
            .zip(to_bit_string(&b).chars())
            .filter(|(x, y)| x != y)
            .count();
        assert_eq!(hamming_distance(&a, &b).unwrap() as usize, by_chars);
    }

    #[test]
    fn test_avalanche_in_range_and_deterministic() {
        let buffers: [&[u8]; 4] = [b"a", b"hello world", &[0u8; 4096], &[0xFFu8; 100]];
        for algo in HashAlgorithm::ALL {
            for buffer in buffers {
                let first = avalanche_percent(buffer, algo).unwrap();
                let second = avalanche_percent(buffer, algo).unwrap();
                assert!((0.0..=100.0).contains(&first), "{} gave {}", algo, first);
                assert_eq!(first, second);
            }
        }
    }

    #[test]
    fn test_avalanche_is_rounded_to_two_decimals() {
        let value = avalanche_percent(b"rounding", HashAlgorithm::Blake2).unwrap();
        assert!(((value * 100.0).round() - value * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_avalanche_rejects_empty_input() {
        for algo in HashAlgorithm::ALL {
            let err = avalanche_percent(&[], algo).unwrap_err();
            assert!(matches!(err, BenchError::Validation(_)));
        }
    }
}
