//! Uniform digest interface over the supported hash functions.
//!
//! Every algorithm can be fed either a whole buffer at once or a reader
//! that is consumed in fixed-size blocks; both paths produce the same digest.

use crate::error::{BenchError, BenchResult};
use blake2::Blake2b512;
use clap::ValueEnum;
use sha2::{Digest, Sha256};
use sha3::Sha3_256;
use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::str::FromStr;

pub const CHUNK_SIZE: usize = 8 * 1024; // 8KB

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum HashAlgorithm {
    #[value(name = "sha256")]
    Sha256,
    #[value(name = "sha3-256")]
    Sha3_256,
    #[value(name = "blake2")]
    Blake2,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 3] = [
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha3_256,
        HashAlgorithm::Blake2,
    ];

    /// Display name used in reports and the summary table.
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "SHA-256",
            HashAlgorithm::Sha3_256 => "SHA3-256",
            HashAlgorithm::Blake2 => "BLAKE2",
        }
    }

    pub fn output_bits(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 256,
            HashAlgorithm::Sha3_256 => 256,
            HashAlgorithm::Blake2 => 512,
        }
    }

    pub fn output_len(&self) -> usize {
        self.output_bits() / 8
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = BenchError;

    /// Accepts both report names ("SHA3-256") and CLI names ("sha3-256").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        HashAlgorithm::ALL
            .into_iter()
            .find(|algo| {
                algo.name().eq_ignore_ascii_case(wanted)
                    || algo
                        .to_possible_value()
                        .is_some_and(|v| v.get_name().eq_ignore_ascii_case(wanted))
            })
            .ok_or_else(|| BenchError::UnknownAlgorithm(wanted.to_string()))
    }
}

/// Incremental digest state, boxed so callers can pick the algorithm at runtime.
pub trait DynDigest: Send {
    fn update(&mut self, data: &[u8]);
    fn finalize(self: Box<Self>) -> Vec<u8>;
}

struct DigestWrapper<D>(D);

impl<D: Digest + Send> DynDigest for DigestWrapper<D> {
    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.0, data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        let DigestWrapper(inner) = *self;
        inner.finalize().to_vec()
    }
}

pub fn create_hasher(algo: HashAlgorithm) -> Box<dyn DynDigest> {
    match algo {
        HashAlgorithm::Sha256 => Box::new(DigestWrapper(Sha256::new())),
        HashAlgorithm::Sha3_256 => Box::new(DigestWrapper(Sha3_256::new())),
        HashAlgorithm::Blake2 => Box::new(DigestWrapper(Blake2b512::new())),
    }
}

/// Single update-and-finalize over an in-memory buffer.
pub fn digest_bytes(algo: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    let mut hasher = create_hasher(algo);
    hasher.update(data);
    hasher.finalize()
}

/// Reads `reader` to exhaustion in `chunk_size` blocks, feeding each block
/// to the digest before finalizing.
pub fn digest_reader<R: Read>(
    algo: HashAlgorithm,
    mut reader: R,
    chunk_size: usize,
) -> std::io::Result<Vec<u8>> {
    let mut hasher = create_hasher(algo);
    let mut buffer = vec![0u8; chunk_size.max(1)];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize())
}

pub fn digest_file<P: AsRef<Path>>(
    algo: HashAlgorithm,
    path: P,
    chunk_size: usize,
) -> BenchResult<Vec<u8>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| BenchError::io(path, e))?;
    digest_reader(algo, file, chunk_size).map_err(|e| BenchError::io(path, e))
}

pub fn digest_file_hex<P: AsRef<Path>>(algo: HashAlgorithm, path: P) -> BenchResult<String> {
    digest_file(algo, path, CHUNK_SIZE).map(hex::encode)
}
