// Hashing module
// Streams files through BLAKE3, SHA-256, SHA-1 or MD5. xxhash is not
// available and falls back to SHA-256, saying so.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest as _, Sha256};

use crate::constants::HASH_CHUNK_SIZE;
use crate::error::{ReelMapError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Blake3,
    Sha256,
    Md5,
    Sha1,
    Xxhash,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Blake3 => "blake3",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Xxhash => "xxhash",
        }
    }

    /// Accepts `sha256`, `SHA-256`, `xxh64` and similar spellings.
    pub fn parse(s: &str) -> Result<Self> {
        let key: String = s.chars().filter(|c| c.is_ascii_alphanumeric()).collect::<String>().to_lowercase();
        match key.as_str() {
            "blake3" => Ok(HashAlgorithm::Blake3),
            "sha256" => Ok(HashAlgorithm::Sha256),
            "md5" => Ok(HashAlgorithm::Md5),
            "sha1" => Ok(HashAlgorithm::Sha1),
            "xxhash" | "xxh64" | "xxh3" => Ok(HashAlgorithm::Xxhash),
            _ => Err(ReelMapError::UnsupportedAlgorithm(s.to_string())),
        }
    }

    /// Whether this algorithm is computed as requested.
    pub fn is_native(&self) -> bool {
        !matches!(self, HashAlgorithm::Xxhash)
    }

    /// The algorithm actually used when `self` is requested.
    pub fn effective(&self) -> HashAlgorithm {
        if self.is_native() {
            *self
        } else {
            HashAlgorithm::Sha256
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashOutcome {
    pub algorithm_used: HashAlgorithm,
    pub requested: HashAlgorithm,
    pub hex: String,
    pub substituted: bool,
}

enum Hasher {
    Blake3(Box<blake3::Hasher>),
    Sha256(Sha256),
    Sha1(Sha1),
    Md5(Md5),
}

impl Hasher {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Blake3 => Hasher::Blake3(Box::new(blake3::Hasher::new())),
            HashAlgorithm::Sha1 => Hasher::Sha1(Sha1::new()),
            HashAlgorithm::Md5 => Hasher::Md5(Md5::new()),
            HashAlgorithm::Sha256 | HashAlgorithm::Xxhash => Hasher::Sha256(Sha256::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Blake3(h) => {
                h.update(data);
            }
            Hasher::Sha256(h) => h.update(data),
            Hasher::Sha1(h) => h.update(data),
            Hasher::Md5(h) => h.update(data),
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Hasher::Blake3(h) => h.finalize().to_hex().to_string(),
            Hasher::Sha256(h) => hex::encode(h.finalize()),
            Hasher::Sha1(h) => hex::encode(h.finalize()),
            Hasher::Md5(h) => hex::encode(h.finalize()),
        }
    }
}

fn outcome(requested: HashAlgorithm, hex: String) -> HashOutcome {
    HashOutcome {
        algorithm_used: requested.effective(),
        requested,
        hex,
        substituted: !requested.is_native(),
    }
}

fn warn_substitution(requested: HashAlgorithm, subject: &str) {
    if !requested.is_native() {
        log::warn!(
            "{} is not available, hashing {} with {} instead",
            requested,
            subject,
            requested.effective()
        );
    }
}

/// Hash a file in fixed-size chunks.
pub fn hash_file(path: &Path, algorithm: HashAlgorithm) -> Result<HashOutcome> {
    let mut file = File::open(path)
        .map_err(|e| ReelMapError::Hash(format!("Failed to open {}: {}", path.display(), e)))?;

    warn_substitution(algorithm, &path.display().to_string());

    let mut hasher = Hasher::new(algorithm.effective());
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| ReelMapError::Hash(format!("Failed to read {}: {}", path.display(), e)))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(outcome(algorithm, hasher.finalize_hex()))
}

/// Hash an in-memory buffer.
pub fn hash_bytes(data: &[u8], algorithm: HashAlgorithm) -> HashOutcome {
    warn_substitution(algorithm, "buffer");
    let mut hasher = Hasher::new(algorithm.effective());
    hasher.update(data);
    outcome(algorithm, hasher.finalize_hex())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashBatch {
    pub hashed: Vec<(PathBuf, HashOutcome)>,
    pub failures: Vec<HashFailure>,
}

/// Hash every path; failures are collected instead of stopping the batch.
pub fn hash_files(paths: &[PathBuf], algorithm: HashAlgorithm) -> HashBatch {
    let mut batch = HashBatch::default();

    for path in paths {
        match hash_file(path, algorithm) {
            Ok(result) => batch.hashed.push((path.clone(), result)),
            Err(e) => {
                log::warn!("Hash failed for {}: {}", path.display(), e);
                batch.failures.push(HashFailure {
                    path: path.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    log::info!(
        "Hashed {} files with {} ({} failed)",
        batch.hashed.len(),
        algorithm.effective(),
        batch.failures.len()
    );
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    const HELLO_SHA256: &str = "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f";

    #[test]
    fn test_sha256_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"Hello, World!").unwrap();

        let result = hash_file(file.path(), HashAlgorithm::Sha256).unwrap();
        assert_eq!(result.hex, HELLO_SHA256);
        assert_eq!(result.algorithm_used, HashAlgorithm::Sha256);
        assert!(!result.substituted);
    }

    #[test]
    fn test_blake3_matches_one_shot() {
        let mut file = NamedTempFile::new().unwrap();
        let data = vec![7u8; HASH_CHUNK_SIZE + 123];
        file.write_all(&data).unwrap();

        let result = hash_file(file.path(), HashAlgorithm::Blake3).unwrap();
        assert_eq!(result.hex, blake3::hash(&data).to_hex().to_string());
        assert_eq!(result.hex.len(), 64);
    }

    #[test]
    fn test_sha1_and_md5_are_native() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"Hello, World!").unwrap();

        let sha1 = hash_file(file.path(), HashAlgorithm::Sha1).unwrap();
        assert_eq!(sha1.hex, "0a0a9f2a6772942557ab5355d76af442f8f65e01");
        assert_eq!(sha1.algorithm_used, HashAlgorithm::Sha1);
        assert!(!sha1.substituted);

        let md5 = hash_file(file.path(), HashAlgorithm::Md5).unwrap();
        assert_eq!(md5.hex, "65a8e27d8879283831b664bd8b7f0ad4");
        assert_eq!(md5.algorithm_used, HashAlgorithm::Md5);
        assert!(!md5.substituted);
    }

    #[test]
    fn test_xxhash_falls_back() {
        let result = hash_bytes(b"Hello, World!", HashAlgorithm::Xxhash);
        assert!(result.substituted);
        assert_eq!(result.requested, HashAlgorithm::Xxhash);
        assert_eq!(result.algorithm_used, HashAlgorithm::Sha256);
        assert_eq!(result.hex, HELLO_SHA256);
    }

    #[test]
    fn test_parse_algorithm_names() {
        assert_eq!(HashAlgorithm::parse("SHA-256").unwrap(), HashAlgorithm::Sha256);
        assert_eq!(HashAlgorithm::parse("xxh64").unwrap(), HashAlgorithm::Xxhash);
        assert_eq!(HashAlgorithm::parse("blake3").unwrap(), HashAlgorithm::Blake3);
        assert!(matches!(
            HashAlgorithm::parse("crc32"),
            Err(ReelMapError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_batch_records_failures() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("a.mov");
        std::fs::write(&good, b"frames").unwrap();
        let missing = dir.path().join("missing.mov");

        let batch = hash_files(&[good.clone(), missing.clone()], HashAlgorithm::Blake3);
        assert_eq!(batch.hashed.len(), 1);
        assert_eq!(batch.hashed[0].0, good);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].path, missing);
    }
}
