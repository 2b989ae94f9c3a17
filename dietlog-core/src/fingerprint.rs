//! Content fingerprints for captured photos.
//!
//! A fingerprint is the SHA-256 of the exact image bytes, hex encoded. Two
//! bit-identical files always share a fingerprint; a re-encoded or cropped copy
//! of the same photo does not.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length of a hex encoded SHA-256 digest.
pub const FINGERPRINT_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != FINGERPRINT_LEN {
            return Err(format!(
                "Fingerprint must be {} hex characters, got {}",
                FINGERPRINT_LEN,
                s.len()
            ));
        }
        if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!("Fingerprint is not hex: {}", s));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.0
    }
}

/// Hash raw image bytes.
pub fn fingerprint(bytes: &[u8]) -> Fingerprint {
    let digest = Sha256::digest(bytes);
    Fingerprint(hex::encode(digest))
}

/// Read a file and fingerprint it, handing the bytes back for reuse.
pub async fn fingerprint_file(path: &Path) -> std::io::Result<(Fingerprint, Vec<u8>)> {
    let bytes = tokio::fs::read(path).await?;
    let fp = fingerprint(&bytes);
    tracing::debug!(path = %path.display(), fingerprint = %fp, "fingerprinted image");
    Ok((fp, bytes))
}
