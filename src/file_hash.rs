use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

/// Read size when streaming a file through the hasher.
const CHUNK_SIZE: usize = 64 * 1024;

/// Lowercase hex SHA-256 of a file's bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentDigest(String);

impl ContentDigest {
    pub const HEX_LEN: usize = 64;

    /// Accept a digest read back from somewhere else (e.g. an artifact tag).
    /// Surrounding whitespace is ignored; anything that is not exactly 64
    /// lowercase hex characters is rejected.
    pub fn from_hex(value: &str) -> Option<Self> {
        let value = value.trim();
        let well_formed = value.len() == Self::HEX_LEN
            && value
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        well_formed.then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to hash {path}")]
pub struct HashError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Compute the SHA-256 hash of a file
pub fn compute_sha256(path: &Path) -> Result<ContentDigest, HashError> {
    tracing::debug!("Computing SHA-256 hash for: {}", path.display());

    let hash_err = |source| HashError {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(hash_err)?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let bytes_read = match file.read(&mut buffer) {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(hash_err(e)),
        };

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    let hash = hasher.finalize();
    let digest = ContentDigest(format!("{:x}", hash));
    tracing::trace!("Hash computed for {}: {}", path.display(), digest);
    Ok(digest)
}
