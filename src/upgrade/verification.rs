use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

/// SHA-256 integrity checks for downloaded files.
///
/// Digests are rendered as 64 lowercase hex characters and compared
/// case-insensitively, since update servers publish either form.
///
/// # Examples
///
/// ```rust
/// use upkeep::upgrade::ChecksumVerifier;
///
/// let digest = ChecksumVerifier::compute_sha256(b"");
/// assert_eq!(digest, "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
/// assert!(ChecksumVerifier::verify(b"", Some(&digest.to_uppercase())));
/// assert!(ChecksumVerifier::verify(b"legacy package", None));
/// ```
pub struct ChecksumVerifier;

impl ChecksumVerifier {
    /// Hex-encoded SHA-256 of `bytes`.
    #[must_use]
    pub fn compute_sha256(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    /// Check `bytes` against an expected digest.
    ///
    /// An absent digest always passes; legacy packages are published without one.
    #[must_use]
    pub fn verify(bytes: &[u8], expected: Option<&str>) -> bool {
        let Some(expected) = expected else {
            debug!("No checksum supplied, skipping verification");
            return true;
        };

        let actual = Self::compute_sha256(bytes);
        let matches = actual.eq_ignore_ascii_case(expected.trim());
        if !matches {
            warn!("Checksum mismatch: expected {}, got {}", expected, actual);
        }
        matches
    }

    /// Read `file_path` fully and check it against an expected digest.
    ///
    /// Returns the digest of the file alongside the verdict so callers can
    /// report it.
    pub async fn verify_file(file_path: &Path, expected: Option<&str>) -> Result<(bool, String)> {
        info!("Verifying checksum for: {}", file_path.display());

        let contents = fs::read(file_path)
            .await
            .with_context(|| format!("Failed to read file: {}", file_path.display()))?;

        let actual = Self::compute_sha256(&contents);
        Ok((Self::verify(&contents, expected), actual))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const EMPTY_DIGEST: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn test_compute_sha256() {
        assert_eq!(
            ChecksumVerifier::compute_sha256(b"Hello, World!"),
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
        );
        assert_eq!(ChecksumVerifier::compute_sha256(b""), EMPTY_DIGEST);
    }

    #[test]
    fn test_verify_matching_and_bit_flipped() {
        let vectors: [&[u8]; 3] = [b"", b"Test", b"PK\x03\x04 some archive bytes"];
        for content in vectors {
            let digest = ChecksumVerifier::compute_sha256(content);
            assert!(ChecksumVerifier::verify(content, Some(&digest)));

            if content.is_empty() {
                // Any single byte differs from the empty input.
                assert!(!ChecksumVerifier::verify(&[0u8], Some(&digest)));
                continue;
            }
            let mut flipped = content.to_vec();
            flipped[0] ^= 0x01;
            assert!(!ChecksumVerifier::verify(&flipped, Some(&digest)));
        }
    }

    #[test]
    fn test_verify_case_insensitive() {
        let lowercase = "532eaabd9574880dbf76b9b8cc00832c20a6ec113d682299550d7a6e0f345e25";
        assert!(ChecksumVerifier::verify(b"Test", Some(lowercase)));
        assert!(ChecksumVerifier::verify(b"Test", Some(&lowercase.to_uppercase())));
    }

    #[test]
    fn test_verify_absent_digest_passes() {
        assert!(ChecksumVerifier::verify(b"anything", None));
    }

    #[tokio::test]
    async fn test_verify_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"Test").unwrap();

        let (ok, actual) = ChecksumVerifier::verify_file(
            temp_file.path(),
            Some("0000000000000000000000000000000000000000000000000000000000000000"),
        )
        .await
        .unwrap();
        assert!(!ok);
        assert_eq!(actual, "532eaabd9574880dbf76b9b8cc00832c20a6ec113d682299550d7a6e0f345e25");
    }
}
