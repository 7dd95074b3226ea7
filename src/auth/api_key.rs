/// Service API key comparison
///
/// Keys are compared through their SHA-256 digests, so how long the matching
/// prefix of a guess is does not show up in the comparison time.

use sha2::{Digest, Sha256};

/// True when the presented key equals the configured one
pub fn api_key_matches(presented: &str, expected: &str) -> bool {
    Sha256::digest(presented.as_bytes()) == Sha256::digest(expected.as_bytes())
}
