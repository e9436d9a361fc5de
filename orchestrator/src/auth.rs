use sha2::{Digest, Sha256};

/// Compare an admin credential against the configured key.
///
/// Both sides are hashed first so the comparison runs over fixed-length
/// digests regardless of input length. An unset or empty key rejects everything.
pub fn credential_matches(configured: Option<&str>, presented: &str) -> bool {
    let Some(configured) = configured.filter(|k| !k.is_empty()) else {
        return false;
    };
    let a = Sha256::digest(configured.as_bytes());
    let b = Sha256::digest(presented.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_key() {
        assert!(credential_matches(Some("s3cret"), "s3cret"));
    }

    #[test]
    fn wrong_key() {
        assert!(!credential_matches(Some("s3cret"), "s3cre"));
        assert!(!credential_matches(Some("s3cret"), ""));
    }

    #[test]
    fn unset_key_rejects_all() {
        assert!(!credential_matches(None, ""));
        assert!(!credential_matches(None, "anything"));
        assert!(!credential_matches(Some(""), ""));
    }
}
