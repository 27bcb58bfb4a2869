use constant_time_eq::constant_time_eq;
use sha2::{Digest, Sha256};

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Compare a presented secret with the configured one.
///
/// Both sides are hashed first so the comparison runs over equal-length
/// digests regardless of input length.
pub fn secret_matches(expected: &str, presented: &str) -> bool {
    let expected = Sha256::digest(expected.as_bytes());
    let presented = Sha256::digest(presented.as_bytes());
    constant_time_eq(&expected, &presented)
}

/// `true` only when a secret is configured and the header carries it.
pub fn is_authorized(configured: Option<&str>, header: Option<&str>) -> bool {
    match (configured, bearer_token(header)) {
        (Some(expected), Some(token)) => secret_matches(expected, token),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_prefix_required() {
        assert_eq!(bearer_token(Some("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(Some("Bearer ")), None);
        assert_eq!(bearer_token(None), None);
    }

    #[test]
    fn matching_secret_is_authorized() {
        assert!(is_authorized(Some("s3cret"), Some("Bearer s3cret")));
    }

    #[test]
    fn wrong_or_missing_secret_is_rejected() {
        assert!(!is_authorized(Some("s3cret"), Some("Bearer nope")));
        assert!(!is_authorized(Some("s3cret"), Some("Bearer s3cret-and-more")));
        assert!(!is_authorized(Some("s3cret"), None));
    }

    #[test]
    fn unconfigured_secret_rejects_everything() {
        assert!(!is_authorized(None, Some("Bearer your-secret-key")));
        assert!(!is_authorized(None, None));
    }
}
