use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    #[error("signature mismatch")]
    Mismatch,

    #[error("link expired")]
    Expired,
}

/// Generate the HMAC-SHA256 signature for a time-limited download link.
///
/// Format: HMAC-SHA256("{document_id}|{expires}", secret), hex-encoded.
pub fn generate_download_signature(
    document_id: &str,
    expires: i64,
    secret: &str,
) -> Result<String, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| SignatureError::InvalidKey(e.to_string()))?;

    let payload = format!("{}|{}", document_id, expires);
    mac.update(payload.as_bytes());
    let result = mac.finalize();

    Ok(hex::encode(result.into_bytes()))
}

/// Verify a download-link signature and its expiry.
///
/// The link is valid while `now <= expires`; from `expires + 1` onward it
/// is rejected. Comparison is constant-time.
pub fn validate_download_signature(
    document_id: &str,
    signature: &str,
    expires: i64,
    secret: &str,
    now: i64,
) -> Result<(), SignatureError> {
    let expected = generate_download_signature(document_id, expires, secret)?;

    let expected_bytes = expected.as_bytes();
    let signature_bytes = signature.as_bytes();

    if expected_bytes.len() != signature_bytes.len() {
        return Err(SignatureError::Mismatch);
    }
    if !bool::from(expected_bytes.ct_eq(signature_bytes)) {
        return Err(SignatureError::Mismatch);
    }

    if now > expires {
        return Err(SignatureError::Expired);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "portal_signing_secret";

    #[test]
    fn valid_signature_verifies() {
        let expires = 1_700_000_000;
        let signature = generate_download_signature("doc-1", expires, SECRET).unwrap();
        assert!(!signature.is_empty());

        validate_download_signature("doc-1", &signature, expires, SECRET, expires - 10)
            .expect("signature should verify before expiry");
    }

    #[test]
    fn tampered_signature_rejected() {
        let expires = 1_700_000_000;
        let signature = generate_download_signature("doc-1", expires, SECRET).unwrap();
        let tampered = format!("a{}", &signature[1..]);

        let err = validate_download_signature("doc-1", &tampered, expires, SECRET, expires - 10)
            .unwrap_err();
        assert!(matches!(err, SignatureError::Mismatch));
    }

    #[test]
    fn signature_bound_to_document() {
        let expires = 1_700_000_000;
        let signature = generate_download_signature("doc-1", expires, SECRET).unwrap();

        let err = validate_download_signature("doc-2", &signature, expires, SECRET, expires - 10)
            .unwrap_err();
        assert!(matches!(err, SignatureError::Mismatch));
    }

    #[test]
    fn signature_bound_to_expiry() {
        let expires = 1_700_000_000;
        let signature = generate_download_signature("doc-1", expires, SECRET).unwrap();

        // Stretching the lifetime invalidates the signature itself.
        let err =
            validate_download_signature("doc-1", &signature, expires + 600, SECRET, expires - 10)
                .unwrap_err();
        assert!(matches!(err, SignatureError::Mismatch));
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let issued = 1_700_000_000;
        let expires = issued + 3600;
        let signature = generate_download_signature("doc-1", expires, SECRET).unwrap();

        // Valid at exactly t = expires.
        validate_download_signature("doc-1", &signature, expires, SECRET, expires)
            .expect("link is valid at the expiry instant");

        // Denied one second past expiry.
        let err = validate_download_signature("doc-1", &signature, expires, SECRET, expires + 1)
            .unwrap_err();
        assert!(matches!(err, SignatureError::Expired));
    }
}
