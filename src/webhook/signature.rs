//! HMAC-SHA256 webhook signatures

use crate::error::{Error, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the payload signature
pub const SIGNATURE_HEADER: &str = "x-pco-signature";

/// Optional prefix in front of the hex digest
pub const SIGNATURE_PREFIX: &str = "sha256=";

fn mac_for(secret: &str) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::config(format!("invalid webhook secret: {e}")))
}

/// Sign a payload, producing a `sha256=<hex>` header value
pub fn sign_payload(secret: &str, payload: &[u8]) -> Result<String> {
    let mut mac = mac_for(secret)?;
    mac.update(payload);
    Ok(format!(
        "{SIGNATURE_PREFIX}{}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Check `signature` against the HMAC-SHA256 of the exact payload bytes
///
/// The digest must be lowercase hex, as produced by [`sign_payload`]. The
/// digest comparison is constant-time.
pub fn verify_signature(secret: Option<&str>, payload: &[u8], signature: Option<&str>) -> Result<()> {
    let secret = secret
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::config("webhook secret is not configured"))?;

    let signature = signature
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(Error::MissingSignature)?;

    let digest = signature.strip_prefix(SIGNATURE_PREFIX).unwrap_or(signature);
    if digest.bytes().any(|b| b.is_ascii_uppercase()) {
        return Err(Error::signature("signature must be lowercase hex"));
    }
    let expected = hex::decode(digest)
        .map_err(|e| Error::signature(format!("signature is not valid hex: {e}")))?;

    let mut mac = mac_for(secret)?;
    mac.update(payload);
    mac.verify_slice(&expected)
        .map_err(|_| Error::signature("signature does not match payload"))
}
