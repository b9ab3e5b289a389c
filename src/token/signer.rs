//! HMAC-SHA256 key schedule and message signing

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Length of a signature in bytes
pub const SIGNATURE_LEN: usize = 32;

pub type Signature = [u8; SIGNATURE_LEN];

fn hmac_sha256(key: &[u8], data: &[u8]) -> Signature {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    let mut out = [0u8; SIGNATURE_LEN];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// Derive the per-token signing key.
///
/// The certificate is first keyed by the issue timestamp, and that result is
/// then keyed by the salt. Two tokens issued in the same second still sign
/// with different keys.
pub fn signing_key(certificate: &[u8], issued_at: u32, salt: u32) -> Signature {
    let stage = hmac_sha256(&issued_at.to_le_bytes(), certificate);
    hmac_sha256(&salt.to_le_bytes(), &stage)
}

pub fn sign(certificate: &[u8], issued_at: u32, salt: u32, message: &[u8]) -> Signature {
    let key = signing_key(certificate, issued_at, salt);
    hmac_sha256(&key, message)
}

/// Check `signature` against a freshly computed one in constant time
pub fn verify(
    certificate: &[u8],
    issued_at: u32,
    salt: u32,
    message: &[u8],
    signature: &[u8],
) -> bool {
    let expected = sign(certificate, issued_at, salt, message);
    expected[..].ct_eq(signature).into()
}
