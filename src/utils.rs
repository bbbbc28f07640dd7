//! Utility functions for identifiers and key derivation

use bech32::Bech32m;
use uuid7::uuid7;

/// Human readable prefix for exchange request ids.
pub const REQUEST_HRP: &str = "exchange_";
/// Human readable prefix for notification ids.
pub const NOTIFICATION_HRP: &str = "note_";

// construct a unique id then encode using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

/// Canonical form of an email: trimmed and lowercased, non-ASCII included.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Emails used as storage path segments have their dots replaced with commas.
pub fn sanitize_email(email: &str) -> String {
    normalize_email(email).replace('.', ",")
}

/// Fixed width key prefix for an email. Hashing keeps prefix scans from
/// matching an email that merely starts with another one.
pub fn email_key_prefix(email: &str) -> String {
    sha256::digest(sanitize_email(email))
}

/// Secondary index key: `<sha256(email)>/<id>`.
pub fn index_key(email: &str, id: &str) -> Vec<u8> {
    format!("{}/{}", email_key_prefix(email), id).into_bytes()
}

/// Same comparison the index keys are derived from.
pub fn same_email(a: &str, b: &str) -> bool {
    normalize_email(a) == normalize_email(b)
}
