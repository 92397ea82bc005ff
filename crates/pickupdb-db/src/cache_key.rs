//! Cache key derivation for pickup records.
//!
//! Product codes come from an external catalog and may contain spaces,
//! mixed case, or punctuation. The cache key is a sanitized slug with a
//! short digest suffix so that two codes which sanitize to the same slug
//! ("PBNE 01" and "pbne-01") still map to distinct rows.

use sha2::{Digest, Sha256};

const DIGEST_PREFIX_LEN: usize = 8;

/// Derive the cache key for a product code.
///
/// The key is stable for a given code: same input, same key, across
/// processes and restarts.
#[must_use]
pub fn cache_key(product_code: &str) -> String {
    let slug = sanitize(product_code);
    let digest = Sha256::digest(product_code.as_bytes());
    let hex = format!("{digest:x}");
    format!("{slug}-{}", &hex[..DIGEST_PREFIX_LEN])
}

/// Lowercase the code and keep only ascii alphanumerics and hyphens,
/// collapsing runs of anything else into a single hyphen.
fn sanitize(product_code: &str) -> String {
    let cleaned: String = product_code
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                ' '
            }
        })
        .collect();
    let slug = cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .trim_matches('-')
        .to_string();
    if slug.is_empty() {
        "product".to_string()
    } else {
        slug
    }
}
