//! Hashing and normalization utilities

use md5::{Digest, Md5};
use rand::Rng;

/// MD5 of `value` as lowercase hex
pub fn md5_hex(value: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}

/// Fuzzy-normalize a title: ASCII-fold, keep alphanumerics only, lowercase.
///
/// Two titles match conservatively only when their fuzzy forms are equal.
pub fn fuzzy_name(name: &str) -> String {
    deunicode::deunicode(name)
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Sort form of a name: leading English articles move out of the way.
pub fn sort_name(name: &str) -> String {
    let trimmed = name.trim();
    for article in ["The ", "A ", "An "] {
        if let Some(rest) = trimmed.strip_prefix(article) {
            if !rest.is_empty() {
                return format!("{}, {}", rest, article.trim());
            }
        }
    }
    trimmed.to_string()
}

/// Fresh v4 UUID as a hyphenated string
pub fn new_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Validate a hyphenated UUID string
pub fn is_uuid(value: &str) -> bool {
    uuid::Uuid::parse_str(value).is_ok()
}

/// Generate a random string of `length` characters drawn from `charset`
pub fn random_string(length: usize, charset: &[u8]) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..charset.len());
            charset[idx] as char
        })
        .collect()
}

/// Episode identifier from an RSS item GUID; URL-shaped GUIDs are hashed.
pub fn episode_id(guid: &str) -> String {
    if guid.starts_with("http://") || guid.starts_with("https://") {
        md5_hex(guid)
    } else {
        guid.to_string()
    }
}
