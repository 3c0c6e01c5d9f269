//! Password keys and strength policy

use rand::RngCore;
use subtle::ConstantTimeEq;

use crate::error::{Error, Result};

const SALT_LENGTH: usize = 8;
const KEY_LENGTH: usize = 32;
// N = 2^15
const SCRYPT_LOG_N: u8 = 15;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

/// Estimated bits of entropy a password needs
pub const MIN_ENTROPY_BITS: f64 = 60.0;

pub fn new_salt() -> Vec<u8> {
    let mut salt = vec![0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

pub fn derive_key(password: &str, salt: &[u8]) -> Result<Vec<u8>> {
    let params = scrypt::Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_LENGTH)
        .map_err(|e| anyhow::anyhow!("scrypt params: {}", e))?;
    let mut key = vec![0u8; KEY_LENGTH];
    scrypt::scrypt(password.as_bytes(), salt, &params, &mut key)
        .map_err(|e| anyhow::anyhow!("scrypt: {}", e))?;
    Ok(key)
}

/// Derive with the stored salt and compare in constant time
pub fn verify(password: &str, salt: &[u8], key: &[u8]) -> Result<bool> {
    let derived = derive_key(password, salt)?;
    Ok(derived.ct_eq(key).into())
}

/// Entropy estimate from length and the character classes used
pub fn entropy(password: &str) -> f64 {
    let mut pool = 0u32;
    if password.chars().any(|c| c.is_ascii_lowercase()) {
        pool += 26;
    }
    if password.chars().any(|c| c.is_ascii_uppercase()) {
        pool += 26;
    }
    if password.chars().any(|c| c.is_ascii_digit()) {
        pool += 10;
    }
    if password.chars().any(|c| c.is_ascii_punctuation() || c == ' ') {
        pool += 33;
    }
    if password.chars().any(|c| !c.is_ascii()) {
        pool += 100;
    }
    if pool == 0 {
        return 0.0;
    }

    // runs of the same character add little
    let mut length = 0usize;
    let mut previous = None;
    for c in password.chars() {
        if previous != Some(c) {
            length += 1;
        }
        previous = Some(c);
    }

    length as f64 * (pool as f64).log2()
}

pub fn check_strength(password: &str) -> Result<()> {
    if entropy(password) < MIN_ENTROPY_BITS {
        return Err(Error::WeakPassword);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strength() {
        assert!(check_strength("Corr3ctHorse!BatteryStaple").is_ok());
        assert!(check_strength("password").is_err());
        assert!(check_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaa").is_err());
        assert!(check_strength("").is_err());
    }

    #[test]
    fn test_derive_and_verify() {
        let salt = new_salt();
        assert_eq!(salt.len(), 8);
        let key = derive_key("Corr3ctHorse!BatteryStaple", &salt).unwrap();
        assert_eq!(key.len(), 32);
        assert!(verify("Corr3ctHorse!BatteryStaple", &salt, &key).unwrap());
        assert!(!verify("wrong", &salt, &key).unwrap());
        assert!(!verify("Corr3ctHorse!BatteryStaple", &new_salt(), &key).unwrap());
    }
}
