//! Time-based one-time passcodes (RFC 6238, SHA-1)

use chrono::{DateTime, Utc};
use data_encoding::BASE32_NOPAD;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::collections::HashMap;
use subtle::ConstantTimeEq;

use crate::error::{Error, Result};

const DEFAULT_DIGITS: u32 = 6;
const DEFAULT_PERIOD: i64 = 30;
/// Steps of clock drift accepted either side
const SKEW: i64 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct Totp {
    secret: Vec<u8>,
    digits: u32,
    period: i64,
}

impl Totp {
    /// Parse an `otpauth://totp/...` URI
    pub fn from_uri(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("otpauth://totp/")
            .ok_or(Error::MissingTotp)?;
        let query = rest.split_once('?').map(|(_, q)| q).unwrap_or_default();
        let params: HashMap<String, String> =
            serde_urlencoded::from_str(query).map_err(|_| Error::MissingTotp)?;

        let secret = params.get("secret").ok_or(Error::MissingTotp)?;
        let secret = Self::decode_secret(secret)?;
        let digits = params
            .get("digits")
            .and_then(|d| d.parse().ok())
            .unwrap_or(DEFAULT_DIGITS);
        let period = params
            .get("period")
            .and_then(|p| p.parse().ok())
            .filter(|p| *p > 0)
            .unwrap_or(DEFAULT_PERIOD);

        Ok(Self {
            secret,
            digits,
            period,
        })
    }

    pub fn from_secret(secret: &str) -> Result<Self> {
        Ok(Self {
            secret: Self::decode_secret(secret)?,
            digits: DEFAULT_DIGITS,
            period: DEFAULT_PERIOD,
        })
    }

    fn decode_secret(secret: &str) -> Result<Vec<u8>> {
        let cleaned: String = secret
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '=')
            .collect::<String>()
            .to_ascii_uppercase();
        BASE32_NOPAD
            .decode(cleaned.as_bytes())
            .map_err(|_| Error::MissingTotp)
    }

    fn hotp(&self, counter: u64) -> String {
        // HMAC accepts keys of any length
        let mut mac = match Hmac::<Sha1>::new_from_slice(&self.secret) {
            Ok(mac) => mac,
            Err(_) => return String::new(),
        };
        mac.update(&counter.to_be_bytes());
        let hash = mac.finalize().into_bytes();

        let offset = (hash[hash.len() - 1] & 0x0f) as usize;
        let binary = ((hash[offset] as u32 & 0x7f) << 24)
            | ((hash[offset + 1] as u32) << 16)
            | ((hash[offset + 2] as u32) << 8)
            | (hash[offset + 3] as u32);
        let code = binary % 10u32.pow(self.digits);
        format!("{:0width$}", code, width = self.digits as usize)
    }

    fn counter(&self, at: DateTime<Utc>) -> i64 {
        at.timestamp().div_euclid(self.period)
    }

    pub fn generate(&self, at: DateTime<Utc>) -> String {
        self.hotp(self.counter(at).max(0) as u64)
    }

    pub fn validate(&self, passcode: &str, at: DateTime<Utc>) -> bool {
        let passcode = passcode.trim();
        if passcode.len() != self.digits as usize {
            return false;
        }
        let counter = self.counter(at);
        (-SKEW..=SKEW)
            .map(|step| counter + step)
            .filter(|c| *c >= 0)
            .any(|c| bool::from(self.hotp(c as u64).as_bytes().ct_eq(passcode.as_bytes())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // RFC 6238 SHA-1 seed "12345678901234567890"
    const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    #[test]
    fn test_rfc_vectors() {
        let totp = Totp {
            secret: b"12345678901234567890".to_vec(),
            digits: 8,
            period: 30,
        };
        let at = |secs| Utc.timestamp_opt(secs, 0).unwrap();
        assert_eq!(totp.generate(at(59)), "94287082");
        assert_eq!(totp.generate(at(1111111109)), "07081804");
        assert_eq!(totp.generate(at(1234567890)), "89005924");
    }

    #[test]
    fn test_uri_and_validate() {
        let uri = format!(
            "otpauth://totp/app:alice?issuer=app&secret={}&algorithm=SHA1&digits=6&period=30",
            RFC_SECRET
        );
        let totp = Totp::from_uri(&uri).unwrap();
        assert_eq!(totp, Totp::from_secret(RFC_SECRET).unwrap());

        let now = Utc::now();
        let code = totp.generate(now);
        assert_eq!(code.len(), 6);
        assert!(totp.validate(&code, now));
        assert!(totp.validate(&code, now + chrono::Duration::seconds(30)));
        assert!(!totp.validate(&code, now + chrono::Duration::seconds(120)));
        assert!(!totp.validate("12345", now));
    }

    #[test]
    fn test_bad_uri() {
        assert!(Totp::from_uri("https://example.com").is_err());
        assert!(Totp::from_uri("otpauth://totp/app:alice?issuer=app").is_err());
    }
}
