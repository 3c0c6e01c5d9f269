//! JWT families
//!
//! Each family has its own secret, issuer and age. File tokens carry the file
//! path as audience and no subject; the others carry a subject.

use anyhow::Context;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::TokenConfig;
use crate::error::{Error, Result};
use crate::utils::hashing::random_string;

const SECRET_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const SECRET_LENGTH: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenFamily {
    name: &'static str,
    issuer: String,
    age: Duration,
    secret: Vec<u8>,
}

impl std::fmt::Debug for TokenFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenFamily")
            .field("name", &self.name)
            .field("issuer", &self.issuer)
            .field("age", &self.age)
            .finish()
    }
}

impl TokenFamily {
    /// Load the secret from `secret_file`, then `secret`, else generate one.
    ///
    /// A configured file that cannot be read is an error.
    pub fn load(name: &'static str, config: &TokenConfig) -> anyhow::Result<Self> {
        let secret = if !config.secret_file.is_empty() {
            let text = std::fs::read_to_string(&config.secret_file)
                .with_context(|| format!("Failed to read {} token secret {}", name, config.secret_file))?;
            let text = text.trim().to_string();
            if text.is_empty() {
                anyhow::bail!("{} token secret file {} is empty", name, config.secret_file);
            }
            text
        } else if !config.secret.is_empty() {
            config.secret.clone()
        } else {
            warn!("{} token secret not configured, using a random secret", name);
            random_string(SECRET_LENGTH, SECRET_CHARSET)
        };

        Ok(Self {
            name,
            issuer: config.issuer.clone(),
            age: config.age,
            secret: secret.into_bytes(),
        })
    }

    pub fn age(&self) -> Duration {
        self.age
    }

    fn sign(&self, sub: Option<&str>, aud: Option<&str>) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            iss: self.issuer.clone(),
            sub: sub.map(|s| s.to_string()),
            aud: aud.map(|a| a.to_string()),
            iat: now.timestamp(),
            exp: (now + self.age).timestamp(),
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )?)
    }

    pub fn issue(&self, subject: &str) -> Result<String> {
        self.sign(Some(subject), None)
    }

    pub fn issue_for_audience(&self, audience: &str) -> Result<String> {
        self.sign(None, Some(audience))
    }

    fn decode(&self, token: &str, audience: Option<&str>) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.leeway = 0;
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        let claims = decode::<Claims>(token, &DecodingKey::from_secret(&self.secret), &validation)?.claims;
        if claims.sub.as_deref().unwrap_or_default().is_empty()
            && claims.aud.as_deref().unwrap_or_default().is_empty()
        {
            return Err(Error::InvalidTokenClaims);
        }
        Ok(claims)
    }

    /// Verify and return the subject
    pub fn verify(&self, token: &str) -> Result<String> {
        let claims = self.decode(token, None)?;
        match claims.sub {
            Some(sub) if !sub.is_empty() => Ok(sub),
            _ => Err(Error::InvalidTokenSubject),
        }
    }

    /// Verify a token whose audience must equal `audience`
    pub fn verify_audience(&self, token: &str, audience: &str) -> Result<()> {
        let claims = self.decode(token, Some(audience))?;
        if claims.aud.as_deref() != Some(audience) {
            return Err(Error::InvalidTokenAudience);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(issuer: &str, secret: &str) -> TokenFamily {
        TokenFamily::load(
            "test",
            &TokenConfig {
                issuer: issuer.to_string(),
                age: Duration::hours(1),
                secret: secret.to_string(),
                secret_file: String::new(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_subject_round_trip() {
        let access = family("takeout", "s3cret");
        let token = access.issue("alice").unwrap();
        assert_eq!(access.verify(&token).unwrap(), "alice");
    }

    #[test]
    fn test_wrong_issuer_and_secret() {
        let token = family("other", "s3cret").issue("alice").unwrap();
        assert!(matches!(
            family("takeout", "s3cret").verify(&token),
            Err(Error::InvalidTokenIssuer)
        ));

        let token = family("takeout", "a").issue("alice").unwrap();
        assert!(family("takeout", "b").verify(&token).is_err());
    }

    #[test]
    fn test_expired() {
        let mut access = family("takeout", "s3cret");
        access.age = Duration::seconds(-10);
        let token = access.issue("alice").unwrap();
        assert!(matches!(access.verify(&token), Err(Error::TokenExpired)));
    }

    #[test]
    fn test_file_audience() {
        let files = family("takeout", "f");
        let token = files.issue_for_audience("/music/a.flac").unwrap();
        assert!(files.verify_audience(&token, "/music/a.flac").is_ok());
        assert!(files.verify_audience(&token, "/music/b.flac").is_err());
        // no subject
        assert!(files.verify(&token).is_err());
    }

    #[test]
    fn test_secret_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret");
        std::fs::write(&path, "from-file\n").unwrap();
        let config = TokenConfig {
            secret_file: path.to_string_lossy().to_string(),
            ..Default::default()
        };
        let family = TokenFamily::load("media", &config).unwrap();
        assert_eq!(family.secret, b"from-file");

        let missing = TokenConfig {
            secret_file: dir.path().join("none").to_string_lossy().to_string(),
            ..Default::default()
        };
        assert!(TokenFamily::load("media", &missing).is_err());
    }
}
