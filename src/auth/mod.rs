//! Users, sessions, pairing codes and tokens

mod password;
mod token;
mod totp;

pub use password::{check_strength, entropy};
pub use token::{Claims, TokenFamily};
pub use totp::Totp;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::config::AuthConfig;
use crate::db::{CodeTable, DbEngine, SessionTable, UserTable};
use crate::error::{Error, Result};
use crate::models::{Code, Session, User};
use crate::utils::hashing::{new_uuid, random_string};

/// Pairing code alphabet
pub const CODE_CHARSET: &[u8] = b"123456789ABCDEFGHILKMNPQRSTUVWXYZ";
pub const CODE_LENGTH: usize = 6;

/// Tokens handed to a client after login or pairing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tokens {
    pub access_token: String,
    /// The session token
    pub refresh_token: String,
    pub media_token: String,
}

/// A pairing code and the token the display device polls with
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CodeToken {
    pub code: String,
    pub access_token: String,
}

#[derive(Clone)]
pub struct Auth {
    db: DbEngine,
    config: AuthConfig,
    access: TokenFamily,
    media: TokenFamily,
    code: TokenFamily,
    file: TokenFamily,
}

impl Auth {
    /// Fails when a configured secret file cannot be loaded
    pub fn new(db: DbEngine, config: AuthConfig) -> anyhow::Result<Self> {
        Ok(Self {
            access: TokenFamily::load("access", &config.access_token)?,
            media: TokenFamily::load("media", &config.media_token)?,
            code: TokenFamily::load("code", &config.code_token)?,
            file: TokenFamily::load("file", &config.file_token)?,
            db,
            config,
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    // users

    pub async fn add_user(&self, name: &str, password: &str) -> Result<User> {
        check_strength(password)?;
        let salt = password::new_salt();
        let key = password::derive_key(password, &salt)?;
        UserTable::insert(&self.db, name, &key, &salt).await?;
        info!("added user {}", name);
        self.user(name).await
    }

    pub async fn change_password(&self, name: &str, password: &str) -> Result<()> {
        check_strength(password)?;
        self.user(name).await?;
        let salt = password::new_salt();
        let key = password::derive_key(password, &salt)?;
        UserTable::update_key(&self.db, name, &key, &salt).await
    }

    /// Store an `otpauth://` URI; an empty value removes TOTP
    pub async fn assign_totp(&self, name: &str, uri: &str) -> Result<()> {
        if !uri.is_empty() {
            Totp::from_uri(uri)?;
        }
        UserTable::update_totp(&self.db, name, uri).await
    }

    pub async fn assign_media(&self, name: &str, media: &[String]) -> Result<()> {
        UserTable::update_media(&self.db, name, &media.join(",")).await
    }

    pub async fn user(&self, name: &str) -> Result<User> {
        UserTable::get_by_name(&self.db, name)
            .await?
            .ok_or(Error::UserNotFound)
    }

    pub async fn users(&self) -> Result<Vec<User>> {
        UserTable::all(&self.db).await
    }

    async fn check_password(&self, name: &str, password: &str) -> Result<User> {
        let user = self.user(name).await?;
        if !password::verify(password, &user.salt, &user.key)? {
            return Err(Error::KeyMismatch);
        }
        Ok(user)
    }

    // sessions

    /// Password login; users with TOTP must use `passcode_login`
    pub async fn login(&self, name: &str, password: &str) -> Result<Session> {
        let user = self.check_password(name, password).await?;
        if user.has_totp() {
            return Err(Error::PasscodeRequired);
        }
        self.create_session(&user).await
    }

    pub async fn passcode_login(&self, name: &str, password: &str, passcode: &str) -> Result<Session> {
        let user = self.check_password(name, password).await?;
        let uri = user.totp.as_deref().filter(|t| !t.is_empty()).ok_or(Error::MissingTotp)?;
        let totp = Totp::from_uri(uri)?;
        if !totp.validate(passcode, Utc::now()) {
            return Err(Error::InvalidPasscode);
        }
        self.create_session(&user).await
    }

    async fn create_session(&self, user: &User) -> Result<Session> {
        let expires = Utc::now() + self.config.session_age;
        SessionTable::insert(&self.db, &user.name, &new_uuid(), expires).await
    }

    /// A valid session for `token`
    pub async fn session(&self, token: &str) -> Result<Session> {
        let session = SessionTable::get_by_token(&self.db, token)
            .await?
            .ok_or(Error::SessionNotFound)?;
        if !session.is_valid(Utc::now()) {
            return Err(Error::SessionExpired);
        }
        Ok(session)
    }

    /// The session's user, when the session is valid
    pub async fn session_user(&self, token: &str) -> Result<(User, Session)> {
        let session = self.session(token).await?;
        let user = self.user(&session.user).await?;
        Ok((user, session))
    }

    /// Extend a session by the session age
    pub async fn refresh(&self, session: &Session) -> Result<Session> {
        let expires = Utc::now() + self.config.session_age;
        SessionTable::update_expires(&self.db, &session.token, expires).await?;
        Ok(Session {
            expires,
            ..session.clone()
        })
    }

    pub async fn logout(&self, session: &Session) -> Result<()> {
        SessionTable::delete(&self.db, &session.token).await
    }

    pub async fn expire_all(&self, user: &str) -> Result<u64> {
        SessionTable::expire_all(&self.db, user, Utc::now()).await
    }

    /// Housekeeping of expired sessions and codes
    pub async fn delete_expired(&self) -> Result<(u64, u64)> {
        let now = Utc::now();
        let sessions = SessionTable::delete_expired(&self.db, now).await?;
        let codes = CodeTable::delete_expired(&self.db, now).await?;
        Ok((sessions, codes))
    }

    // tokens

    pub fn tokens(&self, session: &Session) -> Result<Tokens> {
        Ok(Tokens {
            access_token: self.access.issue(&session.user)?,
            refresh_token: session.token.clone(),
            media_token: self.media.issue(&session.user)?,
        })
    }

    pub async fn check_access_token(&self, token: &str) -> Result<User> {
        let name = self.access.verify(token)?;
        self.user(&name).await
    }

    pub async fn check_media_token(&self, token: &str) -> Result<User> {
        let name = self.media.verify(token)?;
        self.user(&name).await
    }

    /// Validate a refresh token (the session token); the session must outlive
    /// any access token issued from it.
    pub async fn check_refresh_token(&self, token: &str) -> Result<(User, Session)> {
        let (user, session) = self.session_user(token).await?;
        if session.remaining(Utc::now()) <= self.access.age() {
            return Err(Error::SessionExpired);
        }
        Ok((user, session))
    }

    pub fn file_token(&self, path: &str) -> Result<String> {
        self.file.issue_for_audience(path)
    }

    pub fn check_file_token(&self, token: &str, path: &str) -> Result<()> {
        self.file.verify_audience(token, path)
    }

    // pairing codes

    pub async fn generate_code(&self) -> Result<CodeToken> {
        let value = random_string(CODE_LENGTH, CODE_CHARSET);
        let expires = Utc::now() + self.config.code_age;
        let code = CodeTable::insert(&self.db, &value, expires).await?;
        Ok(CodeToken {
            access_token: self.code.issue(&code.value)?,
            code: code.value,
        })
    }

    async fn valid_code(&self, value: &str) -> Result<Code> {
        let code = CodeTable::get_by_value(&self.db, value)
            .await?
            .ok_or(Error::CodeNotFound)?;
        if code.is_expired(Utc::now()) {
            return Err(Error::CodeExpired);
        }
        Ok(code)
    }

    /// Link a code to an authenticated session
    pub async fn authorize_code(&self, value: &str, session_token: &str) -> Result<()> {
        let code = self.valid_code(value).await?;
        if code.is_linked() {
            return Err(Error::CodeAlreadyUsed);
        }
        self.session(session_token).await?;
        if !CodeTable::link(&self.db, &code.value, session_token).await? {
            return Err(Error::CodeAlreadyUsed);
        }
        Ok(())
    }

    /// Tokens for the session linked to the code named by `code_token`
    pub async fn check_code(&self, code_token: &str) -> Result<Tokens> {
        let value = self.code.verify(code_token)?;
        let code = self.valid_code(&value).await?;
        let session_token = code
            .token
            .filter(|t| !t.is_empty())
            .ok_or(Error::AccessDenied)?;
        let session = self.session(&session_token).await?;
        self.tokens(&session)
    }

    /// Credentials plus code in one step
    pub async fn link(&self, value: &str, name: &str, password: &str, passcode: Option<&str>) -> Result<()> {
        let session = match passcode {
            Some(passcode) if !passcode.is_empty() => self.passcode_login(name, password, passcode).await?,
            _ => self.login(name, password).await?,
        };
        self.authorize_code(value, &session.token).await
    }
}
