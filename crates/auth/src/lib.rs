//! Credentials and sessions.
//!
//! Passwords are stored as bcrypt hashes; hashing runs on the blocking pool so it
//! never stalls the async executor. A session is an HS256-signed token carrying the
//! user id and a snapshot of the role, transported in an `HttpOnly` cookie.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use model::{Actor, Role};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest password bcrypt accepts without truncation.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Name of the cookie that carries the session token.
pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("Password hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("Invalid session token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// Hashes and verifies passwords with a fixed bcrypt cost.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_owned();
        let cost = self.cost;
        let hash = tokio::task::spawn_blocking(move || bcrypt::non_truncating_hash(password, cost)).await??;
        Ok(hash)
    }

    /// A password longer than [`MAX_PASSWORD_BYTES`] never matches.
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        if password.len() > MAX_PASSWORD_BYTES {
            return Ok(false);
        }
        let password = password.to_owned();
        let hash = hash.to_owned();
        let valid = tokio::task::spawn_blocking(move || bcrypt::non_truncating_verify(password, &hash)).await??;
        Ok(valid)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: i32,
    role: Role,
    iat: i64,
    exp: i64,
}

/// Signs and verifies session tokens with the application secret.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a signed token for the actor, valid for the configured ttl.
    pub fn issue(&self, actor: Actor) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = SessionClaims {
            sub: actor.user_id,
            role: actor.role,
            iat: now,
            exp: now.saturating_add(ttl),
        };
        Ok(jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Verifies signature and expiry, returning the identity the token was issued for.
    pub fn verify(&self, token: &str) -> Result<Actor, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation)?;
        Ok(Actor {
            user_id: data.claims.sub,
            role: data.claims.role,
        })
    }

    /// `Set-Cookie` value establishing a session with the given token.
    pub fn session_cookie(&self, token: &str) -> String {
        format!(
            "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
            self.ttl.as_secs()
        )
    }
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
}

/// Extracts a cookie value from a `Cookie` request header.
pub fn cookie_value<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}
