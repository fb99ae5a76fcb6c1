//! Admin authentication: a single configured username/password pair and
//! short-lived HMAC-SHA256 signed bearer tokens.
//!
//! Token layout: `base64url(claims_json) "." base64url(hmac(claims_b64))`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use ring::hmac;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ADMIN_SUBJECT: &str = "admin";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Missing bearer token")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    Expired,
    #[error("Failed to generate token secret")]
    Rng,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    /// Unix seconds
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct AdminAuth {
    key: hmac::Key,
    username_tag: hmac::Tag,
    password_tag: hmac::Tag,
    ttl_secs: i64,
}

impl std::fmt::Debug for AdminAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminAuth")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl AdminAuth {
    pub fn new(username: &str, password: &str, secret: &[u8], ttl_secs: u64) -> Self {
        let key = hmac::Key::new(hmac::HMAC_SHA256, secret);
        // Credentials are kept as tags so the login check can go through
        // hmac::verify, which compares in constant time.
        let username_tag = hmac::sign(&key, username.as_bytes());
        let password_tag = hmac::sign(&key, password.as_bytes());
        Self {
            key,
            username_tag,
            password_tag,
            ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
        }
    }

    /// Same as `new` with a random 32-byte secret. Tokens do not survive a restart.
    pub fn with_random_secret(
        username: &str,
        password: &str,
        ttl_secs: u64,
    ) -> Result<Self, AuthError> {
        let mut secret = [0u8; 32];
        SystemRandom::new()
            .fill(&mut secret)
            .map_err(|_| AuthError::Rng)?;
        Ok(Self::new(username, password, &secret, ttl_secs))
    }

    /// Check credentials and issue a token.
    pub fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AuthError> {
        // Evaluate both so a wrong username costs the same as a wrong password
        let user_ok =
            hmac::verify(&self.key, username.as_bytes(), self.username_tag.as_ref()).is_ok();
        let pass_ok =
            hmac::verify(&self.key, password.as_bytes(), self.password_tag.as_ref()).is_ok();
        if !(user_ok && pass_ok) {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(self.issue(Utc::now()))
    }

    pub fn issue(&self, now: DateTime<Utc>) -> IssuedToken {
        let exp = now.timestamp().saturating_add(self.ttl_secs);
        let claims = Claims {
            sub: ADMIN_SUBJECT.to_string(),
            exp,
        };
        // Serializing a struct of a String and an i64 cannot fail
        let claims_json = serde_json::to_vec(&claims).unwrap_or_default();
        let payload = URL_SAFE_NO_PAD.encode(claims_json);
        let signature = hmac::sign(&self.key, payload.as_bytes());

        IssuedToken {
            token: format!("{payload}.{}", URL_SAFE_NO_PAD.encode(signature.as_ref())),
            expires_at: Utc
                .timestamp_opt(exp, 0)
                .single()
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let (payload, signature) = token.split_once('.').ok_or(AuthError::InvalidToken)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::InvalidToken)?;
        hmac::verify(&self.key, payload.as_bytes(), &signature)
            .map_err(|_| AuthError::InvalidToken)?;

        let claims_json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| AuthError::InvalidToken)?;
        let claims: Claims =
            serde_json::from_slice(&claims_json).map_err(|_| AuthError::InvalidToken)?;

        if claims.sub != ADMIN_SUBJECT {
            return Err(AuthError::InvalidToken);
        }
        if claims.exp <= now.timestamp() {
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }
}
