//! Moderator authentication.
//!
//! One username/password pair from configuration, checked on every
//! moderator request via HTTP Basic. A successful check yields a
//! [`ModeratorSession`], which moderator operations take as proof.

use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use subtle::ConstantTimeEq;

use crate::config::ModeratorCredentials;
use crate::error::ServerError;

/// Proof that the caller logged in as the moderator. Only [`Moderator`] can
/// make one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeratorSession {
    username: String,
}

impl ModeratorSession {
    pub fn username(&self) -> &str {
        &self.username
    }
}

#[derive(Debug, Clone)]
pub struct Moderator {
    credentials: Option<ModeratorCredentials>,
}

impl Moderator {
    pub fn new(credentials: Option<ModeratorCredentials>) -> Self {
        Self { credentials }
    }

    pub fn is_enabled(&self) -> bool {
        self.credentials.is_some()
    }

    /// Exact match on both fields.
    pub fn login(&self, username: &str, password: &str) -> Result<ModeratorSession, ServerError> {
        let Some(ref expected) = self.credentials else {
            return Err(ServerError::Forbidden(
                "Moderator API is disabled (no MODERATOR_USERNAME/MODERATOR_PASSWORD configured)"
                    .into(),
            ));
        };

        // Evaluate both so a wrong username costs the same as a wrong password.
        let user_ok = constant_time_eq(username, &expected.username);
        let pass_ok = constant_time_eq(password, &expected.password);
        if !(user_ok && pass_ok) {
            tracing::warn!(username, "Moderator login failed");
            return Err(ServerError::Unauthorized);
        }

        Ok(ModeratorSession {
            username: expected.username.clone(),
        })
    }

    /// Log in from an `Authorization: Basic ...` header.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<ModeratorSession, ServerError> {
        if !self.is_enabled() {
            return self.login("", "");
        }
        let (username, password) = basic_credentials(headers).ok_or(ServerError::Unauthorized)?;
        self.login(&username, &password)
    }
}

fn constant_time_eq(given: &str, expected: &str) -> bool {
    let given = given.as_bytes();
    let expected = expected.as_bytes();
    given.len() == expected.len() && given.ct_eq(expected).unwrap_u8() == 1
}

/// Decode `Authorization: Basic base64(user:pass)`.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let auth = headers.get("authorization")?.to_str().ok()?;
    let encoded = auth
        .strip_prefix("Basic ")
        .or_else(|| auth.strip_prefix("basic "))?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}
