//! Credentials carried in the `Authorization` header.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::{Debug, Formatter};

const SCHEME_BASIC: &str = "Basic";
const SCHEME_BEARER: &str = "Bearer";

/// A username/password pair as sent via HTTP basic authentication.
///
/// Equality and hashing cover both fields, so two requests only share a cache entry if they
/// present the exact same username and password.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl BasicCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        BasicCredentials {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Parses the value of an `Authorization: Basic ...` header.
    ///
    /// Returns `None` for other schemes, invalid Base64, non UTF-8 data or a missing colon.
    pub fn from_header(authorization: &str) -> Option<Self> {
        let encoded = strip_scheme(authorization, SCHEME_BASIC)?;
        let decoded = STANDARD.decode(encoded).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;

        Some(BasicCredentials::new(username, password))
    }
}

impl Debug for BasicCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"**********")
            .finish()
    }
}

/// Extracts the token of an `Authorization: Bearer ...` header.
pub fn bearer_token(authorization: &str) -> Option<String> {
    strip_scheme(authorization, SCHEME_BEARER).map(str::to_string)
}

fn strip_scheme<'a>(authorization: &'a str, scheme: &str) -> Option<&'a str> {
    let (prefix, value) = authorization.trim().split_once(' ')?;
    let value = value.trim();

    if prefix.eq_ignore_ascii_case(scheme) && !value.is_empty() {
        Some(value)
    } else {
        None
    }
}
