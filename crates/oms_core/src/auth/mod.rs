//! Credential helpers: password hashing and session tokens.
//!
//! # Invariants
//! - Plain-text passwords never leave this module's function arguments.
//! - Token signing uses only HMAC algorithms configured in settings.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod password;
pub mod token;

pub use password::{hash_password, verify_password, DEFAULT_COST};
pub use token::{Claims, TokenIssuer};

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug)]
pub enum AuthError {
    UnsupportedAlgorithm(String),
    InvalidExpiration(i64),
    Hash(bcrypt::BcryptError),
    Token(jsonwebtoken::errors::Error),
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedAlgorithm(name) => {
                write!(f, "unsupported token algorithm `{name}`; expected HS256|HS384|HS512")
            }
            Self::InvalidExpiration(minutes) => {
                write!(f, "token expiration must be at least one minute, got {minutes}")
            }
            Self::Hash(err) => write!(f, "password hashing failed: {err}"),
            Self::Token(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AuthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Hash(err) => Some(err),
            Self::Token(err) => Some(err),
            Self::UnsupportedAlgorithm(_) | Self::InvalidExpiration(_) => None,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        Self::Token(value)
    }
}

impl From<bcrypt::BcryptError> for AuthError {
    fn from(value: bcrypt::BcryptError) -> Self {
        Self::Hash(value)
    }
}
