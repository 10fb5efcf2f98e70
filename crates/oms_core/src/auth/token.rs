//! Signed session tokens (JWT, HMAC family).

use crate::auth::{AuthError, AuthResult};
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Payload carried by every session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

/// Issues and verifies session tokens with one shared secret.
pub struct TokenIssuer {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: TimeDelta,
}

impl TokenIssuer {
    /// # Errors
    /// - `UnsupportedAlgorithm` for anything but HS256/HS384/HS512.
    /// - `InvalidExpiration` when `expiration_mins < 1`.
    pub fn new(secret: &str, algorithm: &str, expiration_mins: i64) -> AuthResult<Self> {
        let algorithm = parse_algorithm(algorithm)?;
        let ttl = TimeDelta::try_minutes(expiration_mins)
            .filter(|_| expiration_mins >= 1)
            .ok_or(AuthError::InvalidExpiration(expiration_mins))?;

        Ok(Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        })
    }

    pub fn issue(&self, email: &str) -> AuthResult<String> {
        self.issue_at(email, Utc::now())
    }

    pub fn issue_at(&self, email: &str, now: DateTime<Utc>) -> AuthResult<String> {
        let claims = Claims {
            email: email.to_string(),
            exp: (now + self.ttl).timestamp(),
        };
        Ok(encode(&Header::new(self.algorithm), &claims, &self.encoding_key)?)
    }

    /// Decodes `token`, checking signature and expiry.
    pub fn verify(&self, token: &str) -> AuthResult<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::new(self.algorithm))?;
        Ok(data.claims)
    }
}

fn parse_algorithm(name: &str) -> AuthResult<Algorithm> {
    match name.trim().to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        _ => Err(AuthError::UnsupportedAlgorithm(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::TokenIssuer;
    use crate::auth::AuthError;
    use chrono::{TimeDelta, Utc};

    #[test]
    fn issued_token_verifies_with_same_secret() {
        let issuer = TokenIssuer::new("secret", "HS256", 120).unwrap();
        let token = issuer.issue("a@x.com").unwrap();

        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.email, "a@x.com");
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let issuer = TokenIssuer::new("secret", "HS256", 120).unwrap();
        let other = TokenIssuer::new("other", "HS256", 120).unwrap();
        let token = other.issue("a@x.com").unwrap();
        assert!(matches!(issuer.verify(&token), Err(AuthError::Token(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = TokenIssuer::new("secret", "hs512", 1).unwrap();
        let token = issuer
            .issue_at("a@x.com", Utc::now() - TimeDelta::try_hours(2).unwrap())
            .unwrap();
        assert!(issuer.verify(&token).is_err());
    }

    #[test]
    fn rejects_unsupported_settings() {
        assert!(matches!(
            TokenIssuer::new("secret", "RS256", 10),
            Err(AuthError::UnsupportedAlgorithm(_))
        ));
        assert!(matches!(
            TokenIssuer::new("secret", "HS256", 0),
            Err(AuthError::InvalidExpiration(0))
        ));
    }
}
