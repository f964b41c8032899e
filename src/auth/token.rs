//! Signed session tokens (HS256 JWT).
//!
//! Tokens are self-contained: nothing about a session is stored server-side.
//! The payload carries the public user fields so clients can render a
//! session without another round trip.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::{AuthFailure, FixitError, Result};
use crate::model::{PublicUser, Role};

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub role: Role,
    pub name: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    #[must_use]
    pub fn for_user(user: &PublicUser, expires_in: Duration) -> Self {
        let iat = Utc::now().timestamp();
        let ttl = i64::try_from(expires_in.as_secs()).unwrap_or(i64::MAX);
        Self {
            id: user.id.clone(),
            role: user.role,
            name: user.name.clone(),
            email: user.email.clone(),
            iat,
            exp: iat.saturating_add(ttl),
        }
    }
}

/// Mints and verifies tokens with one shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expires_in: Duration,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    #[must_use]
    pub fn new(secret: &[u8], expires_in: Duration) -> Self {
        let mut validation = Validation::default();
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            expires_in,
        }
    }

    #[must_use]
    pub const fn expires_in(&self) -> Duration {
        self.expires_in
    }

    /// Mint a token for `user` using the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn issue(&self, user: &PublicUser) -> Result<String> {
        self.encode(&Claims::for_user(user, self.expires_in))
    }

    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode(&self, claims: &Claims) -> Result<String> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| FixitError::Other(anyhow::anyhow!("Failed to sign token: {e}")))
    }

    /// Verify signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns [`AuthFailure::InvalidToken`] for any bad, foreign or expired token.
    pub fn decode(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                FixitError::Unauthorized(AuthFailure::InvalidToken)
            })
    }
}

/// Pull the token out of an `Authorization` header value.
///
/// # Errors
///
/// Missing header or a non-Bearer scheme is [`AuthFailure::MissingToken`];
/// `Bearer` with nothing after it is [`AuthFailure::MalformedToken`].
pub fn bearer_token(header: Option<&str>) -> Result<&str> {
    let Some(rest) = header.and_then(|h| h.strip_prefix("Bearer")) else {
        return Err(FixitError::Unauthorized(AuthFailure::MissingToken));
    };
    match rest.split_whitespace().next() {
        Some(token) => Ok(token),
        None => Err(FixitError::Unauthorized(AuthFailure::MalformedToken)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> PublicUser {
        PublicUser {
            id: "u1".to_string(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            role: Role::Student,
        }
    }

    #[test]
    fn test_issue_and_decode() {
        let issuer = TokenIssuer::new(b"secret", Duration::from_secs(3600));
        let token = issuer.issue(&user()).unwrap();
        let claims = issuer.decode(&token).unwrap();
        assert_eq!(claims.id, "u1");
        assert_eq!(claims.role, Role::Student);
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = TokenIssuer::new(b"one", Duration::from_secs(60))
            .issue(&user())
            .unwrap();
        let err = TokenIssuer::new(b"two", Duration::from_secs(60))
            .decode(&token)
            .unwrap_err();
        assert!(matches!(
            err,
            FixitError::Unauthorized(AuthFailure::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_rejected() {
        let issuer = TokenIssuer::new(b"secret", Duration::from_secs(60));
        let mut claims = Claims::for_user(&user(), Duration::from_secs(60));
        claims.iat -= 7200;
        claims.exp = claims.iat + 60;
        let token = issuer.encode(&claims).unwrap();
        assert!(issuer.decode(&token).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        let issuer = TokenIssuer::new(b"secret", Duration::from_secs(60));
        assert!(issuer.decode("not.a.jwt").is_err());
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc")).unwrap(), "abc");
        assert!(matches!(
            bearer_token(None).unwrap_err(),
            FixitError::Unauthorized(AuthFailure::MissingToken)
        ));
        assert!(matches!(
            bearer_token(Some("Basic abc")).unwrap_err(),
            FixitError::Unauthorized(AuthFailure::MissingToken)
        ));
        assert!(matches!(
            bearer_token(Some("Bearer ")).unwrap_err(),
            FixitError::Unauthorized(AuthFailure::MalformedToken)
        ));
    }
}
