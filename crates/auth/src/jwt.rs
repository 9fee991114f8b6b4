use std::collections::HashSet;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};

/// Verifies a raw bearer token and returns its validated claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

/// HMAC-SHA256 validator over a shared secret.
///
/// The token's time window lives in `issued_at`/`expires_at` (RFC 3339), not
/// in the registered `exp`/`iat` claims, so jsonwebtoken only checks the
/// signature and [`validate_claims`] checks the window against `now`.
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.required_spec_claims = HashSet::new();

        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::InvalidSignature => TokenValidationError::BadSignature,
                _ => TokenValidationError::Malformed(e.to_string()),
            },
        )?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header};
    use tutorhub_core::UserId;

    fn mint(secret: &str, lifetime_minutes: i64) -> String {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: UserId::new(7),
            issued_at: now - Duration::minutes(1),
            expires_at: now + Duration::minutes(lifetime_minutes),
        };
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn accepts_token_signed_with_same_secret() {
        let validator = Hs256JwtValidator::new("s3cret");
        let claims = validator.validate(&mint("s3cret", 10), Utc::now()).unwrap();
        assert_eq!(claims.sub, UserId::new(7));
    }

    #[test]
    fn rejects_foreign_signature_and_garbage() {
        let validator = Hs256JwtValidator::new("s3cret");
        assert_eq!(
            validator.validate(&mint("other", 10), Utc::now()),
            Err(TokenValidationError::BadSignature)
        );
        assert!(matches!(
            validator.validate("not-a-jwt", Utc::now()),
            Err(TokenValidationError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_expired_token() {
        let validator = Hs256JwtValidator::new("s3cret");
        let token = mint("s3cret", 10);
        let later = Utc::now() + Duration::minutes(30);
        assert_eq!(validator.validate(&token, later), Err(TokenValidationError::Expired));
    }
}
