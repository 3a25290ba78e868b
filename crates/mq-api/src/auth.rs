use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use clap::ValueEnum;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::error::ApiError;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Subject attributed to callers of the shared API key. JWT callers carry
/// their own `sub` claim instead.
pub const SERVICE_SUBJECT: &str = "service";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum AuthMode {
    ApiKey,
    Jwt,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub mode: AuthMode,
    pub api_key: Option<String>,
    pub jwt_secret: Option<String>,
}

/// Authenticated caller. The subject doubles as the default actor on
/// lifecycle actions when the request body names none.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub subject: String,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

impl AuthConfig {
    fn verify(&self, parts: &Parts) -> Result<AuthUser, ApiError> {
        match self.mode {
            AuthMode::ApiKey => self.verify_api_key(parts),
            AuthMode::Jwt => self.verify_bearer(parts),
        }
    }

    fn verify_api_key(&self, parts: &Parts) -> Result<AuthUser, ApiError> {
        let expected = self
            .api_key
            .as_deref()
            .ok_or_else(|| ApiError::Unauthorized("api key auth is not configured".into()))?;
        let provided = header_str(parts, API_KEY_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("missing X-API-Key header".into()))?;

        if !matching_keys(provided.as_bytes(), expected.as_bytes()) {
            return Err(ApiError::Unauthorized("invalid API key".into()));
        }

        Ok(AuthUser {
            subject: SERVICE_SUBJECT.to_string(),
        })
    }

    fn verify_bearer(&self, parts: &Parts) -> Result<AuthUser, ApiError> {
        let secret = self
            .jwt_secret
            .as_deref()
            .ok_or_else(|| ApiError::Unauthorized("jwt auth is not configured".into()))?;
        let token = header_str(parts, AUTHORIZATION.as_str())
            .and_then(|header| header.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".into()))?;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|err| ApiError::Unauthorized(format!("invalid token: {err}")))?;

        Ok(AuthUser {
            subject: data.claims.sub,
        })
    }
}

fn header_str<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|value| value.to_str().ok())
}

// Compares without an early exit on the first differing byte; only the
// length is observable through timing.
fn matching_keys(provided: &[u8], expected: &[u8]) -> bool {
    if provided.len() != expected.len() {
        return false;
    }
    provided
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    AuthConfig: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        AuthConfig::from_ref(state).verify(parts)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;
    use jsonwebtoken::{encode, EncodingKey, Header};

    use super::*;

    fn parts_with(name: &str, value: &str) -> Parts {
        let (parts, _) = Request::builder()
            .header(name, value)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    fn api_key_config(key: &str) -> AuthConfig {
        AuthConfig {
            mode: AuthMode::ApiKey,
            api_key: Some(key.into()),
            jwt_secret: None,
        }
    }

    #[test]
    fn valid_api_key_yields_the_service_subject() {
        let config = api_key_config("sekrit");
        let user = config.verify(&parts_with(API_KEY_HEADER, "sekrit")).unwrap();
        assert_eq!(user.subject, SERVICE_SUBJECT);
    }

    #[test]
    fn wrong_or_missing_api_key_is_rejected() {
        let config = api_key_config("sekrit");
        assert!(config.verify(&parts_with(API_KEY_HEADER, "nope")).is_err());

        let (no_header, _) = Request::builder().body(()).unwrap().into_parts();
        assert!(config.verify(&no_header).is_err());
    }

    #[test]
    fn bearer_token_subject_becomes_the_auth_subject() {
        let secret = "jwt-test-secret";
        let token = encode(
            &Header::default(),
            &serde_json::json!({ "sub": "analyst@firm", "exp": 4_102_444_800u64 }),
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        let config = AuthConfig {
            mode: AuthMode::Jwt,
            api_key: None,
            jwt_secret: Some(secret.into()),
        };
        let user = config
            .verify(&parts_with(AUTHORIZATION.as_str(), &format!("Bearer {token}")))
            .unwrap();
        assert_eq!(user.subject, "analyst@firm");
    }

    #[test]
    fn tampered_bearer_token_is_rejected() {
        let token = encode(
            &Header::default(),
            &serde_json::json!({ "sub": "analyst@firm", "exp": 4_102_444_800u64 }),
            &EncodingKey::from_secret(b"one-secret"),
        )
        .unwrap();

        let config = AuthConfig {
            mode: AuthMode::Jwt,
            api_key: None,
            jwt_secret: Some("another-secret".into()),
        };
        let err = config
            .verify(&parts_with(AUTHORIZATION.as_str(), &format!("Bearer {token}")))
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
