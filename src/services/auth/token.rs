//! Bearer token validation for protected routes.
//!
//! Extracts `Authorization: Bearer <token>`, checks the compact-JWS shape and
//! HS256-family header, and decodes the payload into a claims map.
//!
//! KNOWN DEFECT, kept on purpose: the signature segment is never verified,
//! matching the deployment this replaces. Any caller can forge arbitrary
//! claims with a well-formed unsigned token. Until key distribution is
//! sorted out upstream, this module documents and tests the behavior instead
//! of hiding it; see `forged_token_yields_claims`.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, header};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::Algorithm;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::middleware::route_auth::RouteGuard;

/// Decoded payload of a bearer token. Created per request, never persisted.
#[derive(Debug, Clone, Default)]
pub struct TokenClaims(pub Map<String, Value>);

impl TokenClaims {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Every recognized failure cause. They all collapse to a single 401 on the
/// wire so the response never reveals which check failed.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("missing Authorization header")]
    MissingHeader,
    #[error("Authorization header is not a Bearer credential")]
    BadPrefix,
    #[error("token is not a three-part compact JWS")]
    MalformedToken,
    #[error("unsupported token algorithm")]
    UnsupportedAlgorithm,
    #[error("token payload could not be decoded")]
    DecodeError,
}

#[derive(Debug, Clone, Default)]
pub struct TokenValidator;

impl TokenValidator {
    pub fn new() -> Self {
        Self
    }

    /// Decode the claims of a bearer credential taken from `Authorization`.
    pub fn validate_header(&self, header_value: Option<&str>) -> Result<TokenClaims, TokenError> {
        let value = header_value.ok_or(TokenError::MissingHeader)?;
        let token = value.strip_prefix("Bearer ").ok_or(TokenError::BadPrefix)?;
        if token.is_empty() {
            return Err(TokenError::BadPrefix);
        }
        self.decode(token)
    }

    fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let mut parts = token.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::MalformedToken);
        };

        // The header must at least parse as a JOSE header with an HS256-family
        // algorithm; anything else is not a token this API accepts.
        let jose = jsonwebtoken::decode_header(token).map_err(|_| TokenError::MalformedToken)?;
        if !matches!(
            jose.alg,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(TokenError::UnsupportedAlgorithm);
        }

        // Signature deliberately not checked (see module doc).
        let raw = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::DecodeError)?;
        let claims: Map<String, Value> =
            serde_json::from_slice(&raw).map_err(|_| TokenError::DecodeError)?;

        Ok(TokenClaims(claims))
    }
}

#[async_trait]
impl RouteGuard for TokenValidator {
    async fn check(&self, req: &mut Request<Body>) -> Result<(), AppError> {
        let header_value = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let claims = self.validate_header(header_value).map_err(|err| {
            tracing::warn!(error = %err, "bearer token validation failed");
            AppError::Unauthorized
        })?;

        // Handlers read the claims out of request extensions if they care.
        req.extensions_mut().insert(claims);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn unsigned_token(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());
    format!("{header}.{payload}.forged")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_header_is_rejected() {
        let err = TokenValidator::new().validate_header(None).unwrap_err();
        assert!(matches!(err, TokenError::MissingHeader));
    }

    #[test]
    fn non_bearer_header_is_rejected() {
        let validator = TokenValidator::new();
        for value in ["Basic dXNlcjpwYXNz", "Bearer", "Bearer ", "token abc"] {
            assert!(validator.validate_header(Some(value)).is_err(), "{value}");
        }
    }

    #[test]
    fn two_part_token_is_rejected() {
        let err = TokenValidator::new()
            .validate_header(Some("Bearer aaaa.bbbb"))
            .unwrap_err();
        assert!(matches!(err, TokenError::MalformedToken));
    }

    #[test]
    fn garbage_token_is_rejected() {
        let err = TokenValidator::new()
            .validate_header(Some("Bearer not-a-real-token"))
            .unwrap_err();
        assert!(matches!(err, TokenError::MalformedToken));
    }

    #[test]
    fn forged_token_yields_claims() {
        // Documents the signature-bypass defect: the signature segment is
        // arbitrary, yet the claims come back.
        let token = unsigned_token(&json!({ "sub": "mallory", "role": "admin" }));
        let claims = TokenValidator::new()
            .validate_header(Some(&format!("Bearer {token}")))
            .unwrap();

        assert!(!claims.is_empty());
        assert_eq!(claims.get("sub"), Some(&json!("mallory")));
    }

    #[test]
    fn non_hmac_algorithm_is_rejected() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"EdDSA","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"x"}"#);
        let err = TokenValidator::new()
            .validate_header(Some(&format!("Bearer {header}.{payload}.sig")))
            .unwrap_err();
        assert!(matches!(err, TokenError::UnsupportedAlgorithm));
    }
}
