//! Bearer-token claims extraction.
//!
//! The server does not issue sessions itself — that is the school auth provider's job. It only *consumes*
//! HS256-signed JWTs carrying the parent id and role, validated against the shared `BAON_JWT_SECRET`.
//! [`JwtClaims`] implements actix's `FromRequest`, so any handler that lists it as a parameter is
//! authenticated automatically.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use baon_common::Secret;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::*;
use serde::{Deserialize, Serialize};

use crate::errors::{AuthError, ServerError};

/// The caller's role, as attested by the auth provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Parent,
    Staff,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The parent (or staff member) id.
    pub sub: String,
    pub role: Role,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

impl JwtClaims {
    pub fn is_staff(&self) -> bool {
        self.role == Role::Staff
    }
}

/// Signs and validates access tokens. Validation is what the server needs; issuing is used by the test suite and
/// local tooling standing in for the auth provider.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenIssuer {
    pub fn new(secret: &Secret<String>) -> Self {
        let bytes = secret.reveal().as_bytes();
        Self { encoding: EncodingKey::from_secret(bytes), decoding: DecodingKey::from_secret(bytes) }
    }

    pub fn issue_token(&self, sub: impl Into<String>, role: Role, valid_for: Duration) -> Result<String, ServerError> {
        let claims = JwtClaims { sub: sub.into(), role, exp: (Utc::now() + valid_for).timestamp() };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ServerError::InitializeError(format!("Could not sign access token. {e}")))
    }

    pub fn validate_token(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let data = decode::<JwtClaims>(token, &self.decoding, &Validation::default()).map_err(|e| {
            debug!("🔐️ Token validation failed. {e}");
            AuthError::ValidationError(e.to_string())
        })?;
        Ok(data.claims)
    }
}

impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(claims_from_request(req))
    }
}

fn claims_from_request(req: &HttpRequest) -> Result<JwtClaims, ServerError> {
    let issuer = req
        .app_data::<web::Data<TokenIssuer>>()
        .ok_or_else(|| ServerError::InitializeError("Token issuer is not configured".to_string()))?;
    let header = req.headers().get(header::AUTHORIZATION).ok_or(AuthError::MissingToken)?;
    let token = header
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AuthError::PoorlyFormattedToken)?;
    let claims = issuer.validate_token(token)?;
    trace!("🔐️ Authenticated {} ({:?})", claims.sub, claims.role);
    Ok(claims)
}
