use std::future::{ready, Ready};

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use chrono::Duration;
use jwt_compact::{
    alg::{Hs256, Hs256Key},
    AlgorithmExt,
    Claims,
    Header,
    TimeOptions,
    UntrustedToken,
};
use log::*;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

/// The identity carried by a customer's access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserClaims {
    pub user_id: i64,
}

/// The identity carried by an employee's access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminClaims {
    pub emp_id: i64,
}

/// Issues and validates HS256 access tokens, and knows which header each kind of token travels in.
pub struct JwtAuthority {
    key: Hs256Key,
    user_header: String,
    admin_header: String,
    ttl: Duration,
}

impl JwtAuthority {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            key: Hs256Key::new(config.jwt_secret.reveal().as_bytes()),
            user_header: config.user_header.clone(),
            admin_header: config.admin_header.clone(),
            ttl: config.token_ttl,
        }
    }

    pub fn user_header(&self) -> &str {
        self.user_header.as_str()
    }

    pub fn admin_header(&self) -> &str {
        self.admin_header.as_str()
    }

    /// Signs `claims` into a token that expires after the configured lifetime.
    pub fn issue_token<T: Serialize>(&self, claims: T) -> Result<String, AuthError> {
        self.issue_token_with_ttl(claims, self.ttl)
    }

    pub fn issue_token_with_ttl<T: Serialize>(&self, claims: T, ttl: Duration) -> Result<String, AuthError> {
        let header = Header::empty().with_token_type("JWT");
        let claims = Claims::new(claims).set_duration_and_issuance(&TimeOptions::default(), ttl);
        Hs256.token(&header, &claims, &self.key).map_err(|e| AuthError::CouldNotIssueToken(e.to_string()))
    }

    /// Checks the token's signature and expiry, and returns its custom claims.
    pub fn validate<T: DeserializeOwned>(&self, token: &str) -> Result<T, AuthError> {
        let token = token.trim();
        let token = token.strip_prefix("Bearer ").unwrap_or(token);
        let untrusted = UntrustedToken::new(token).map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
        let token = Hs256
            .validator::<T>(&self.key)
            .validate(&untrusted)
            .map_err(|e| AuthError::ValidationError(e.to_string()))?;
        token.claims().validate_expiration(&TimeOptions::default()).map_err(|_| AuthError::Expired)?;
        let (_, claims) = token.into_parts();
        Ok(claims.custom)
    }
}

fn claims_from_request<T, F>(req: &HttpRequest, header: F) -> Result<T, ServerError>
where
    T: DeserializeOwned,
    F: Fn(&JwtAuthority) -> &str,
{
    let authority = req
        .app_data::<web::Data<JwtAuthority>>()
        .ok_or_else(|| ServerError::Unspecified("No JWT authority has been configured".to_string()))?;
    let name = header(authority);
    let token = req
        .headers()
        .get(name)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
    let claims = authority.validate::<T>(token).map_err(|e| {
        debug!("💻️ Rejected access token in {name} header. {e}");
        e
    })?;
    Ok(claims)
}

impl FromRequest for UserClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(claims_from_request(req, JwtAuthority::user_header))
    }
}

impl FromRequest for AdminClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(claims_from_request(req, JwtAuthority::admin_header))
    }
}
