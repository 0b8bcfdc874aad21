use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::ApiError,
    models::{PrincipalKind, Role, TokenPair},
};

/// Claims
///
/// The payload signed into every access and refresh token. On the wire the
/// principal kind is the `type` claim, matching what clients already decode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Id of the principal in its own table (users or experts).
    pub id: Uuid,
    /// The only field consulted by the role gate.
    pub role: Role,
    #[serde(rename = "type")]
    pub principal_type: PrincipalKind,
    pub iat: i64,
    pub exp: i64,
}

/// The identity a token is issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub role: Role,
    pub principal_type: PrincipalKind,
}

impl Claims {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            role: self.role,
            principal_type: self.principal_type,
        }
    }
}

#[derive(Clone)]
struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SigningKeys {
    fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

/// TokenService
///
/// Issues and verifies HS256 tokens. Holds nothing but the keys and
/// lifetimes derived from `AppConfig`, so it is cheap to clone into state.
#[derive(Clone)]
pub struct TokenService {
    access: SigningKeys,
    refresh: SigningKeys,
}

impl TokenService {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            access: SigningKeys::new(&config.jwt_secret, config.access_token_ttl),
            refresh: SigningKeys::new(config.refresh_secret(), config.refresh_token_ttl),
        }
    }

    pub fn issue_access_token(&self, identity: &Identity) -> Result<String, ApiError> {
        sign(&self.access, identity)
    }

    pub fn issue_refresh_token(&self, identity: &Identity) -> Result<String, ApiError> {
        sign(&self.refresh, identity)
    }

    /// Issues both tokens for a successful registration or login.
    pub fn issue_pair(&self, identity: &Identity) -> Result<TokenPair, ApiError> {
        Ok(TokenPair {
            access_token: self.issue_access_token(identity)?,
            refresh_token: self.issue_refresh_token(identity)?,
        })
    }

    /// verify_access_token
    ///
    /// Returns the decoded claims, or `Unauthorized` for any failure:
    /// malformed token, wrong signature or expired.
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, ApiError> {
        verify(&self.access, token)
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<Claims, ApiError> {
        verify(&self.refresh, token)
    }
}

fn sign(keys: &SigningKeys, identity: &Identity) -> Result<String, ApiError> {
    let now = Utc::now();
    let expires = now.checked_add_signed(keys.ttl).ok_or_else(|| {
        tracing::error!("token lifetime {} overflows the clock", keys.ttl);
        ApiError::Server("Failed to issue token".to_string())
    })?;
    let claims = Claims {
        id: identity.id,
        role: identity.role,
        principal_type: identity.principal_type,
        iat: now.timestamp(),
        exp: expires.timestamp(),
    };
    encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding).map_err(|e| {
        tracing::error!("token signing failed: {:?}", e);
        ApiError::Server("Failed to issue token".to_string())
    })
}

fn verify(keys: &SigningKeys, token: &str) -> Result<Claims, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    decode::<Claims>(token, &keys.decoding, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("token rejected: {:?}", e.kind());
            ApiError::unauthorized("Invalid or expired token")
        })
}
