// JWT access/refresh token issuing and verification

use crate::auth::{error::AuthError, role::Role};
use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

/// Access tokens expire after 5 minutes
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 300;
/// Refresh tokens expire after 7 days
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 604_800;

const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Value of the `typ` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims written into an access token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub roles: Vec<Role>,
    pub typ: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

/// Claims written into a refresh token. Roles are deliberately absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub typ: TokenKind,
    pub exp: i64,
}

/// Lenient view of a verified payload.
///
/// `roles` and `typ` are read as raw JSON so a malformed value degrades
/// instead of failing the whole token.
#[derive(Debug, Deserialize)]
struct UntypedClaims {
    #[serde(default)]
    sub: serde_json::Value,
    #[serde(default)]
    roles: serde_json::Value,
    #[serde(default)]
    typ: serde_json::Value,
}

/// Identity carried by a verified access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedAccess {
    pub subject: String,
    pub roles: Vec<Role>,
}

/// A freshly issued access + refresh token pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Stateless token service
///
/// Access and refresh tokens are signed with independent secrets so that a
/// leaked key for one class cannot be used to forge the other.
#[derive(Clone)]
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_token_duration: i64,  // in seconds
    refresh_token_duration: i64, // in seconds
}

impl TokenService {
    /// Create a TokenService with the default lifetimes
    pub fn new(access_secret: &str, refresh_secret: &str) -> Self {
        Self::with_ttls(
            access_secret,
            refresh_secret,
            DEFAULT_ACCESS_TOKEN_TTL_SECS,
            DEFAULT_REFRESH_TOKEN_TTL_SECS,
        )
    }

    /// Create a TokenService with explicit lifetimes in seconds
    pub fn with_ttls(
        access_secret: &str,
        refresh_secret: &str,
        access_token_duration: i64,
        refresh_token_duration: i64,
    ) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
            access_token_duration,
            refresh_token_duration,
        }
    }

    pub fn access_token_duration(&self) -> i64 {
        self.access_token_duration
    }

    /// Issue an access token carrying the subject and its roles
    pub fn issue_access(&self, subject: &str, roles: &[Role]) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: subject.to_string(),
            roles: roles.to_vec(),
            typ: TokenKind::Access,
            iat: now,
            exp: now + self.access_token_duration,
        };

        encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.access_encoding)
            .map_err(|e| AuthError::AccessSigningFailed(e.to_string()))
    }

    /// Issue a refresh token for the subject
    pub fn issue_refresh(&self, subject: &str) -> Result<String, AuthError> {
        let claims = RefreshClaims {
            sub: subject.to_string(),
            typ: TokenKind::Refresh,
            exp: Utc::now().timestamp() + self.refresh_token_duration,
        };

        encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.refresh_encoding)
            .map_err(|e| AuthError::RefreshSigningFailed(e.to_string()))
    }

    /// Issue both tokens, access first
    pub fn issue_pair(&self, subject: &str, roles: &[Role]) -> Result<TokenPair, AuthError> {
        let access_token = self.issue_access(subject, roles)?;
        let refresh_token = self.issue_refresh(subject)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Verify an access token and return its subject and roles
    ///
    /// Missing or malformed `roles` yields an empty set; unknown role names
    /// are skipped.
    pub fn verify_access(&self, token: &str) -> Result<VerifiedAccess, AuthError> {
        let claims = Self::decode_untyped(token, &self.access_decoding)?;
        let subject = claims
            .sub
            .as_str()
            .ok_or(AuthError::CredentialInvalid)?
            .to_string();

        let roles = match claims.roles {
            serde_json::Value::Array(values) => values
                .iter()
                .filter_map(|value| value.as_str())
                .filter_map(|name| name.parse::<Role>().ok())
                .collect(),
            _ => Vec::new(),
        };

        Ok(VerifiedAccess { subject, roles })
    }

    /// Verify a refresh token and return its subject
    ///
    /// Anything whose `typ` is not `"refresh"` is rejected, even with a
    /// valid signature.
    pub fn verify_refresh(&self, token: &str) -> Result<String, AuthError> {
        let claims = Self::decode_untyped(token, &self.refresh_decoding)?;
        if claims.typ.as_str() != Some("refresh") {
            return Err(AuthError::CredentialInvalid);
        }

        claims
            .sub
            .as_str()
            .map(str::to_string)
            .ok_or(AuthError::CredentialInvalid)
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        // exp is compared to the current second with no tolerance
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation
    }

    fn decode_untyped(token: &str, key: &DecodingKey) -> Result<UntypedClaims, AuthError> {
        decode::<UntypedClaims>(token, key, &Self::validation())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::CredentialExpired,
                _ => AuthError::CredentialInvalid,
            })
    }
}
