//! Token Authority: RS256 access/refresh token issuance and verification.
//!
//! Tokens are signed with an RSA private key and verified with the matching
//! public key, so any process holding only the public key can authenticate
//! requests. Every token embeds a fixed [`UserInfo`] snapshot and a
//! [`TokenKind`] tag; verification never consults the session store.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use workhub_core::tokens::{TokenKind, CLAIMS_VERSION};
use workhub_core::types::{DbId, Timestamp};
use workhub_db::models::user::User;

/// Public identity snapshot carried inside every token and returned by login.
///
/// Never contains the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: DbId,
    pub email: String,
    pub username: String,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
        }
    }
}

/// JWT claims embedded in every token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer, checked against [`JwtConfig::issuer`] on verification.
    pub iss: String,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier (UUID v4).
    pub jti: String,
    pub kind: TokenKind,
    /// Claims layout version, currently [`CLAIMS_VERSION`].
    pub ver: u8,
    pub user: UserInfo,
}

/// A freshly signed token and the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: Timestamp,
}

/// Why a token failed verification. Only used for logging; the request gate
/// collapses every variant into one client-facing message.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token is invalid: {0}")]
    Invalid(String),

    #[error("expected a {expected} token")]
    WrongKind { expected: TokenKind },

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("key material is unusable: {0}")]
    Key(String),
}

/// Configuration for token signing and verification.
#[derive(Clone)]
pub struct JwtConfig {
    /// PEM-encoded RSA private key (PKCS#1 or PKCS#8).
    pub private_key_pem: Vec<u8>,
    /// PEM-encoded RSA public key (SPKI or PKCS#1).
    pub public_key_pem: Vec<u8>,
    /// Value of the `iss` claim (default: `workhub`).
    pub issuer: String,
    /// Access token lifetime in seconds (default: 3600).
    pub access_token_expiry_secs: i64,
    /// Refresh token lifetime in seconds (default: 604800).
    pub refresh_token_expiry_secs: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("private_key_pem", &"<redacted>")
            .field("public_key_pem", &format_args!("{} bytes", self.public_key_pem.len()))
            .field("issuer", &self.issuer)
            .field("access_token_expiry_secs", &self.access_token_expiry_secs)
            .field("refresh_token_expiry_secs", &self.refresh_token_expiry_secs)
            .finish()
    }
}

/// Default `iss` claim.
const DEFAULT_ISSUER: &str = "workhub";
/// Default access token expiry in seconds (1 hour).
const DEFAULT_ACCESS_EXPIRY_SECS: i64 = 3600;
/// Default refresh token expiry in seconds (7 days).
const DEFAULT_REFRESH_EXPIRY_SECS: i64 = 7 * 24 * 3600;

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                    | Required | Default  |
    /// |----------------------------|----------|----------|
    /// | `JWT_PRIVATE_KEY`          | **yes**  | --       |
    /// | `JWT_PUBLIC_KEY`           | **yes**  | --       |
    /// | `JWT_ISSUER`               | no       | `workhub`|
    /// | `JWT_ACCESS_EXPIRY_SECS`   | no       | `3600`   |
    /// | `JWT_REFRESH_EXPIRY_SECS`  | no       | `604800` |
    ///
    /// Keys are base64-encoded PEM. A raw PEM value (starting with
    /// `-----BEGIN`) is accepted as well.
    ///
    /// # Panics
    ///
    /// Panics if either key is missing or not decodable, or if an expiry is
    /// not a positive integer.
    pub fn from_env() -> Self {
        let private_key_pem = read_pem_env("JWT_PRIVATE_KEY");
        let public_key_pem = read_pem_env("JWT_PUBLIC_KEY");

        let issuer = std::env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.into());

        let access_token_expiry_secs: i64 = std::env::var("JWT_ACCESS_EXPIRY_SECS")
            .unwrap_or_else(|_| DEFAULT_ACCESS_EXPIRY_SECS.to_string())
            .parse()
            .expect("JWT_ACCESS_EXPIRY_SECS must be a valid i64");
        assert!(access_token_expiry_secs > 0, "JWT_ACCESS_EXPIRY_SECS must be positive");

        let refresh_token_expiry_secs: i64 = std::env::var("JWT_REFRESH_EXPIRY_SECS")
            .unwrap_or_else(|_| DEFAULT_REFRESH_EXPIRY_SECS.to_string())
            .parse()
            .expect("JWT_REFRESH_EXPIRY_SECS must be a valid i64");
        assert!(refresh_token_expiry_secs > 0, "JWT_REFRESH_EXPIRY_SECS must be positive");

        Self {
            private_key_pem,
            public_key_pem,
            issuer,
            access_token_expiry_secs,
            refresh_token_expiry_secs,
        }
    }

    /// Configured lifetime for tokens of `kind`.
    pub fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => Duration::seconds(self.access_token_expiry_secs),
            TokenKind::Refresh => Duration::seconds(self.refresh_token_expiry_secs),
        }
    }
}

fn read_pem_env(name: &str) -> Vec<u8> {
    let raw = std::env::var(name).unwrap_or_else(|_| panic!("{name} must be set in the environment"));
    let raw = raw.trim();
    assert!(!raw.is_empty(), "{name} must not be empty");
    if raw.starts_with("-----BEGIN") {
        return raw.as_bytes().to_vec();
    }
    BASE64
        .decode(raw)
        .unwrap_or_else(|e| panic!("{name} must be base64-encoded PEM: {e}"))
}

/// Issues and verifies signed tokens. Build once at startup and share.
pub struct TokenAuthority {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("encoding_key", &"<redacted>")
            .field("decoding_key", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenAuthority {
    /// Parse the key pair in `config`.
    pub fn new(config: &JwtConfig) -> Result<Self, TokenError> {
        let encoding_key = EncodingKey::from_rsa_pem(&config.private_key_pem)
            .map_err(|e| TokenError::Key(format!("private key: {e}")))?;
        let decoding_key = DecodingKey::from_rsa_pem(&config.public_key_pem)
            .map_err(|e| TokenError::Key(format!("public key: {e}")))?;

        // Pinning the algorithm list rejects HS*/none tokens outright.
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = 0;
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss"]);

        Ok(Self {
            encoding_key,
            decoding_key,
            validation,
            issuer: config.issuer.clone(),
            access_ttl: config.ttl(TokenKind::Access),
            refresh_ttl: config.ttl(TokenKind::Refresh),
        })
    }

    /// Sign a token of `kind` for `user` with the configured lifetime.
    pub fn issue(&self, user: &UserInfo, kind: TokenKind) -> Result<IssuedToken, TokenError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        self.issue_with_ttl(user, kind, ttl)
    }

    /// Sign a token of `kind` for `user` that expires `ttl` from now.
    pub fn issue_with_ttl(
        &self,
        user: &UserInfo,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let expires_at = now + ttl;

        let claims = Claims {
            iss: self.issuer.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            kind,
            ver: CLAIMS_VERSION,
            user: user.clone(),
        };

        let token = encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        // Report the second-truncated instant actually encoded in `exp`.
        let expires_at = chrono::DateTime::from_timestamp(claims.exp, 0).unwrap_or(expires_at);

        Ok(IssuedToken { token, expires_at })
    }

    /// Check signature, algorithm, issuer and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }

    /// [`verify`](Self::verify), then require an access token.
    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_kind(token, TokenKind::Access)
    }

    /// [`verify`](Self::verify), then require a refresh token.
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_kind(token, TokenKind::Refresh)
    }

    fn verify_kind(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let claims = self.verify(token)?;
        if claims.kind != expected {
            return Err(TokenError::WrongKind { expected });
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const PRIVATE: &str = include_str!("../../tests/fixtures/jwt_primary_private.pem");
    const PUBLIC: &str = include_str!("../../tests/fixtures/jwt_primary_public.pem");
    const OTHER_PRIVATE: &str = include_str!("../../tests/fixtures/jwt_other_private.pem");
    const OTHER_PUBLIC: &str = include_str!("../../tests/fixtures/jwt_other_public.pem");

    fn config(private: &str, public: &str) -> JwtConfig {
        JwtConfig {
            private_key_pem: private.as_bytes().to_vec(),
            public_key_pem: public.as_bytes().to_vec(),
            issuer: "workhub-test".into(),
            access_token_expiry_secs: 3600,
            refresh_token_expiry_secs: 7 * 24 * 3600,
        }
    }

    fn authority() -> TokenAuthority {
        TokenAuthority::new(&config(PRIVATE, PUBLIC)).expect("fixture keys should parse")
    }

    fn alice() -> UserInfo {
        UserInfo {
            id: Uuid::new_v4(),
            email: "a@b.com".into(),
            username: "alice".into(),
        }
    }

    #[test]
    fn access_token_round_trips_identity() {
        let authority = authority();
        let user = alice();

        let issued = authority.issue(&user, TokenKind::Access).unwrap();
        let claims = authority.verify_access(&issued.token).unwrap();

        assert_eq!(claims.user, user);
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.iss, "workhub-test");
        assert_eq!(claims.ver, CLAIMS_VERSION);
        assert_eq!(claims.exp, issued.expires_at.timestamp());
        assert!(issued.expires_at > Utc::now());
    }

    #[test]
    fn every_token_is_unique() {
        let authority = authority();
        let user = alice();
        let a = authority.issue(&user, TokenKind::Access).unwrap();
        let b = authority.issue(&user, TokenKind::Access).unwrap();
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn expired_token_is_rejected() {
        let authority = authority();
        let issued = authority
            .issue_with_ttl(&alice(), TokenKind::Access, Duration::seconds(-5))
            .unwrap();
        assert_matches!(authority.verify(&issued.token), Err(TokenError::Expired));
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let authority = authority();
        let issued = authority.issue(&alice(), TokenKind::Access).unwrap();

        let sig_start = issued.token.rfind('.').unwrap() + 1;
        let mut bytes = issued.token.into_bytes();
        let i = sig_start + 10;
        bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert_matches!(authority.verify(&tampered), Err(TokenError::Invalid(_)));
    }

    #[test]
    fn token_from_another_key_pair_is_rejected() {
        let other = TokenAuthority::new(&config(OTHER_PRIVATE, OTHER_PUBLIC)).unwrap();
        let foreign = other.issue(&alice(), TokenKind::Access).unwrap();
        assert_matches!(authority().verify(&foreign.token), Err(TokenError::Invalid(_)));
    }

    #[test]
    fn hmac_token_keyed_with_public_key_is_rejected() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: "workhub-test".into(),
            exp: now + 600,
            iat: now,
            jti: Uuid::new_v4().to_string(),
            kind: TokenKind::Access,
            ver: CLAIMS_VERSION,
            user: alice(),
        };
        let forged = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(PUBLIC.as_bytes()),
        )
        .unwrap();

        assert_matches!(authority().verify(&forged), Err(TokenError::Invalid(_)));
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let mut cfg = config(PRIVATE, PUBLIC);
        cfg.issuer = "someone-else".into();
        let foreign = TokenAuthority::new(&cfg)
            .unwrap()
            .issue(&alice(), TokenKind::Access)
            .unwrap();
        assert_matches!(authority().verify(&foreign.token), Err(TokenError::Invalid(_)));
    }

    #[test]
    fn kinds_are_not_interchangeable() {
        let authority = authority();
        let user = alice();
        let refresh = authority.issue(&user, TokenKind::Refresh).unwrap();
        let access = authority.issue(&user, TokenKind::Access).unwrap();

        assert_matches!(
            authority.verify_access(&refresh.token),
            Err(TokenError::WrongKind { expected: TokenKind::Access })
        );
        assert_matches!(
            authority.verify_refresh(&access.token),
            Err(TokenError::WrongKind { expected: TokenKind::Refresh })
        );
        assert!(authority.verify_refresh(&refresh.token).is_ok());
    }

    #[test]
    fn refresh_outlives_access() {
        let authority = authority();
        let user = alice();
        let access = authority.issue(&user, TokenKind::Access).unwrap();
        let refresh = authority.issue(&user, TokenKind::Refresh).unwrap();
        assert!(refresh.expires_at > access.expires_at);
    }

    #[test]
    fn garbage_keys_are_reported() {
        let result = TokenAuthority::new(&config("not a key", PUBLIC));
        assert_matches!(result, Err(TokenError::Key(_)));
    }
}
