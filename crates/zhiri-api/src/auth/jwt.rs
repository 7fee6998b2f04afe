//! Bearer token minting and validation
//!
//! Tokens are HMAC-SHA512 signed JWTs carrying the user id as `sub` plus the
//! email and role. A token is valid while `now <= exp` (second resolution, no
//! leeway). The codec keeps no state besides its keys.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use zhiri_core::AuthConfig;

use super::models::UserRole;

/// Token type reported to clients alongside the raw token
pub const TOKEN_TYPE_BEARER: &str = "Bearer";

/// Wire claims embedded in every token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Token issuer
    pub iss: String,
    /// Subject - user ID
    pub sub: String,
    /// Unique token identifier; two tokens minted in the same second still differ
    pub jti: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration (Unix seconds)
    pub exp: i64,
    pub email: String,
    pub role: String,
}

/// Typed view of a token's claims
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub subject_id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TryFrom<Claims> for TokenClaims {
    type Error = JwtError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let subject_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| JwtError::InvalidClaims(format!("subject is not a UUID: {}", claims.sub)))?;
        let role = claims
            .role
            .parse::<UserRole>()
            .map_err(|e| JwtError::InvalidClaims(e.to_string()))?;
        let issued_at = DateTime::from_timestamp(claims.iat, 0)
            .ok_or_else(|| JwtError::InvalidClaims("iat out of range".to_string()))?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| JwtError::InvalidClaims("exp out of range".to_string()))?;

        Ok(Self {
            subject_id,
            email: claims.email,
            role,
            issued_at,
            expires_at,
        })
    }
}

/// Token errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token format")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Invalid token claims: {0}")]
    InvalidClaims(String),
}

/// Mints and checks signed bearer tokens
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    ttl: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: config.issuer.clone(),
            ttl: config.token_ttl(),
        }
    }

    /// Configured token lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint a token issued now
    pub fn mint(&self, subject_id: Uuid, email: &str, role: UserRole) -> Result<String, JwtError> {
        self.mint_at(subject_id, email, role, Utc::now())
    }

    /// Mint a token with an explicit issue time
    ///
    /// `exp` is `issued_at + ttl`, truncated to whole seconds.
    pub fn mint_at(
        &self,
        subject_id: Uuid,
        email: &str,
        role: UserRole,
        issued_at: DateTime<Utc>,
    ) -> Result<String, JwtError> {
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or_else(|| JwtError::InvalidClaims("expiry out of range".to_string()))?;

        let claims = Claims {
            iss: self.issuer.clone(),
            sub: subject_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            email: email.to_string(),
            role: role.as_str().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS512), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// True iff the signature checks out and the token has not expired
    pub fn validate(&self, token: &str) -> bool {
        self.validate_at(token, Utc::now())
    }

    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        self.verify(token, now).is_ok()
    }

    /// Check signature and expiry, returning the typed claims
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, JwtError> {
        let claims = self.decode(token)?;
        if now.timestamp() > claims.exp {
            return Err(JwtError::ExpiredToken);
        }
        claims.try_into()
    }

    /// Extract claims after checking the signature only
    ///
    /// Expired tokens still yield their claims; callers that need a live
    /// token must use [`TokenCodec::verify`].
    pub fn claims(&self, token: &str) -> Result<TokenClaims, JwtError> {
        self.decode(token)?.try_into()
    }

    fn decode(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS512);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        // Expiry is compared against a caller-supplied clock
        validation.validate_exp = false;
        validation.leeway = 0;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                _ => JwtError::InvalidToken,
            }
        })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn codec_with_ttl(ttl_ms: u64) -> TokenCodec {
        TokenCodec::new(&AuthConfig {
            token_ttl_ms: ttl_ms,
            ..Default::default()
        })
    }

    fn epoch(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    /// Replace one character in the middle of the given segment
    fn tamper(token: &str, segment: usize) -> String {
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let target = &mut parts[segment];
        let mid = target.len() / 2;
        let original = target.as_bytes()[mid] as char;
        let replacement = if original == 'A' { "B" } else { "A" };
        target.replace_range(mid..mid + 1, replacement);
        parts.join(".")
    }

    #[test]
    fn test_mint_and_claims_round_trip() {
        let codec = codec_with_ttl(3_600_000);
        let user_id = Uuid::new_v4();
        let issued_at = epoch(1_700_000_000);

        let token = codec
            .mint_at(user_id, "a@x.com", UserRole::Partner, issued_at)
            .expect("Failed to mint token");
        let claims = codec.claims(&token).expect("Failed to read claims");

        assert_eq!(claims.subject_id, user_id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.role, UserRole::Partner);
        assert_eq!(claims.issued_at, issued_at);
        assert_eq!(claims.expires_at, issued_at + Duration::hours(1));
    }

    #[test]
    fn test_fresh_token_validates() {
        let codec = codec_with_ttl(86_400_000);
        let token = codec.mint(Uuid::new_v4(), "a@x.com", UserRole::User).unwrap();
        assert!(codec.validate(&token));
    }

    #[test]
    fn test_expiry_boundary() {
        let codec = codec_with_ttl(3_600_000);
        let t0 = epoch(1_700_000_000);
        let token = codec.mint_at(Uuid::new_v4(), "a@x.com", UserRole::User, t0).unwrap();

        assert!(codec.validate_at(&token, t0 + Duration::seconds(3599)));
        assert!(codec.validate_at(&token, t0 + Duration::seconds(3600)));
        assert!(!codec.validate_at(&token, t0 + Duration::seconds(3601)));
        assert!(matches!(
            codec.verify(&token, t0 + Duration::hours(2)),
            Err(JwtError::ExpiredToken)
        ));
    }

    #[test]
    fn test_claims_readable_after_expiry() {
        let codec = codec_with_ttl(1_000);
        let t0 = epoch(1_600_000_000);
        let token = codec.mint_at(Uuid::new_v4(), "old@x.com", UserRole::Admin, t0).unwrap();

        assert!(!codec.validate(&token));
        let claims = codec.claims(&token).unwrap();
        assert_eq!(claims.email, "old@x.com");
        assert_eq!(claims.expires_at, t0 + Duration::seconds(1));
    }

    #[test]
    fn test_oversized_ttl_still_mints_live_tokens() {
        let issued_at = epoch(1_700_000_000);

        for ttl_ms in [u64::MAX, 10_u64.pow(16)] {
            let codec = codec_with_ttl(ttl_ms);
            let token = codec
                .mint_at(Uuid::new_v4(), "a@x.com", UserRole::User, issued_at)
                .unwrap();
            let claims = codec.claims(&token).unwrap();

            assert!(claims.expires_at > claims.issued_at);
            assert!(codec.validate_at(&token, issued_at));
        }
    }

    #[test]
    fn test_mint_past_calendar_end_is_an_error() {
        let codec = codec_with_ttl(3_600_000);
        let result = codec.mint_at(Uuid::new_v4(), "a@x.com", UserRole::User, DateTime::<Utc>::MAX_UTC);

        assert!(matches!(result, Err(JwtError::InvalidClaims(_))));
    }

    #[test]
    fn test_tokens_are_unique() {
        let codec = codec_with_ttl(60_000);
        let user_id = Uuid::new_v4();
        let t0 = epoch(1_700_000_000);

        let first = codec.mint_at(user_id, "a@x.com", UserRole::User, t0).unwrap();
        let second = codec.mint_at(user_id, "a@x.com", UserRole::User, t0).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_invalid_token() {
        let codec = codec_with_ttl(60_000);
        assert!(!codec.validate("invalid.token.here"));
        assert!(!codec.validate(""));
        assert!(codec.claims("not-a-jwt").is_err());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let codec = codec_with_ttl(86_400_000);
        let token = codec.mint(Uuid::new_v4(), "a@x.com", UserRole::User).unwrap();

        assert!(!codec.validate(&tamper(&token, 1)));
        assert!(!codec.validate(&tamper(&token, 2)));
        assert!(codec.claims(&tamper(&token, 2)).is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let codec1 = TokenCodec::new(&AuthConfig {
            jwt_secret: "first-secret-that-is-long-enough-for-hs512".to_string(),
            ..Default::default()
        });
        let codec2 = TokenCodec::new(&AuthConfig {
            jwt_secret: "second-secret-that-is-long-enough-for-hs512".to_string(),
            ..Default::default()
        });

        let token = codec1.mint(Uuid::new_v4(), "a@x.com", UserRole::User).unwrap();

        assert!(!codec2.validate(&token));
        assert!(matches!(codec2.claims(&token), Err(JwtError::InvalidSignature)));
    }

    #[test]
    fn test_foreign_issuer_rejected() {
        let ours = codec_with_ttl(60_000);
        let theirs = TokenCodec::new(&AuthConfig {
            issuer: "someone-else".to_string(),
            ..Default::default()
        });

        let token = theirs.mint(Uuid::new_v4(), "a@x.com", UserRole::User).unwrap();
        assert!(!ours.validate(&token));
    }

    #[test]
    fn test_unknown_role_claim_rejected() {
        let codec = codec_with_ttl(60_000);
        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: "zhiri-api".to_string(),
            sub: Uuid::new_v4().to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + 60,
            email: "a@x.com".to_string(),
            role: "ROOT".to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(AuthConfig::default().jwt_secret.as_bytes()),
        )
        .unwrap();

        assert!(matches!(codec.claims(&token), Err(JwtError::InvalidClaims(_))));
        assert!(!codec.validate(&token));
    }
}
