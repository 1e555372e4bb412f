// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session tokens: HS256 JWTs carrying `{iat, exp}` claims.

use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use strongbox_config::SecurityConfig;
use strongbox_core::StrongboxError;
use tracing::{info, warn};

/// Length of the per-process secret used when none is configured.
const GENERATED_SECRET_LEN: usize = 32;

/// Claims carried by a session token, in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(rename = "iat")]
    pub issued_at: i64,
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

/// An issued bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SessionToken").field(&"[REDACTED]").finish()
    }
}

/// Signs and checks session tokens.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("key", &"[REDACTED]")
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "iat"]);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
        }
    }

    /// Build from `[security]`, generating a random secret when none is set.
    ///
    /// Tokens signed with a generated secret do not survive a restart.
    pub fn from_config(config: &SecurityConfig) -> Result<Self, StrongboxError> {
        match &config.token_secret {
            Some(secret) => {
                info!("using configured token secret");
                Ok(Self::new(secret.as_bytes(), config.token_ttl_secs))
            }
            None => {
                let mut secret = zeroize::Zeroizing::new([0u8; GENERATED_SECRET_LEN]);
                SystemRandom::new().fill(&mut secret[..]).map_err(|_| {
                    StrongboxError::Internal("failed to generate token secret".to_string())
                })?;
                warn!("security.token_secret not set, tokens are valid for this process only");
                Ok(Self::new(&secret[..], config.token_ttl_secs))
            }
        }
    }

    /// Issue a token valid from now for the configured TTL.
    pub fn issue(&self) -> Result<SessionToken, StrongboxError> {
        self.issue_at(chrono::Utc::now().timestamp())
    }

    /// Check signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, StrongboxError> {
        let data = decode::<TokenClaims>(token.trim(), &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => StrongboxError::InvalidToken("expired".to_string()),
                JwtErrorKind::InvalidSignature => {
                    StrongboxError::InvalidToken("signature mismatch".to_string())
                }
                _ => StrongboxError::InvalidToken("malformed".to_string()),
            })?;
        Ok(data.claims)
    }

    fn issue_at(&self, now: i64) -> Result<SessionToken, StrongboxError> {
        let claims = TokenClaims {
            issued_at: now,
            expires_at: now.saturating_add(self.ttl_secs),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map(SessionToken)
            .map_err(|e| StrongboxError::Internal(format!("failed to sign token: {e}")))
    }
}
