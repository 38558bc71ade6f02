//! Signed, time-bounded identity tokens (HS256 JWT).

use std::sync::Arc;

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::Sha256;
use thiserror::Error;

use crate::clock::Clock;
use crate::config::AuthConfig;

type HmacSha256 = Hmac<Sha256>;

const ALG: &str = "HS256";

/// Claim names the service sets itself; callers may not supply them as extras.
pub const RESERVED_CLAIMS: [&str; 5] = ["sub", "email", "iat", "exp", "jti"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct TokenHeader {
    alg: String,
    typ: String,
}

impl TokenHeader {
    fn hs256() -> Self {
        Self {
            alg: ALG.to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// Caller-supplied payload of an identity token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Identifier of the authenticated principal.
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Any further claims, fixed at issuance.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            email: None,
            extra: Map::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenPayload {
    #[serde(flatten)]
    claims: Claims,
    iat: u64,
    exp: u64,
    jti: String,
}

/// Claims read back without any signature or expiry check.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedToken {
    pub claims: Claims,
    pub issued_at: u64,
    pub expires_at: u64,
    pub token_id: String,
}

/// Errors raised while issuing or constructing.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("signing secret is empty")]
    MissingSecret,

    #[error("token subject is empty")]
    EmptySubject,

    #[error("claim `{0}` is reserved")]
    ReservedClaim(String),

    #[error("failed to encode token: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Verification failure. Carries no reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid or expired token")]
pub struct InvalidToken;

/// Why verification failed; logged, never returned.
#[derive(Debug, Clone, Copy)]
enum Rejection {
    Malformed,
    Algorithm,
    Signature,
    Expired,
}

impl Rejection {
    fn as_str(self) -> &'static str {
        match self {
            Rejection::Malformed => "malformed",
            Rejection::Algorithm => "algorithm",
            Rejection::Signature => "signature",
            Rejection::Expired => "expired",
        }
    }
}

/// Issues and verifies identity tokens with a process-wide secret.
pub struct TokenService {
    mac: HmacSha256,
    ttl_secs: u64,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(config: &AuthConfig, clock: Arc<dyn Clock>) -> Result<Self, TokenError> {
        if config.jwt_secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }
        let mac = HmacSha256::new_from_slice(config.jwt_secret.as_bytes())
            .map_err(|_| TokenError::MissingSecret)?;
        Ok(Self {
            mac,
            ttl_secs: config.token_ttl_secs,
            clock,
        })
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Sign `claims` with an expiry of now + configured lifetime.
    pub fn issue(&self, claims: &Claims) -> Result<String, TokenError> {
        if claims.sub.is_empty() {
            return Err(TokenError::EmptySubject);
        }
        if let Some(name) = claims
            .extra
            .keys()
            .find(|k| RESERVED_CLAIMS.contains(&k.as_str()))
        {
            return Err(TokenError::ReservedClaim(name.clone()));
        }

        let iat = self.clock.now_secs();
        let payload = TokenPayload {
            claims: claims.clone(),
            iat,
            exp: iat.saturating_add(self.ttl_secs),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let header_b64 = b64e_json(&TokenHeader::hs256())?;
        let payload_b64 = b64e_json(&payload)?;
        let signing_input = format!("{header_b64}.{payload_b64}");

        let mut mac = self.mac.clone();
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();

        Ok(format!(
            "{signing_input}.{}",
            Base64UrlUnpadded::encode_string(&signature)
        ))
    }

    /// Check signature, structure and expiry. The caller learns only that it failed.
    pub fn verify(&self, token: &str) -> Result<Claims, InvalidToken> {
        self.check(token).map_err(|rejection| {
            tracing::debug!(reason = rejection.as_str(), "Token rejected");
            InvalidToken
        })
    }

    fn check(&self, token: &str) -> Result<Claims, Rejection> {
        let (header_b64, payload_b64, signature_b64) = split(token).ok_or(Rejection::Malformed)?;

        let header: TokenHeader = b64d_json(header_b64).ok_or(Rejection::Malformed)?;
        if header.alg != ALG {
            return Err(Rejection::Algorithm);
        }

        let signature = Base64UrlUnpadded::decode_vec(signature_b64).map_err(|_| Rejection::Malformed)?;
        let mut mac = self.mac.clone();
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(payload_b64.as_bytes());
        mac.verify_slice(&signature).map_err(|_| Rejection::Signature)?;

        let payload: TokenPayload = b64d_json(payload_b64).ok_or(Rejection::Malformed)?;
        if self.clock.now_secs() >= payload.exp {
            return Err(Rejection::Expired);
        }

        Ok(payload.claims)
    }

    /// Read a token's payload without checking it. Diagnostics only:
    /// never authorize anything on the strength of this.
    pub fn decode(token: &str) -> Option<DecodedToken> {
        let (_, payload_b64, _) = split(token)?;
        let payload: TokenPayload = b64d_json(payload_b64)?;
        Some(DecodedToken {
            claims: payload.claims,
            issued_at: payload.iat,
            expires_at: payload.exp,
            token_id: payload.jti,
        })
    }
}

fn split(token: &str) -> Option<(&str, &str, &str)> {
    let mut parts = token.split('.');
    let header = parts.next()?;
    let payload = parts.next()?;
    let signature = parts.next()?;
    if parts.next().is_some() || header.is_empty() || payload.is_empty() || signature.is_empty() {
        return None;
    }
    Some((header, payload, signature))
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Option<T> {
    let bytes = Base64UrlUnpadded::decode_vec(s).ok()?;
    serde_json::from_slice(&bytes).ok()
}
