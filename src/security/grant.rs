//! Download grants.
//!
//! A grant is a short-lived, signed, non-session credential authorizing one
//! protected static asset. Minted only after successful mail delivery and
//! carried in a cookie whose Max-Age equals the TTL, so the browser expires
//! it on its own.
//!
//! Wire form: `kind.expiryEpochSecs.base64url(hmac-sha256(kind:expiry))`.
//! MAC-only rather than an encrypted blob: the grant carries no secrets,
//! only integrity matters.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::security::csrf::constant_time_eq;

type HmacSha256 = Hmac<Sha256>;

/// Name of the grant cookie.
pub const GRANT_COOKIE: &str = "dl_grant";

/// The asset a grant is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantKind {
    Quotes,
    Brochure,
}

impl GrantKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GrantKind::Quotes => "quotes",
            GrantKind::Brochure => "brochure",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "quotes" => Some(GrantKind::Quotes),
            "brochure" => Some(GrantKind::Brochure),
            _ => None,
        }
    }
}

/// Why a presented grant was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantError {
    Malformed,
    Expired,
    BadSignature,
}

/// Issues and verifies signed download grants.
pub struct GrantIssuer {
    key: [u8; 32],
    ttl_secs: u64,
}

impl GrantIssuer {
    /// Derive the signing key from the configured secret.
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        let mut key = [0u8; 32];
        key.copy_from_slice(&hasher.finalize());
        Self { key, ttl_secs }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Mint a grant expiring `ttl_secs` from now.
    pub fn issue(&self, kind: GrantKind) -> String {
        self.issue_at(kind, now_epoch() + self.ttl_secs)
    }

    /// Encode the grant as a `Set-Cookie` value.
    pub fn cookie(&self, kind: GrantKind) -> String {
        format!(
            "{}={}; Max-Age={}; Path=/; HttpOnly; Secure; SameSite=Strict",
            GRANT_COOKIE,
            self.issue(kind),
            self.ttl_secs
        )
    }

    /// Verify a presented grant value; returns its kind when valid.
    pub fn verify(&self, value: &str) -> Result<GrantKind, GrantError> {
        let mut parts = value.splitn(3, '.');
        let kind_str = parts.next().ok_or(GrantError::Malformed)?;
        let expiry_str = parts.next().ok_or(GrantError::Malformed)?;
        let sig_b64 = parts.next().ok_or(GrantError::Malformed)?;

        let kind = GrantKind::parse(kind_str).ok_or(GrantError::Malformed)?;
        let expiry: u64 = expiry_str.parse().map_err(|_| GrantError::Malformed)?;
        let presented = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| GrantError::Malformed)?;

        let expected = self.sign(kind, expiry);
        if !constant_time_eq(&presented, &expected) {
            return Err(GrantError::BadSignature);
        }
        if expiry <= now_epoch() {
            return Err(GrantError::Expired);
        }
        Ok(kind)
    }

    fn issue_at(&self, kind: GrantKind, expiry: u64) -> String {
        let sig = self.sign(kind, expiry);
        format!(
            "{}.{}.{}",
            kind.as_str(),
            expiry,
            URL_SAFE_NO_PAD.encode(sig)
        )
    }

    fn sign(&self, kind: GrantKind, expiry: u64) -> Vec<u8> {
        let mut mac =
            <HmacSha256 as Mac>::new_from_slice(&self.key).expect("HMAC accepts any key size");
        mac.update(kind.as_str().as_bytes());
        mac.update(b":");
        mac.update(expiry.to_string().as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
