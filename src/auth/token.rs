//! Signed identity tokens.
//!
//! A token is three hex segments joined by dots: a header pinning the signing
//! algorithm, a claim set binding one account number with an expiry, and an
//! HMAC-SHA256 tag over the first two segments. Verification is stateless;
//! there is no server-side session or revocation list.

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::BankError;

type HmacSha256 = Hmac<Sha256>;

/// Validity window for a freshly minted token.
const TOKEN_TTL_SECS: i64 = 5 * 60;

const SIGNING_ALG: &str = "HS256";

#[derive(Debug, Clone, PartialEq)]
pub enum TokenError {
    Malformed,
    WrongAlgorithm,
    BadSignature,
    Expired,
    Encoding,
}

impl From<TokenError> for BankError {
    fn from(_: TokenError) -> Self {
        BankError::InvalidToken
    }
}

#[derive(Serialize, Deserialize, Debug)]
struct TokenHeader {
    alg: String,
    typ: String,
}

/// Claim set carried by every token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Claims {
    pub account_number: i64,
    /// Expiry as unix seconds.
    pub exp: i64,
}

/// Mints and verifies tokens with a symmetric secret held for the process
/// lifetime. The secret comes from startup configuration and is never logged.
pub struct TokenService {
    secret: Vec<u8>,
}

impl TokenService {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Produce a token for `account_number`, valid for five minutes.
    pub fn mint(&self, account_number: i64) -> Result<String, TokenError> {
        self.mint_at(account_number, Utc::now().timestamp())
    }

    /// Verify signature, algorithm, and expiry, yielding the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    fn mint_at(&self, account_number: i64, issued_at: i64) -> Result<String, TokenError> {
        let header = TokenHeader {
            alg: SIGNING_ALG.to_string(),
            typ: "token".to_string(),
        };
        let claims = Claims {
            account_number,
            exp: issued_at + TOKEN_TTL_SECS,
        };

        let header_hex =
            hex::encode(serde_json::to_vec(&header).map_err(|_| TokenError::Encoding)?);
        let claims_hex =
            hex::encode(serde_json::to_vec(&claims).map_err(|_| TokenError::Encoding)?);

        let tag = self.sign(&header_hex, &claims_hex)?;
        Ok(format!("{header_hex}.{claims_hex}.{tag}"))
    }

    fn verify_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let parts: Vec<&str> = token.split('.').collect();
        let [header_hex, claims_hex, tag_hex] = parts.as_slice() else {
            return Err(TokenError::Malformed);
        };

        let header_bytes = hex::decode(header_hex).map_err(|_| TokenError::Malformed)?;
        let header: TokenHeader =
            serde_json::from_slice(&header_bytes).map_err(|_| TokenError::Malformed)?;
        if header.alg != SIGNING_ALG {
            return Err(TokenError::WrongAlgorithm);
        }

        // Check the signature before trusting anything in the claims.
        let tag = hex::decode(tag_hex).map_err(|_| TokenError::Malformed)?;
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| TokenError::Encoding)?;
        mac.update(header_hex.as_bytes());
        mac.update(b".");
        mac.update(claims_hex.as_bytes());
        mac.verify_slice(&tag).map_err(|_| TokenError::BadSignature)?;

        let claims_bytes = hex::decode(claims_hex).map_err(|_| TokenError::Malformed)?;
        let claims: Claims =
            serde_json::from_slice(&claims_bytes).map_err(|_| TokenError::Malformed)?;

        if claims.exp <= now {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn sign(&self, header_hex: &str, claims_hex: &str) -> Result<String, TokenError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| TokenError::Encoding)?;
        mac.update(header_hex.as_bytes());
        mac.update(b".");
        mac.update(claims_hex.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}
