use ring::hmac;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::OtpError;

/// HMAC hash function used to derive OTP codes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OtpHmacAlgorithm {
    /// HMAC-SHA1, 20 byte digest
    #[default]
    #[serde(rename = "SHA1")]
    Sha1,
    /// HMAC-SHA256, 32 byte digest
    #[serde(rename = "SHA256")]
    Sha256,
    /// HMAC-SHA384, 48 byte digest
    #[serde(rename = "SHA384")]
    Sha384,
    /// HMAC-SHA512, 64 byte digest
    #[serde(rename = "SHA512")]
    Sha512,
}

impl OtpHmacAlgorithm {
    /// All supported algorithms
    pub const ALL: [Self; 4] = [Self::Sha1, Self::Sha256, Self::Sha384, Self::Sha512];

    /// Canonical `algorithm=` token
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Sha384 => "SHA384",
            Self::Sha512 => "SHA512",
        }
    }

    fn ring_algorithm(&self) -> hmac::Algorithm {
        match self {
            Self::Sha1 => hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY,
            Self::Sha256 => hmac::HMAC_SHA256,
            Self::Sha384 => hmac::HMAC_SHA384,
            Self::Sha512 => hmac::HMAC_SHA512,
        }
    }

    /// Digest length in bytes
    pub fn digest_len(&self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Compute `HMAC(key, data)`
    pub fn hmac(&self, key: &[u8], data: &[u8]) -> Vec<u8> {
        let key = hmac::Key::new(self.ring_algorithm(), key);
        hmac::sign(&key, data).as_ref().to_vec()
    }
}

impl fmt::Display for OtpHmacAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OtpHmacAlgorithm {
    type Err = OtpError;

    /// Case-insensitive match against the canonical tokens
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|algorithm| algorithm.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| OtpError::UnknownAlgorithm(s.to_owned()))
    }
}
