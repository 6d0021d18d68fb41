#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]
#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![doc = include_str!("../README.md")]

/// RFC 4648 base32 codec for OTP secrets
pub mod base32;

/// HMAC algorithm selection
pub mod algorithm;

/// Error types
pub mod error;

/// HOTP (HMAC-based One-Time Password) generation and the counter-driven authenticator
pub mod hotp;

/// TOTP (Time-based One-Time Password) generation and the time-driven authenticator
pub mod totp;

pub mod uri;

pub use algorithm::OtpHmacAlgorithm;
pub use error::{ErrorKind, OtpError};
pub use hotp::{HotpAuthenticator, HotpSecret, HotpValue};
pub use totp::{TotpAuthenticator, TotpSecret, TotpValue};
pub use uri::{OtpAuthUri, OtpType, QueryParameter};
