use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::algorithm::OtpHmacAlgorithm;
use crate::base32::{self, Base32Error};
use crate::error::OtpError;
use crate::uri::{OtpAuthUri, OtpType};

/// The default number of digits of an OTP code
pub const DEFAULT_DIGITS: u32 = 6;

/// The smallest digit count [truncate] accepts
pub const MIN_TRUNCATED_DIGITS: u32 = 6;

/// The largest digit count [truncate] accepts
pub const MAX_TRUNCATED_DIGITS: u32 = 10;

/// Encode a counter as the 8 byte big-endian HMAC message
pub fn counter_to_buffer(counter: i64) -> Result<[u8; 8], OtpError> {
    if counter < 0 {
        return Err(OtpError::NegativeCounter(counter));
    }
    Ok(counter.to_be_bytes())
}

/// Compute the HMAC of a counter buffer
pub fn calculate_hmac(algorithm: OtpHmacAlgorithm, key: &[u8], buffer: &[u8]) -> Vec<u8> {
    algorithm.hmac(key, buffer)
}

/// Dynamic truncation (RFC 4226 section 5.3) of an HMAC digest into a zero-padded decimal code
///
/// - `digest`: at least 20 bytes
/// - `digits`: between [MIN_TRUNCATED_DIGITS] and [MAX_TRUNCATED_DIGITS]
pub fn truncate(digest: &[u8], digits: u32) -> Result<String, OtpError> {
    if !(MIN_TRUNCATED_DIGITS..=MAX_TRUNCATED_DIGITS).contains(&digits) {
        return Err(OtpError::DigitsOutOfRange {
            digits: digits.into(),
            min: MIN_TRUNCATED_DIGITS,
            max: MAX_TRUNCATED_DIGITS,
        });
    }
    let last = digest.last().ok_or(OtpError::DigestTooShort(0))?;
    let offset = (last & 0x0f) as usize;
    let window = digest
        .get(offset..offset + 4)
        .ok_or(OtpError::DigestTooShort(digest.len()))?;
    let code = ((window[0] & 0x7f) as u64) << 24
        | (window[1] as u64) << 16
        | (window[2] as u64) << 8
        | window[3] as u64;
    let code = code % 10u64.pow(digits);
    Ok(format!("{code:0>width$}", width = digits as usize))
}

/// A single HOTP code and the counter it was derived from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotpValue {
    /// The counter value
    pub counter: i64,
    /// The decimal code
    pub code: String,
}

/// HOTP secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotpSecret(Box<[u8]>);

impl AsRef<[u8]> for HotpSecret {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl HotpSecret {
    /// Create a new HOTP secret from a byte array
    pub fn new(secret: &[u8]) -> Self {
        Self(secret.into())
    }

    /// Create a new HOTP secret from a base32 encoded string
    pub fn try_from_base32(secret: impl AsRef<str>) -> Result<Self, Base32Error> {
        let secret = base32::decode(secret.as_ref())?.into_boxed_slice();
        Ok(Self(secret))
    }

    /// Generate a HOTP code
    ///
    /// - `counter`: the counter value, must not be negative
    /// - `digits`: the code length
    pub fn generate(
        &self,
        algorithm: OtpHmacAlgorithm,
        counter: i64,
        digits: u32,
    ) -> Result<String, OtpError> {
        let buffer = counter_to_buffer(counter)?;
        let digest = calculate_hmac(algorithm, &self.0, &buffer);
        truncate(&digest, digits)
    }

    /// Generate the codes for `length` consecutive counters starting at `counter`
    pub fn sequence(
        &self,
        algorithm: OtpHmacAlgorithm,
        counter: i64,
        length: usize,
        digits: u32,
    ) -> Result<Vec<HotpValue>, OtpError> {
        (0..length)
            .map(|i| {
                let counter = i64::try_from(i)
                    .ok()
                    .and_then(|i| counter.checked_add(i))
                    .ok_or(OtpError::CounterOverflow)?;
                Ok(HotpValue {
                    counter,
                    code: self.generate(algorithm, counter, digits)?,
                })
            })
            .collect()
    }
}

/// Counter-driven authenticator over a `hotp` [OtpAuthUri]
///
/// Mutating the counter replaces the wrapped URI with a canonically constructed one,
/// so the query formatting of a parsed URI does not survive it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotpAuthenticator {
    uri: OtpAuthUri,
}

impl HotpAuthenticator {
    /// Wrap a URI, which must be of type `hotp`
    pub fn new(uri: OtpAuthUri) -> Result<Self, OtpError> {
        if uri.otp_type() != OtpType::Hotp {
            return Err(OtpError::WrongOtpType {
                expected: OtpType::Hotp,
                actual: uri.otp_type(),
            });
        }
        Ok(Self { uri })
    }

    /// The wrapped URI
    pub fn uri(&self) -> &OtpAuthUri {
        &self.uri
    }

    #[allow(missing_docs)]
    pub fn otp_type(&self) -> OtpType {
        self.uri.otp_type()
    }

    #[allow(missing_docs)]
    pub fn label(&self) -> &str {
        self.uri.label()
    }

    #[allow(missing_docs)]
    pub fn issuer(&self) -> Option<&str> {
        self.uri.issuer()
    }

    #[allow(missing_docs)]
    pub fn account(&self) -> &str {
        self.uri.account()
    }

    #[allow(missing_docs)]
    pub fn algorithm(&self) -> OtpHmacAlgorithm {
        self.uri.algorithm()
    }

    #[allow(missing_docs)]
    pub fn digits(&self) -> u32 {
        self.uri.digits()
    }

    /// The current counter
    pub fn counter(&self) -> i64 {
        // hotp uris always carry a counter
        self.uri.counter().unwrap_or_default()
    }

    /// The code for the current counter
    pub fn code(&self) -> Result<String, OtpError> {
        HotpSecret::new(self.uri.secret_bytes()).generate(
            self.uri.algorithm(),
            self.counter(),
            self.uri.digits(),
        )
    }

    /// The codes for `length` counters starting at the current one, without advancing it
    pub fn sequence(&self, length: usize) -> Result<Vec<HotpValue>, OtpError> {
        HotpSecret::new(self.uri.secret_bytes()).sequence(
            self.uri.algorithm(),
            self.counter(),
            length,
            self.uri.digits(),
        )
    }

    /// Advance the counter by one
    pub fn increment_counter(&mut self) -> Result<(), OtpError> {
        let next = self
            .counter()
            .checked_add(1)
            .ok_or(OtpError::CounterOverflow)?;
        self.set_counter(next)
    }

    /// Replace the counter, rebuilding the wrapped URI
    pub fn set_counter(&mut self, counter: i64) -> Result<(), OtpError> {
        tracing::debug!(
            account = self.uri.account(),
            counter,
            "rebuilding hotp uri, parsed query formatting is discarded"
        );
        self.uri = OtpAuthUri::new(
            OtpType::Hotp,
            self.uri.secret_bytes(),
            self.uri.account(),
            self.uri.issuer(),
            counter,
            self.uri.algorithm(),
            self.uri.digits(),
        )?;
        Ok(())
    }
}

impl FromStr for HotpAuthenticator {
    type Err = OtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.parse()?)
    }
}

impl fmt::Display for HotpAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.uri, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const RFC4226_SECRET: &[u8] = b"12345678901234567890";

    const RFC4226_CODES: [&str; 10] = [
        "755224", "287082", "359152", "969429", "338314",
        "254676", "287922", "162583", "399871", "520489",
    ];

    // RFC 4226 Appendix D intermediate HMAC-SHA1 values for counters 0, 1 and 9
    const RFC4226_DIGESTS: [(i64, [u8; 20]); 3] = [
        (0, [
            0xcc, 0x93, 0xcf, 0x18, 0x50, 0x8d, 0x94, 0x93, 0x4c, 0x64,
            0xb6, 0x5d, 0x8b, 0xa7, 0x66, 0x7f, 0xb7, 0xcd, 0xe4, 0xb0,
        ]),
        (1, [
            0x75, 0xa4, 0x8a, 0x19, 0xd4, 0xcb, 0xe1, 0x00, 0x64, 0x4e,
            0x8a, 0xc1, 0x39, 0x7e, 0xea, 0x74, 0x7a, 0x2d, 0x33, 0xab,
        ]),
        (9, [
            0x16, 0x37, 0x40, 0x98, 0x09, 0xa6, 0x79, 0xdc, 0x69, 0x82,
            0x07, 0x31, 0x0c, 0x8c, 0x7f, 0xc0, 0x72, 0x90, 0xd9, 0xe5,
        ]),
    ];

    const HOTP_URI: &str = "otpauth://hotp/NOBODY:petrsnd@gmail.com?issuer=NOBODY&secret=GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ&algorithm=SHA1&digits=6&counter=0";

    #[test]
    fn counter_buffer_is_big_endian() {
        assert_eq!(counter_to_buffer(0).unwrap(), [0; 8]);
        assert_eq!(counter_to_buffer(1).unwrap(), [0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(
            counter_to_buffer(37037036).unwrap(),
            [0x00, 0x00, 0x00, 0x00, 0x02, 0x35, 0x23, 0xec]
        );
        assert_eq!(
            counter_to_buffer(22242871217).unwrap(),
            [0x00, 0x00, 0x00, 0x05, 0x2d, 0xc7, 0x47, 0xb1]
        );
        assert_eq!(
            counter_to_buffer(i64::MAX).unwrap(),
            [0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
        );
    }

    #[test]
    fn negative_counter_is_a_range_error() {
        let err = counter_to_buffer(-1).unwrap_err();
        assert_eq!(err, OtpError::NegativeCounter(-1));
        assert_eq!(err.kind(), ErrorKind::Range);
    }

    #[test]
    fn rfc4226_hmac_and_truncation() {
        for (counter, digest) in RFC4226_DIGESTS {
            let buffer = counter_to_buffer(counter).unwrap();
            assert_eq!(
                calculate_hmac(OtpHmacAlgorithm::Sha1, RFC4226_SECRET, &buffer),
                digest
            );
            assert_eq!(truncate(&digest, 6).unwrap(), RFC4226_CODES[counter as usize]);
        }
    }

    #[test]
    fn truncate_digit_bounds() {
        let digest = RFC4226_DIGESTS[0].1;
        // 0x4c93cf18 = 1284755224
        assert_eq!(truncate(&digest, 10).unwrap(), "1284755224");
        assert_eq!(truncate(&digest, 8).unwrap(), "84755224");
        assert!(matches!(
            truncate(&digest, 5),
            Err(OtpError::DigitsOutOfRange { digits: 5, .. })
        ));
        assert!(truncate(&digest, 11).is_err());
    }

    #[test]
    fn truncate_rejects_short_digest() {
        assert_eq!(truncate(&[], 6), Err(OtpError::DigestTooShort(0)));
        assert_eq!(truncate(&[0x0f; 10], 6), Err(OtpError::DigestTooShort(10)));
    }

    #[test]
    fn rfc4226_codes() {
        let secret = HotpSecret::new(RFC4226_SECRET);
        for (counter, expected) in RFC4226_CODES.iter().enumerate() {
            let code = secret
                .generate(OtpHmacAlgorithm::Sha1, counter as i64, 6)
                .unwrap();
            assert_eq!(&code, expected, "HOTP mismatch at counter {counter}");
        }
    }

    #[test]
    fn rfc4226_sequence() {
        let secret = HotpSecret::try_from_base32("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ").unwrap();
        let values = secret.sequence(OtpHmacAlgorithm::Sha1, 0, 10, 6).unwrap();
        assert_eq!(values.len(), 10);
        for (i, value) in values.iter().enumerate() {
            assert_eq!(value.counter, i as i64);
            assert_eq!(value.code, RFC4226_CODES[i]);
        }
    }

    #[test]
    fn sequence_does_not_wrap() {
        let secret = HotpSecret::new(RFC4226_SECRET);
        let values = secret
            .sequence(OtpHmacAlgorithm::Sha1, i64::MAX - 1, 2, 6)
            .unwrap();
        assert_eq!(values[1].counter, i64::MAX);
        assert_eq!(
            secret.sequence(OtpHmacAlgorithm::Sha1, i64::MAX, 2, 6),
            Err(OtpError::CounterOverflow)
        );
    }

    #[test]
    fn authenticator_rejects_totp_uri() {
        let err = "otpauth://totp/NOBODY:petrsnd@gmail.com?issuer=NOBODY&secret=GEZDGNBVGY3TQOJQ&algorithm=SHA256&digits=8"
            .parse::<HotpAuthenticator>()
            .unwrap_err();
        assert_eq!(
            err,
            OtpError::WrongOtpType { expected: OtpType::Hotp, actual: OtpType::Totp }
        );
    }

    #[test]
    fn authenticator_code_and_sequence() {
        let authenticator: HotpAuthenticator = HOTP_URI.parse().unwrap();
        assert_eq!(authenticator.code().unwrap(), "755224");
        assert_eq!(authenticator.issuer(), Some("NOBODY"));
        assert_eq!(authenticator.account(), "petrsnd@gmail.com");

        let codes: Vec<String> = authenticator
            .sequence(10)
            .unwrap()
            .into_iter()
            .map(|value| value.code)
            .collect();
        assert_eq!(codes, RFC4226_CODES);
        assert_eq!(authenticator.counter(), 0);
    }

    #[test]
    fn increment_counter_walks_the_sequence() {
        let mut authenticator: HotpAuthenticator = HOTP_URI.parse().unwrap();
        for expected in RFC4226_CODES {
            assert_eq!(authenticator.code().unwrap(), expected);
            authenticator.increment_counter().unwrap();
        }
        assert_eq!(authenticator.counter(), 10);
        assert_eq!(
            authenticator.to_string(),
            "otpauth://hotp/NOBODY:petrsnd%40gmail.com?secret=GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ&issuer=NOBODY&algorithm=SHA1&counter=10&digits=6"
        );
    }

    #[test]
    fn set_counter_rebuilds_uri() {
        let mut authenticator: HotpAuthenticator = HOTP_URI.parse().unwrap();
        authenticator.set_counter(9).unwrap();
        assert_eq!(authenticator.code().unwrap(), "520489");
        assert_eq!(authenticator.uri().counter(), Some(9));
        assert_eq!(
            authenticator.uri().parameters().iter().map(|p| p.name()).collect::<Vec<_>>(),
            ["secret", "issuer", "algorithm", "counter", "digits"]
        );
        assert_eq!(authenticator.set_counter(-3), Err(OtpError::NegativeCounter(-3)));
        assert_eq!(authenticator.counter(), 9);
    }

    #[test]
    fn increment_counter_overflow() {
        let uri = format!(
            "otpauth://hotp/NOBODY:petrsnd@gmail.com?issuer=NOBODY&secret=GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ&algorithm=SHA1&digits=6&counter={}",
            i64::MAX
        );
        let mut authenticator: HotpAuthenticator = uri.parse().unwrap();
        let err = authenticator.increment_counter().unwrap_err();
        assert_eq!(err, OtpError::CounterOverflow);
        assert_eq!(err.kind(), ErrorKind::Range);
        assert_eq!(authenticator.counter(), i64::MAX);
    }
}
