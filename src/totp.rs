use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::algorithm::OtpHmacAlgorithm;
use crate::base32::{self, Base32Error};
use crate::error::OtpError;
use crate::hotp::HotpSecret;
use crate::uri::{OtpAuthUri, OtpType};

/// The default period of TOTP code in seconds
pub const RFC6238_TOTP_PERIOD: i32 = 30;

/// The shortest accepted period in seconds
pub const MIN_TOTP_PERIOD: i32 = 1;

/// The longest accepted period in seconds
pub const MAX_TOTP_PERIOD: i32 = 3600;

pub(crate) fn validate_period(period: i64) -> Result<(), OtpError> {
    if !(MIN_TOTP_PERIOD as i64..=MAX_TOTP_PERIOD as i64).contains(&period) {
        return Err(OtpError::PeriodOutOfRange(period));
    }
    Ok(())
}

/// Map a unix time onto its time-step counter, `floor(unix_time / period)`
pub fn counter_at(unix_time: i64, period: i32) -> Result<i64, OtpError> {
    validate_period(period.into())?;
    Ok(unix_time.div_euclid(period.into()))
}

/// A TOTP code together with the time step it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotpValue {
    /// Start of the time step
    pub timestamp: DateTime<Utc>,
    /// Start of the time step as unix seconds
    pub unix_time: i64,
    /// The time-step counter
    pub counter: i64,
    /// The period in seconds
    pub period: i32,
    /// The decimal code
    pub code: String,
}

/// TOTP secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotpSecret(Box<[u8]>);

impl AsRef<[u8]> for TotpSecret {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TotpSecret {
    /// Create a new TOTP secret from a byte array
    pub fn new(secret: &[u8]) -> Self {
        Self(secret.into())
    }

    /// Create a new TOTP secret from a base32 encoded string
    pub fn try_from_base32(secret: impl AsRef<str>) -> Result<Self, Base32Error> {
        let secret = base32::decode(secret.as_ref())?.into_boxed_slice();
        Ok(Self(secret))
    }

    /// Generate a TOTP code at the given unix time
    pub fn generate(
        &self,
        unix_time: i64,
        period: i32,
        algorithm: OtpHmacAlgorithm,
        digits: u32,
    ) -> Result<String, OtpError> {
        let counter = counter_at(unix_time, period)?;
        HotpSecret::new(&self.0).generate(algorithm, counter, digits)
    }

    /// Generate a TOTP code at the given timestamp, in any time zone
    pub fn generate_at<Tz: TimeZone>(
        &self,
        timestamp: &DateTime<Tz>,
        period: i32,
        algorithm: OtpHmacAlgorithm,
        digits: u32,
    ) -> Result<String, OtpError> {
        self.generate(timestamp.timestamp(), period, algorithm, digits)
    }

    /// Generate one value per time step from `start_unix_time` to `start_unix_time + range_seconds`
    ///
    /// Both ends are inclusive, so a zero range still yields the current step.
    /// A negative range yields nothing.
    pub fn range(
        &self,
        start_unix_time: i64,
        range_seconds: i64,
        period: i32,
        algorithm: OtpHmacAlgorithm,
        digits: u32,
    ) -> Result<Vec<TotpValue>, OtpError> {
        validate_period(period.into())?;
        let hotp = HotpSecret::new(&self.0);
        let end = start_unix_time.saturating_add(range_seconds);

        let mut values = Vec::new();
        let mut time = start_unix_time;
        while time <= end {
            let counter = counter_at(time, period)?;
            let code = hotp.generate(algorithm, counter, digits)?;
            let unix_time = counter * i64::from(period);
            let timestamp = DateTime::<Utc>::from_timestamp(unix_time, 0)
                .ok_or(OtpError::TimestampOutOfRange(unix_time))?;
            values.push(TotpValue {
                timestamp,
                unix_time,
                counter,
                period,
                code,
            });
            match time.checked_add(period.into()) {
                Some(next) => time = next,
                None => break,
            }
        }
        Ok(values)
    }

    /// [TotpSecret::range] with a timestamp start and a [Duration] length
    pub fn range_at<Tz: TimeZone>(
        &self,
        start: &DateTime<Tz>,
        range: Duration,
        period: i32,
        algorithm: OtpHmacAlgorithm,
        digits: u32,
    ) -> Result<Vec<TotpValue>, OtpError> {
        self.range(start.timestamp(), range.num_seconds(), period, algorithm, digits)
    }
}

/// Time-driven authenticator over a `totp` [OtpAuthUri]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotpAuthenticator {
    uri: OtpAuthUri,
}

impl TotpAuthenticator {
    /// Wrap a URI, which must be of type `totp`
    pub fn new(uri: OtpAuthUri) -> Result<Self, OtpError> {
        if uri.otp_type() != OtpType::Totp {
            return Err(OtpError::WrongOtpType {
                expected: OtpType::Totp,
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

    /// The period in seconds
    pub fn period(&self) -> i32 {
        self.uri.period().unwrap_or(RFC6238_TOTP_PERIOD)
    }

    fn secret(&self) -> TotpSecret {
        TotpSecret::new(self.uri.secret_bytes())
    }

    /// The code for the current time
    pub fn code(&self) -> Result<String, OtpError> {
        self.code_at(&Utc::now())
    }

    /// The code at `timestamp`
    pub fn code_at<Tz: TimeZone>(&self, timestamp: &DateTime<Tz>) -> Result<String, OtpError> {
        self.secret()
            .generate_at(timestamp, self.period(), self.uri.algorithm(), self.uri.digits())
    }

    /// The codes from now until `range` from now
    pub fn range(&self, range: Duration) -> Result<Vec<TotpValue>, OtpError> {
        self.range_at(&Utc::now(), range)
    }

    /// The codes from `start` until `start + range`
    pub fn range_at<Tz: TimeZone>(
        &self,
        start: &DateTime<Tz>,
        range: Duration,
    ) -> Result<Vec<TotpValue>, OtpError> {
        self.secret().range_at(
            start,
            range,
            self.period(),
            self.uri.algorithm(),
            self.uri.digits(),
        )
    }
}

impl FromStr for TotpAuthenticator {
    type Err = OtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.parse()?)
    }
}

impl fmt::Display for TotpAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.uri, f)
    }
}
