//! The `otpauth://` provisioning URI
//!
//! ```text
//! otpauth://{hotp|totp}/[issuer:[spaces]]account?secret=BASE32&issuer=...&algorithm=SHA1&digits=6&counter=N|period=30
//! ```
//!
//! A parsed URI keeps its query string verbatim, so serializing it reproduces the
//! parameter order, key casing and value escaping it was received with. The label is
//! re-escaped from its decoded parts.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::algorithm::OtpHmacAlgorithm;
use crate::base32;
use crate::error::OtpError;
use crate::hotp::DEFAULT_DIGITS;
use crate::totp::{RFC6238_TOTP_PERIOD, validate_period};

/// The URI scheme
pub const OTPAUTH_SCHEME: &str = "otpauth";

/// The smallest digit count a URI may carry
pub const MIN_URI_DIGITS: u32 = 6;

/// The largest digit count a URI may carry
pub const MAX_URI_DIGITS: u32 = 8;

/// Counter-based or time-based OTP, the URI authority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpType {
    /// RFC 4226, counter-based
    Hotp,
    /// RFC 6238, time-based
    Totp,
}

impl OtpType {
    #[allow(missing_docs)]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hotp => "hotp",
            Self::Totp => "totp",
        }
    }
}

impl fmt::Display for OtpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OtpType {
    type Err = OtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("hotp") {
            Ok(Self::Hotp)
        } else if s.eq_ignore_ascii_case("totp") {
            Ok(Self::Totp)
        } else {
            Err(OtpError::InvalidAuthority(s.to_owned()))
        }
    }
}

/// One `name=value` pair of the query string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParameter {
    raw: String,
    name: String,
    value: String,
}

impl QueryParameter {
    fn parse(raw: &str) -> Option<Self> {
        let (name, value) = url::form_urlencoded::parse(raw.as_bytes()).next()?;
        Some(Self {
            raw: raw.to_owned(),
            name: name.into_owned(),
            value: value.into_owned(),
        })
    }

    fn canonical(name: &str, value: &str) -> Self {
        Self {
            raw: format!("{name}={}", urlencoding::encode(value)),
            name: name.to_owned(),
            value: value.to_owned(),
        }
    }

    /// The segment exactly as it appears in the query string
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Decoded name, original casing
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decoded value
    pub fn value(&self) -> &str {
        &self.value
    }

    fn is_named(&self, lowercase_name: &str) -> bool {
        self.name.to_lowercase() == lowercase_name
    }
}

fn parse_query(query: &str) -> Vec<QueryParameter> {
    query
        .split('&')
        .filter(|segment| !segment.is_empty())
        .filter_map(QueryParameter::parse)
        .collect()
}

fn lookup<'a>(parameters: &'a [QueryParameter], name: &str) -> Option<&'a str> {
    parameters
        .iter()
        .rev()
        .find(|parameter| parameter.is_named(name))
        .map(QueryParameter::value)
}

fn parse_number<T: FromStr>(parameter: &'static str, value: &str) -> Result<T, OtpError> {
    value.trim().parse().map_err(|_| OtpError::InvalidNumber {
        parameter,
        value: value.to_owned(),
    })
}

fn validate_digits(digits: i64) -> Result<u32, OtpError> {
    u32::try_from(digits)
        .ok()
        .filter(|digits| (MIN_URI_DIGITS..=MAX_URI_DIGITS).contains(digits))
        .ok_or(OtpError::DigitsOutOfRange {
            digits,
            min: MIN_URI_DIGITS,
            max: MAX_URI_DIGITS,
        })
}

/// Split the text after the issuer colon into its leading whitespace and the account
fn split_account(rest: &str) -> (String, String) {
    let account = rest.trim_start();
    let spaces = &rest[..rest.len() - account.len()];
    (spaces.to_owned(), account.to_owned())
}

/// A validated `otpauth://` URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpAuthUri {
    otp_type: OtpType,
    label: String,
    account: String,
    issuer_label: Option<String>,
    issuer_parameter: Option<String>,
    saved_spaces: String,
    secret: String,
    secret_buf: Box<[u8]>,
    algorithm: OtpHmacAlgorithm,
    digits: u32,
    counter: Option<i64>,
    period: Option<i32>,
    query: String,
    parameters: Vec<QueryParameter>,
}

impl OtpAuthUri {
    /// Build a URI from its parts, producing the canonical query string
    /// `secret, issuer, algorithm, counter|period, digits`.
    ///
    /// - `counter_or_period`: the counter for [OtpType::Hotp], the period in seconds for [OtpType::Totp]
    pub fn new(
        otp_type: OtpType,
        secret: &[u8],
        account: &str,
        issuer: Option<&str>,
        counter_or_period: i64,
        algorithm: OtpHmacAlgorithm,
        digits: u32,
    ) -> Result<Self, OtpError> {
        if account.is_empty() {
            return Err(OtpError::EmptyAccount);
        }
        if secret.is_empty() {
            return Err(OtpError::EmptySecret);
        }
        let digits = validate_digits(digits.into())?;
        let (counter, period) = match otp_type {
            OtpType::Hotp if counter_or_period < 0 => {
                return Err(OtpError::NegativeCounter(counter_or_period));
            }
            OtpType::Hotp => (Some(counter_or_period), None),
            OtpType::Totp => {
                validate_period(counter_or_period)?;
                let period = i32::try_from(counter_or_period)
                    .map_err(|_| OtpError::PeriodOutOfRange(counter_or_period))?;
                (None, Some(period))
            }
        };
        let issuer = issuer.filter(|issuer| !issuer.is_empty());
        let encoded_secret = base32::encode(secret, false);

        let mut parameters = vec![QueryParameter::canonical("secret", &encoded_secret)];
        if let Some(issuer) = issuer {
            parameters.push(QueryParameter::canonical("issuer", issuer));
        }
        parameters.push(QueryParameter::canonical("algorithm", algorithm.as_str()));
        match (counter, period) {
            (Some(counter), _) => {
                parameters.push(QueryParameter::canonical("counter", &counter.to_string()))
            }
            (_, Some(period)) => {
                parameters.push(QueryParameter::canonical("period", &period.to_string()))
            }
            (None, None) => {}
        }
        parameters.push(QueryParameter::canonical("digits", &digits.to_string()));
        let query = parameters
            .iter()
            .map(QueryParameter::raw)
            .collect::<Vec<_>>()
            .join("&");

        let label = match issuer {
            Some(issuer) => format!("{issuer}:{account}"),
            None => account.to_owned(),
        };
        tracing::debug!(%otp_type, account, issuer, "constructed otpauth uri");

        Ok(Self {
            otp_type,
            label,
            account: account.to_owned(),
            issuer_label: issuer.map(str::to_owned),
            issuer_parameter: issuer.map(str::to_owned),
            saved_spaces: String::new(),
            secret: encoded_secret,
            secret_buf: secret.into(),
            algorithm,
            digits,
            counter,
            period,
            query,
            parameters,
        })
    }

    /// Parse and validate a URI string
    pub fn parse(uri: &str) -> Result<Self, OtpError> {
        Self::from_url(&Url::parse(uri)?)
    }

    /// Validate an already parsed [Url]
    pub fn from_url(url: &Url) -> Result<Self, OtpError> {
        if url.scheme() != OTPAUTH_SCHEME {
            return Err(OtpError::InvalidScheme(url.scheme().to_owned()));
        }

        let authority = url.host_str().unwrap_or_default();
        if url.port().is_some() || !url.username().is_empty() || url.password().is_some() {
            return Err(OtpError::InvalidAuthority(authority.to_owned()));
        }
        let otp_type: OtpType = authority.parse()?;

        let mut segments = url.path_segments().ok_or(OtpError::InvalidLabelPath)?;
        let (Some(segment), None) = (segments.next(), segments.next()) else {
            return Err(OtpError::InvalidLabelPath);
        };
        if segment.is_empty() {
            return Err(OtpError::InvalidLabelPath);
        }
        let label = urlencoding::decode(segment)
            .map_err(|_| OtpError::InvalidLabelEncoding)?
            .into_owned();

        let (mut issuer_label, mut saved_spaces, mut account) = match label.split_once(':') {
            Some((issuer, rest)) => {
                let (spaces, account) = split_account(rest);
                (Some(issuer.to_owned()), spaces, account)
            }
            None => (None, String::new(), label.clone()),
        };

        let query = url
            .query()
            .filter(|query| !query.is_empty())
            .ok_or(OtpError::MissingQuery)?;
        let parameters = parse_query(query);
        let issuer_parameter = lookup(&parameters, "issuer");

        // the issuer label ends at the first colon, so any further colon leaves the split ambiguous
        if issuer_label.is_some() && account.contains(':') {
            let issuer = issuer_parameter.ok_or(OtpError::AmbiguousLabel)?;
            let rest = label
                .strip_prefix(issuer)
                .and_then(|rest| rest.strip_prefix(':'))
                .ok_or_else(|| OtpError::IssuerMismatch {
                    issuer: issuer.to_owned(),
                    label: label.clone(),
                })?;
            (saved_spaces, account) = split_account(rest);
            issuer_label = Some(issuer.to_owned());
            tracing::debug!(issuer, "resolved label colons with issuer parameter");
        }
        if account.is_empty() {
            return Err(OtpError::EmptyAccount);
        }

        let secret = lookup(&parameters, "secret").ok_or(OtpError::MissingSecret)?;
        if secret.is_empty() {
            return Err(OtpError::EmptySecret);
        }
        let secret_buf = base32::decode(secret).map_err(OtpError::InvalidSecret)?;
        if secret_buf.is_empty() {
            return Err(OtpError::EmptySecret);
        }

        let algorithm = lookup(&parameters, "algorithm")
            .map(str::parse::<OtpHmacAlgorithm>)
            .transpose()?
            .unwrap_or_default();

        let digits = match lookup(&parameters, "digits") {
            Some(value) => validate_digits(parse_number("digits", value)?)?,
            None => DEFAULT_DIGITS,
        };

        let (counter, period) = match otp_type {
            OtpType::Hotp => {
                let value = lookup(&parameters, "counter").ok_or(OtpError::MissingCounter)?;
                let counter: i64 = parse_number("counter", value)?;
                if counter < 0 {
                    return Err(OtpError::NegativeCounter(counter));
                }
                if lookup(&parameters, "period").is_some() {
                    return Err(OtpError::UnexpectedPeriod);
                }
                (Some(counter), None)
            }
            // the period range is checked when a code is generated
            OtpType::Totp => match lookup(&parameters, "period") {
                Some(value) => (None, Some(parse_number::<i32>("period", value)?)),
                None => (None, Some(RFC6238_TOTP_PERIOD)),
            },
        };

        let issuer_parameter = issuer_parameter
            .filter(|issuer| !issuer.is_empty())
            .map(str::to_owned);
        tracing::debug!(
            %otp_type,
            account = account.as_str(),
            issuer = issuer_parameter.as_deref().or(issuer_label.as_deref()),
            "parsed otpauth uri"
        );

        Ok(Self {
            otp_type,
            label,
            account,
            issuer_label,
            issuer_parameter,
            saved_spaces,
            secret: secret.to_owned(),
            secret_buf: secret_buf.into_boxed_slice(),
            algorithm,
            digits,
            counter,
            period,
            query: query.to_owned(),
            parameters,
        })
    }

    /// Parse [OtpAuthUri::to_string] back into a [Url]
    pub fn to_url(&self) -> Result<Url, OtpError> {
        Ok(Url::parse(&self.to_string())?)
    }

    #[allow(missing_docs)]
    pub fn otp_type(&self) -> OtpType {
        self.otp_type
    }

    /// The decoded label, `issuer:account` or `account`
    pub fn label(&self) -> &str {
        &self.label
    }

    #[allow(missing_docs)]
    pub fn account(&self) -> &str {
        &self.account
    }

    /// The issuer parameter if present, else the issuer embedded in the label
    pub fn issuer(&self) -> Option<&str> {
        self.issuer_parameter
            .as_deref()
            .or(self.issuer_label.as_deref())
            .filter(|issuer| !issuer.is_empty())
    }

    /// The issuer text before the label colon
    pub fn issuer_label(&self) -> Option<&str> {
        self.issuer_label.as_deref()
    }

    /// The `issuer=` query parameter
    pub fn issuer_parameter(&self) -> Option<&str> {
        self.issuer_parameter.as_deref()
    }

    /// The base32 secret as it was supplied
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// The decoded secret
    pub fn secret_bytes(&self) -> &[u8] {
        &self.secret_buf
    }

    #[allow(missing_docs)]
    pub fn algorithm(&self) -> OtpHmacAlgorithm {
        self.algorithm
    }

    #[allow(missing_docs)]
    pub fn digits(&self) -> u32 {
        self.digits
    }

    /// Present iff the type is [OtpType::Hotp]
    pub fn counter(&self) -> Option<i64> {
        self.counter
    }

    /// Present iff the type is [OtpType::Totp]
    pub fn period(&self) -> Option<i32> {
        self.period
    }

    /// The raw query string, without the leading `?`
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Every query parameter in order of appearance
    pub fn parameters(&self) -> &[QueryParameter] {
        &self.parameters
    }

    /// Look up a query parameter by case-insensitive name, the last occurrence wins
    pub fn parameter(&self, name: &str) -> Option<&str> {
        lookup(&self.parameters, &name.to_lowercase())
    }
}

impl fmt::Display for OtpAuthUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{OTPAUTH_SCHEME}://{}/", self.otp_type)?;
        if let Some(issuer) = &self.issuer_label {
            write!(f, "{}:", urlencoding::encode(issuer))?;
        }
        write!(
            f,
            "{}{}?{}",
            urlencoding::encode(&self.saved_spaces),
            urlencoding::encode(&self.account),
            self.query
        )
    }
}

impl FromStr for OtpAuthUri {
    type Err = OtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for OtpAuthUri {
    type Error = OtpError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<&Url> for OtpAuthUri {
    type Error = OtpError;

    fn try_from(value: &Url) -> Result<Self, Self::Error> {
        Self::from_url(value)
    }
}

impl Serialize for OtpAuthUri {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OtpAuthUri {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
