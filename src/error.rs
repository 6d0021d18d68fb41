use crate::base32::Base32Error;

/// Broad classification of an [OtpError]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input text is syntactically malformed (URI, label, base32)
    Format,
    /// Input is well-formed but violates an OTP constraint
    Validation,
    /// A numeric value falls outside what can be represented or computed
    Range,
}

/// Error type for OTP parsing, construction and code generation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OtpError {
    /// The URI could not be parsed at all
    #[error("Malformed URI: {0}")]
    MalformedUri(#[from] url::ParseError),
    /// The URI scheme is not `otpauth`
    #[error("URI scheme must be 'otpauth', got '{0}'")]
    InvalidScheme(String),
    /// The URI authority is not `hotp` or `totp`
    #[error("URI authority must be one of 'hotp' or 'totp', got '{0}'")]
    InvalidAuthority(String),
    /// The URI path is not exactly one label segment
    #[error("URI must contain exactly one label segment after the authority")]
    InvalidLabelPath,
    /// The label does not percent-decode to UTF-8
    #[error("URI label is not valid percent-encoded UTF-8")]
    InvalidLabelEncoding,
    /// The URI has no query string
    #[error("URI must contain a query string")]
    MissingQuery,

    /// The account name is empty
    #[error("Account must be specified")]
    EmptyAccount,
    /// No `secret` parameter
    #[error("URI must contain a parameter called 'secret'")]
    MissingSecret,
    /// The secret is empty
    #[error("Secret must not be empty")]
    EmptySecret,
    /// The secret is not valid base32
    #[error("Secret is not valid base32: {0}")]
    InvalidSecret(#[source] Base32Error),
    /// The `algorithm` parameter names no supported algorithm
    #[error("Algorithm must be one of 'SHA1', 'SHA256', 'SHA384', 'SHA512', got '{0}'")]
    UnknownAlgorithm(String),
    /// A numeric query parameter did not parse
    #[error("URI {parameter} query parameter must be numeric, got '{value}'")]
    InvalidNumber {
        /// Parameter name
        parameter: &'static str,
        /// Raw value
        value: String,
    },
    /// Digit count outside the accepted range
    #[error("Code digits must be between {min} and {max}, got {digits}")]
    DigitsOutOfRange {
        /// Requested digit count
        digits: i64,
        /// Lower bound
        min: u32,
        /// Upper bound
        max: u32,
    },
    /// TOTP period outside [1, 3600]
    #[error("Period must be between 1 and 3600 seconds, got {0}")]
    PeriodOutOfRange(i64),
    /// HOTP URI without `counter`
    #[error("URI of type 'hotp' must contain 'counter' query parameter")]
    MissingCounter,
    /// HOTP URI with `period`
    #[error("URI of type 'hotp' must not contain 'period' query parameter")]
    UnexpectedPeriod,
    /// The label has more colons than the issuer/account delimiter and no issuer parameter
    #[error("URI label issuer and account may not contain colons, unless issuer parameter is present")]
    AmbiguousLabel,
    /// The issuer parameter does not prefix the label
    #[error("URI label '{label}' does not start with issuer parameter '{issuer}'")]
    IssuerMismatch {
        /// Issuer parameter value
        issuer: String,
        /// Decoded label
        label: String,
    },
    /// An authenticator was handed a URI of the other OTP type
    #[error("OTP Auth URI must be of type {expected}, got {actual}")]
    WrongOtpType {
        /// Type the authenticator requires
        expected: crate::uri::OtpType,
        /// Type of the URI
        actual: crate::uri::OtpType,
    },

    /// Counter below zero
    #[error("Counter must not be negative, got {0}")]
    NegativeCounter(i64),
    /// Counter already at its maximum value
    #[error("Counter cannot be incremented past {}", i64::MAX)]
    CounterOverflow,
    /// Unix time outside the calendar range
    #[error("Unix time {0} cannot be represented as a timestamp")]
    TimestampOutOfRange(i64),
    /// Digest too short for dynamic truncation
    #[error("HMAC digest of {0} bytes is too short to truncate")]
    DigestTooShort(usize),
}

impl OtpError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedUri(_)
            | Self::InvalidScheme(_)
            | Self::InvalidAuthority(_)
            | Self::InvalidLabelPath
            | Self::InvalidLabelEncoding
            | Self::MissingQuery => ErrorKind::Format,
            Self::EmptyAccount
            | Self::MissingSecret
            | Self::EmptySecret
            | Self::InvalidSecret(_)
            | Self::UnknownAlgorithm(_)
            | Self::InvalidNumber { .. }
            | Self::DigitsOutOfRange { .. }
            | Self::PeriodOutOfRange(_)
            | Self::MissingCounter
            | Self::UnexpectedPeriod
            | Self::AmbiguousLabel
            | Self::IssuerMismatch { .. }
            | Self::WrongOtpType { .. } => ErrorKind::Validation,
            Self::NegativeCounter(_)
            | Self::CounterOverflow
            | Self::TimestampOutOfRange(_)
            | Self::DigestTooShort(_) => ErrorKind::Range,
        }
    }
}
