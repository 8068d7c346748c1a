//! Results surfaced to the protocol layer.

use super::codec::CodecError;
use crate::directory::BackendError;
use std::fmt;
use zeroize::Zeroizing;

/// LDAP result codes used by this operation.
pub mod result_code {
    pub const SUCCESS: u16 = 0;
    pub const PROTOCOL_ERROR: u16 = 2;
    pub const STRONG_AUTH_REQUIRED: u16 = 8;
    pub const REFERRAL: u16 = 10;
    pub const INVALID_DN_SYNTAX: u16 = 34;
    pub const UNWILLING_TO_PERFORM: u16 = 53;
    pub const OTHER: u16 = 80;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExopError {
    #[error("{0}")]
    AuthenticationRequired(String),
    #[error("{0}")]
    Protocol(String),
    #[error("{0}")]
    Unwilling(String),
    #[error("{0}")]
    InvalidDnSyntax(String),
    #[error("{0}")]
    Internal(String),
    /// Verdict of the store or the admission gate, passed through as is.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl ExopError {
    #[must_use]
    pub const fn result_code(&self) -> u16 {
        match self {
            Self::AuthenticationRequired(_) => result_code::STRONG_AUTH_REQUIRED,
            Self::Protocol(_) => result_code::PROTOCOL_ERROR,
            Self::Unwilling(_) => result_code::UNWILLING_TO_PERFORM,
            Self::InvalidDnSyntax(_) => result_code::INVALID_DN_SYNTAX,
            Self::Internal(_) => result_code::OTHER,
            Self::Backend(err) => err.code,
        }
    }

    /// Diagnostic text for the response, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::AuthenticationRequired(text)
            | Self::Protocol(text)
            | Self::Unwilling(text)
            | Self::InvalidDnSyntax(text)
            | Self::Internal(text) => Some(text),
            Self::Backend(err) => err.text.as_deref(),
        }
    }
}

impl From<CodecError> for ExopError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::NotAllowed(_) => Self::Unwilling(err.to_string()),
            CodecError::Decoding(_) | CodecError::Trailing { .. } => Self::Protocol(err.to_string()),
            CodecError::Encoding(_) => Self::Internal(err.to_string()),
        }
    }
}

/// Response value carrying a server-generated password.
#[derive(Clone, PartialEq, Eq)]
pub struct ResponseData(Zeroizing<Vec<u8>>);

impl ResponseData {
    pub(crate) fn new(data: Zeroizing<Vec<u8>>) -> Self {
        Self(data)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for ResponseData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResponseData([REDACTED; {}])", self.0.len())
    }
}

/// Terminal, non-error outcome of a password modify request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The change was applied; carries response data when the server
    /// generated the password.
    Success(Option<ResponseData>),
    /// Another server must apply the change.
    Referral(Vec<String>),
}

impl Outcome {
    #[must_use]
    pub const fn result_code(&self) -> u16 {
        match self {
            Self::Success(_) => result_code::SUCCESS,
            Self::Referral(_) => result_code::REFERRAL,
        }
    }
}
