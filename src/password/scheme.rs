//! The pluggable scheme contract and the tagged value format.

use crate::directory::ExecutionContext;
use std::fmt;
use subtle::ConstantTimeEq;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HashError {
    #[error("unknown password hash scheme: {0}")]
    UnknownScheme(String),
    #[error("{0}")]
    Failed(String),
    #[error("malformed stored credential: {0}")]
    Malformed(&'static str),
}

impl HashError {
    pub(crate) fn failed() -> Self {
        Self::Failed("password hash failed".to_string())
    }
}

/// Per-call inputs a scheme may need besides the plaintext.
#[derive(Clone, Copy, Debug, Default)]
pub struct SchemeContext<'a> {
    pub session: Option<&'a ExecutionContext>,
}

impl<'a> SchemeContext<'a> {
    #[must_use]
    pub const fn new(session: Option<&'a ExecutionContext>) -> Self {
        Self { session }
    }
}

/// A password storage scheme, addressed by its `{NAME}` label.
pub trait PasswordScheme: Send + Sync {
    /// Label including braces, upper case, e.g. `{SSHA}`.
    fn name(&self) -> &'static str;

    /// Produce the encoded part of a tagged value (without the label).
    ///
    /// # Errors
    /// Returns `HashError` when the underlying primitive fails.
    fn hash(&self, plaintext: &[u8], ctx: &SchemeContext<'_>) -> Result<Vec<u8>, HashError>;

    /// Check `plaintext` against the encoded part of a stored value.
    ///
    /// Defaults to re-hashing and comparing in constant time, which is only
    /// correct for deterministic schemes.
    ///
    /// # Errors
    /// Returns `HashError` when the stored value cannot be interpreted.
    fn verify(
        &self,
        encoded: &[u8],
        plaintext: &[u8],
        ctx: &SchemeContext<'_>,
    ) -> Result<bool, HashError> {
        let candidate = self.hash(plaintext, ctx)?;
        Ok(bool::from(candidate.ct_eq(encoded)))
    }

    /// Whether calls must be serialized process-wide, for schemes backed by
    /// non-reentrant libraries.
    fn exclusive(&self) -> bool {
        false
    }
}

/// A stored credential: `{SCHEME}` followed by scheme-specific bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct TaggedCredential(Vec<u8>);

impl TaggedCredential {
    #[must_use]
    pub fn new(scheme: &str, encoded: &[u8]) -> Self {
        let mut value = Vec::with_capacity(scheme.len() + encoded.len());
        value.extend_from_slice(scheme.as_bytes());
        value.extend_from_slice(encoded);
        Self(value)
    }

    /// Wrap a value as read from the password attribute.
    #[must_use]
    pub fn from_stored(value: Vec<u8>) -> Self {
        Self(value)
    }

    /// The `{NAME}` label, if the value carries one.
    #[must_use]
    pub fn scheme(&self) -> Option<&str> {
        self.split().map(|(label, _)| label)
    }

    /// Bytes after the label, or the whole value when untagged.
    #[must_use]
    pub fn encoded(&self) -> &[u8] {
        self.split().map_or(self.0.as_slice(), |(_, encoded)| encoded)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    fn split(&self) -> Option<(&str, &[u8])> {
        if self.0.first() != Some(&b'{') {
            return None;
        }
        let end = self.0.iter().position(|&b| b == b'}')?;
        let (label, encoded) = self.0.split_at(end + 1);
        let label = std::str::from_utf8(label).ok()?;
        if label.len() < 3 || !label.is_ascii() {
            return None;
        }
        Some((label, encoded))
    }
}

impl fmt::Debug for TaggedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TaggedCredential({}[REDACTED; {}])",
            self.scheme().unwrap_or(""),
            self.encoded().len()
        )
    }
}

/// Canonical registry key for a scheme name, accepting `ssha` or `{SSHA}`.
#[must_use]
pub fn scheme_key(name: &str) -> String {
    let trimmed = name.trim().trim_start_matches('{').trim_end_matches('}');
    format!("{{{}}}", trimmed.to_ascii_uppercase())
}
