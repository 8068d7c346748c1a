//! Distinguished name parsing and normalization.
//!
//! Normalization is schema-agnostic: attribute types are lower-cased, values
//! are compared case-insensitively with insignificant spaces collapsed, and
//! multi-valued RDNs are sorted so that `cn=a+sn=b` and `sn=b+cn=a` compare
//! equal.

use regex::Regex;
use std::fmt;

const ESCAPED: &[char] = &[',', '+', '"', '\\', '<', '>', ';', '='];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DnError {
    #[error("distinguished name is not valid UTF-8")]
    Encoding,
    #[error("empty RDN at position {0}")]
    EmptyRdn(usize),
    #[error("attribute value assertion without '=': {0}")]
    MissingEquals(String),
    #[error("invalid attribute type: {0}")]
    InvalidAttributeType(String),
    #[error("invalid escape sequence")]
    InvalidEscape,
}

/// A distinguished name in both its presented and normalized forms.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Dn {
    raw: String,
    normalized: String,
}

impl Dn {
    /// Parse and normalize a DN.
    ///
    /// # Errors
    /// Returns a `DnError` when the string is not a syntactically valid DN.
    pub fn parse(raw: &str) -> Result<Self, DnError> {
        let normalized = normalize(raw)?;
        Ok(Self {
            raw: raw.to_string(),
            normalized,
        })
    }

    /// Parse a DN received on the wire as raw octets.
    ///
    /// # Errors
    /// Returns `DnError::Encoding` for non UTF-8 input, or any parse error.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, DnError> {
        let raw = std::str::from_utf8(raw).map_err(|_| DnError::Encoding)?;
        Self::parse(raw)
    }

    /// The empty DN naming the root DSE.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.normalized.is_empty()
    }

    /// Whether this DN is `suffix` itself or lies below it.
    #[must_use]
    pub fn is_within(&self, suffix: &Self) -> bool {
        if suffix.is_root() {
            return true;
        }
        self.normalized == suffix.normalized
            || self
                .normalized
                .strip_suffix(suffix.normalized.as_str())
                .is_some_and(|head| head.ends_with(','))
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn valid_attribute_type(attr: &str) -> bool {
    Regex::new(r"^(?:[A-Za-z][A-Za-z0-9-]*|[0-9]+(?:\.[0-9]+)*)$")
        .is_ok_and(|regex| regex.is_match(attr))
}

/// Split on an unescaped separator, keeping escapes intact in the pieces.
fn split_unescaped(input: &str, separator: char) -> Result<Vec<&str>, DnError> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (idx, ch) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
        } else if ch == separator {
            parts.push(&input[start..idx]);
            start = idx + ch.len_utf8();
        }
    }
    if escaped {
        return Err(DnError::InvalidEscape);
    }
    parts.push(&input[start..]);
    Ok(parts)
}

fn unescape(value: &str) -> Result<String, DnError> {
    let mut bytes = Vec::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        let first = chars.next().ok_or(DnError::InvalidEscape)?;
        if let Some(high) = first.to_digit(16) {
            let low = chars
                .next()
                .and_then(|c| c.to_digit(16))
                .ok_or(DnError::InvalidEscape)?;
            bytes.push(u8::try_from(high * 16 + low).map_err(|_| DnError::InvalidEscape)?);
        } else if first == ' ' || first == '#' || ESCAPED.contains(&first) {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(first.encode_utf8(&mut buf).as_bytes());
        } else {
            return Err(DnError::InvalidEscape);
        }
    }
    String::from_utf8(bytes).map_err(|_| DnError::Encoding)
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);
    for (idx, ch) in value.chars().enumerate() {
        let edge_space = ch == ' ' && (idx == 0 || idx == last);
        if ESCAPED.contains(&ch) || edge_space || (idx == 0 && ch == '#') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn normalize_value(value: &str) -> Result<String, DnError> {
    let trimmed = value.trim_start();
    // a trailing escaped space is significant
    let trimmed = if trimmed.ends_with("\\ ") {
        trimmed
    } else {
        trimmed.trim_end()
    };
    if trimmed.starts_with('#') {
        return Ok(trimmed.to_lowercase());
    }
    let unescaped = unescape(trimmed)?;
    let collapsed = unescaped.split_whitespace().collect::<Vec<_>>().join(" ");
    Ok(escape(&collapsed.to_lowercase()))
}

fn normalize(raw: &str) -> Result<String, DnError> {
    if raw.trim().is_empty() {
        return Ok(String::new());
    }

    let mut rdns = Vec::new();
    for (position, rdn) in split_unescaped(raw, ',')?.into_iter().enumerate() {
        if rdn.trim().is_empty() {
            return Err(DnError::EmptyRdn(position));
        }

        let mut avas = Vec::new();
        for ava in split_unescaped(rdn, '+')? {
            let (attr, value) = ava
                .split_once('=')
                .ok_or_else(|| DnError::MissingEquals(ava.trim().to_string()))?;
            let attr = attr.trim();
            if !valid_attribute_type(attr) {
                return Err(DnError::InvalidAttributeType(attr.to_string()));
            }
            avas.push((attr.to_ascii_lowercase(), normalize_value(value)?));
        }
        avas.sort();

        let rdn = avas
            .iter()
            .map(|(attr, value)| format!("{attr}={value}"))
            .collect::<Vec<_>>()
            .join("+");
        rdns.push(rdn);
    }

    Ok(rdns.join(","))
}
