//! Request and response payloads of the password modify extended operation.
//!
//! ```text
//! PasswdModifyRequestValue ::= SEQUENCE {
//!     userIdentity    [0]  OCTET STRING OPTIONAL
//!     oldPasswd       [1]  OCTET STRING OPTIONAL
//!     newPasswd       [2]  OCTET STRING OPTIONAL }
//!
//! PasswdModifyResponseValue ::= SEQUENCE {
//!     genPasswd       [0]  OCTET STRING OPTIONAL }
//! ```

use super::ber::{self, BerError};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use zeroize::Zeroizing;

pub const TAG_IDENTITY: u8 = 0x80;
pub const TAG_OLD_CREDENTIAL: u8 = 0x81;
pub const TAG_NEW_CREDENTIAL: u8 = 0x82;
pub const TAG_GENERATED_CREDENTIAL: u8 = 0x80;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Identity,
    OldCredential,
    NewCredential,
}

/// Request fields in the order they must appear on the wire.
const FIELDS: [Field; 3] = [Field::Identity, Field::OldCredential, Field::NewCredential];

impl Field {
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Identity => TAG_IDENTITY,
            Self::OldCredential => TAG_OLD_CREDENTIAL,
            Self::NewCredential => TAG_NEW_CREDENTIAL,
        }
    }

    /// Diagnostic returned when a deployment does not accept this field.
    #[must_use]
    pub const fn refusal(self) -> &'static str {
        match self {
            Self::Identity => "user must change own password",
            Self::OldCredential => "use bind to verify old password",
            Self::NewCredential => "user specified passwords disallowed",
        }
    }
}

/// Which request fields a deployment accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPolicy {
    pub identity: bool,
    pub old_credential: bool,
    pub new_credential: bool,
}

impl FieldPolicy {
    pub const ALL: Self = Self {
        identity: true,
        old_credential: true,
        new_credential: true,
    };

    #[must_use]
    pub const fn allows(self, field: Field) -> bool {
        match field {
            Field::Identity => self.identity,
            Field::OldCredential => self.old_credential,
            Field::NewCredential => self.new_credential,
        }
    }
}

impl Default for FieldPolicy {
    fn default() -> Self {
        Self::ALL
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("data decoding error")]
    Decoding(#[source] BerError),
    #[error("data decoding error")]
    Trailing { remaining: usize },
    #[error("{}", .0.refusal())]
    NotAllowed(Field),
    #[error("failed to encode payload: {0}")]
    Encoding(#[source] BerError),
}

/// Decoded request. Absent fields are `None`; a present but empty field is
/// `Some` of an empty buffer.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PasswdRequest {
    pub identity: Option<Vec<u8>>,
    pub old_credential: Option<Zeroizing<Vec<u8>>>,
    pub new_credential: Option<Zeroizing<Vec<u8>>>,
}

impl fmt::Debug for PasswdRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswdRequest")
            .field(
                "identity",
                &self.identity.as_deref().map(String::from_utf8_lossy),
            )
            .field(
                "old_credential",
                &self.old_credential.as_ref().map(|v| v.len()),
            )
            .field(
                "new_credential",
                &self.new_credential.as_ref().map(|v| v.len()),
            )
            .finish()
    }
}

impl PasswdRequest {
    /// Encode this request as a client would send it.
    ///
    /// # Errors
    /// Returns `CodecError::Encoding` if a field is too long for BER.
    pub fn encode(&self) -> Result<Zeroizing<Vec<u8>>, CodecError> {
        let mut fields = Zeroizing::new(Vec::new());
        let present = [
            (Field::Identity, self.identity.as_deref()),
            (Field::OldCredential, self.old_credential.as_deref().map(Vec::as_slice)),
            (Field::NewCredential, self.new_credential.as_deref().map(Vec::as_slice)),
        ];
        for (field, value) in present {
            if let Some(value) = value {
                ber::write_element(&mut fields, field.tag(), value).map_err(CodecError::Encoding)?;
            }
        }

        let mut out = Zeroizing::new(Vec::with_capacity(fields.len() + 6));
        ber::write_element(&mut out, ber::TAG_SEQUENCE, &fields).map_err(CodecError::Encoding)?;
        Ok(out)
    }
}

/// Decode a request payload, refusing fields `policy` does not accept.
///
/// An empty payload is a request with every field absent.
///
/// # Errors
/// Returns `CodecError::NotAllowed` for refused fields and a decoding error
/// for anything malformed, out of order or left over.
pub fn decode(raw: &[u8], policy: FieldPolicy) -> Result<PasswdRequest, CodecError> {
    let mut request = PasswdRequest::default();
    if raw.is_empty() {
        return Ok(request);
    }

    let mut outer = ber::Reader::new(raw);
    let mut fields = outer.read_sequence().map_err(|err| {
        debug!("decoding error, no enclosing sequence: {err}");
        CodecError::Decoding(err)
    })?;
    if !outer.is_empty() {
        debug!("decoding error, len={} after sequence", outer.remaining());
        return Err(CodecError::Trailing {
            remaining: outer.remaining(),
        });
    }

    for field in FIELDS {
        if fields.peek_tag() != Some(field.tag()) {
            continue;
        }
        if !policy.allows(field) {
            debug!("{field:?} not allowed");
            return Err(CodecError::NotAllowed(field));
        }

        let value = fields.read_element(field.tag()).map_err(|err| {
            debug!("{field:?} parse failed: {err}");
            CodecError::Decoding(err)
        })?;

        match field {
            Field::Identity => request.identity = Some(value.to_vec()),
            Field::OldCredential => request.old_credential = Some(Zeroizing::new(value.to_vec())),
            Field::NewCredential => request.new_credential = Some(Zeroizing::new(value.to_vec())),
        }
    }

    if !fields.is_empty() {
        debug!("decoding error, len={}", fields.remaining());
        return Err(CodecError::Trailing {
            remaining: fields.remaining(),
        });
    }

    Ok(request)
}

/// Wrap a server-generated password as response data.
///
/// # Errors
/// Returns `CodecError::Encoding` if the password cannot be encoded.
pub fn encode_response(generated: &[u8]) -> Result<Zeroizing<Vec<u8>>, CodecError> {
    debug!("encoding response: {}", generated.len());

    let mut inner = Zeroizing::new(Vec::with_capacity(generated.len() + 6));
    ber::write_element(&mut inner, TAG_GENERATED_CREDENTIAL, generated)
        .map_err(CodecError::Encoding)?;

    let mut out = Zeroizing::new(Vec::with_capacity(inner.len() + 6));
    ber::write_element(&mut out, ber::TAG_SEQUENCE, &inner).map_err(CodecError::Encoding)?;
    Ok(out)
}

/// Read the generated password back out of response data.
///
/// # Errors
/// Returns a decoding error if `raw` is not a well-formed response.
pub fn decode_response(raw: &[u8]) -> Result<Option<Zeroizing<Vec<u8>>>, CodecError> {
    let mut outer = ber::Reader::new(raw);
    let mut fields = outer.read_sequence().map_err(CodecError::Decoding)?;
    if !outer.is_empty() {
        return Err(CodecError::Trailing {
            remaining: outer.remaining(),
        });
    }

    let generated = match fields.peek_tag() {
        Some(TAG_GENERATED_CREDENTIAL) => Some(Zeroizing::new(
            fields
                .read_element(TAG_GENERATED_CREDENTIAL)
                .map_err(CodecError::Decoding)?
                .to_vec(),
        )),
        _ => None,
    };

    if !fields.is_empty() {
        return Err(CodecError::Trailing {
            remaining: fields.remaining(),
        });
    }

    Ok(generated)
}
