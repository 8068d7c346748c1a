use crate::exop::{codec, FieldPolicy};
use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine};
use serde::Serialize;

#[derive(Debug)]
pub struct Args {
    pub payload: String,
    pub response: bool,
}

/// A credential reduced to its length.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Redacted {
    pub length: usize,
}

impl Redacted {
    fn new(value: &[u8]) -> Self {
        Self {
            length: value.len(),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct DecodedRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_credential: Option<Redacted>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_credential: Option<Redacted>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct DecodedResponse {
    pub generated: Option<Redacted>,
}

/// Decode a base64 payload into its JSON description.
///
/// # Errors
/// Returns an error if the payload is not base64 or not a valid message.
pub fn run(args: &Args) -> Result<String> {
    let raw = general_purpose::STANDARD
        .decode(args.payload.trim())
        .context("payload is not valid base64")?;

    let json = if args.response {
        let generated = codec::decode_response(&raw).context("invalid response payload")?;
        serde_json::to_string_pretty(&DecodedResponse {
            generated: generated.as_deref().map(|value| Redacted::new(value)),
        })?
    } else {
        let request = codec::decode(&raw, FieldPolicy::ALL).context("invalid request payload")?;
        serde_json::to_string_pretty(&DecodedRequest {
            identity: request
                .identity
                .as_deref()
                .map(|id| String::from_utf8_lossy(id).into_owned()),
            old_credential: request.old_credential.as_deref().map(|v| Redacted::new(v)),
            new_credential: request.new_credential.as_deref().map(|v| Redacted::new(v)),
        })?
    };

    Ok(json)
}

/// # Errors
/// Returns an error if the payload cannot be decoded.
pub fn execute(args: &Args) -> Result<()> {
    println!("{}", run(args)?);
    Ok(())
}
