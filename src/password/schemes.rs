//! Built-in digest schemes: `{CLEARTEXT}` and the SHA family.

use super::scheme::{HashError, PasswordScheme, SchemeContext};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::{rngs::OsRng, RngCore};
use sha2::Digest;
use std::marker::PhantomData;
use subtle::ConstantTimeEq;

pub const CLEARTEXT: &str = "{CLEARTEXT}";

/// Stores the password as is. Only useful for tests and migrations.
#[derive(Clone, Copy, Debug, Default)]
pub struct Cleartext;

impl PasswordScheme for Cleartext {
    fn name(&self) -> &'static str {
        CLEARTEXT
    }

    fn hash(&self, plaintext: &[u8], _ctx: &SchemeContext<'_>) -> Result<Vec<u8>, HashError> {
        Ok(plaintext.to_vec())
    }
}

/// `base64(digest(password || salt) || salt)`, unsalted when `salt_len` is 0.
pub struct Sha<D> {
    name: &'static str,
    salt_len: usize,
    digest: PhantomData<fn() -> D>,
}

impl<D> Sha<D> {
    #[must_use]
    pub const fn new(name: &'static str, salt_len: usize) -> Self {
        Self {
            name,
            salt_len,
            digest: PhantomData,
        }
    }
}

impl<D: Digest> Sha<D> {
    fn digest(plaintext: &[u8], salt: &[u8]) -> Vec<u8> {
        D::new()
            .chain_update(plaintext)
            .chain_update(salt)
            .finalize()
            .to_vec()
    }
}

impl<D: Digest> PasswordScheme for Sha<D> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn hash(&self, plaintext: &[u8], _ctx: &SchemeContext<'_>) -> Result<Vec<u8>, HashError> {
        let mut salt = vec![0u8; self.salt_len];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|err| HashError::Failed(format!("failed to generate salt: {err}")))?;

        let mut raw = Self::digest(plaintext, &salt);
        raw.extend_from_slice(&salt);

        Ok(STANDARD.encode(raw).into_bytes())
    }

    fn verify(
        &self,
        encoded: &[u8],
        plaintext: &[u8],
        _ctx: &SchemeContext<'_>,
    ) -> Result<bool, HashError> {
        let raw = STANDARD
            .decode(encoded)
            .map_err(|_| HashError::Malformed("invalid base64"))?;

        let digest_len = <D as Digest>::output_size();
        let well_formed = if self.salt_len == 0 {
            raw.len() == digest_len
        } else {
            raw.len() > digest_len
        };
        if !well_formed {
            return Err(HashError::Malformed("unexpected digest length"));
        }

        let (stored, salt) = raw.split_at(digest_len);
        let candidate = Self::digest(plaintext, salt);

        Ok(bool::from(candidate.ct_eq(stored)))
    }
}

#[must_use]
pub fn sha1() -> Sha<sha1::Sha1> {
    Sha::new("{SHA}", 0)
}

#[must_use]
pub fn ssha1() -> Sha<sha1::Sha1> {
    Sha::new("{SSHA}", 4)
}

#[must_use]
pub fn sha256() -> Sha<sha2::Sha256> {
    Sha::new("{SHA256}", 0)
}

#[must_use]
pub fn ssha256() -> Sha<sha2::Sha256> {
    Sha::new("{SSHA256}", 8)
}

#[must_use]
pub fn sha512() -> Sha<sha2::Sha512> {
    Sha::new("{SHA512}", 0)
}

#[must_use]
pub fn ssha512() -> Sha<sha2::Sha512> {
    Sha::new("{SSHA512}", 8)
}
