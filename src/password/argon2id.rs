//! `{ARGON2}` scheme storing an Argon2id PHC string.

use super::scheme::{HashError, PasswordScheme, SchemeContext};
use argon2::{
    password_hash::{self, SaltString},
    Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier,
};
use rand::rngs::OsRng;

pub const ARGON2: &str = "{ARGON2}";

#[derive(Clone, Debug)]
pub struct Argon2Scheme {
    params: Params,
}

impl Default for Argon2Scheme {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl Argon2Scheme {
    #[must_use]
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            self.params.clone(),
        )
    }
}

impl PasswordScheme for Argon2Scheme {
    fn name(&self) -> &'static str {
        ARGON2
    }

    fn hash(&self, plaintext: &[u8], _ctx: &SchemeContext<'_>) -> Result<Vec<u8>, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher()
            .hash_password(plaintext, &salt)
            .map_err(|err| HashError::Failed(format!("failed to hash password: {err}")))?
            .to_string();
        Ok(hash.into_bytes())
    }

    fn verify(
        &self,
        encoded: &[u8],
        plaintext: &[u8],
        _ctx: &SchemeContext<'_>,
    ) -> Result<bool, HashError> {
        let encoded =
            std::str::from_utf8(encoded).map_err(|_| HashError::Malformed("invalid PHC string"))?;
        let parsed =
            PasswordHash::new(encoded).map_err(|_| HashError::Malformed("invalid PHC string"))?;

        // parameters come from the stored PHC string, not from self.params
        match Argon2::default().verify_password(plaintext, &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(err) => Err(HashError::Failed(format!("failed to verify password: {err}"))),
        }
    }
}
