//! Random password generation for requests that do not carry one.

use rand::{rngs::OsRng, RngCore};
use secrecy::SecretSlice;
use zeroize::Zeroizing;

/// Some getpass(3) implementations truncate input at 8 characters, so
/// generated passwords stay that short for interoperability.
pub const GENERATED_PASSWORD_LENGTH: usize = 8;

const CRYPT64: &[u8] = b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("entropy source unavailable: {0}")]
    Entropy(#[from] rand::Error),
    #[error("password length must be greater than zero")]
    ZeroLength,
}

/// Generate a printable password of `length` characters.
///
/// # Errors
/// Returns an error if the OS entropy source fails or `length` is zero.
pub fn generate(length: usize) -> Result<SecretSlice<u8>, GenerateError> {
    generate_with_rng(&mut OsRng, length)
}

fn generate_with_rng<R: RngCore + ?Sized>(
    rng: &mut R,
    length: usize,
) -> Result<SecretSlice<u8>, GenerateError> {
    if length == 0 {
        return Err(GenerateError::ZeroLength);
    }

    let mut raw = Zeroizing::new(vec![0u8; length]);
    rng.try_fill_bytes(raw.as_mut_slice())?;

    let mut password = Vec::with_capacity(length);
    for byte in raw.iter() {
        let idx = usize::from(*byte) % CRYPT64.len();
        if let Some(&ch) = CRYPT64.get(idx) {
            password.push(ch);
        }
    }

    Ok(SecretSlice::from(password))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, _dest: &mut [u8]) {}

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new("entropy pool exhausted"))
        }
    }

    #[test]
    fn generates_requested_length() {
        let password = generate(GENERATED_PASSWORD_LENGTH).unwrap();
        assert_eq!(password.expose_secret().len(), 8);

        let longer = generate(32).unwrap();
        assert_eq!(longer.expose_secret().len(), 32);
    }

    #[test]
    fn uses_crypt64_alphabet() {
        for _ in 0..32 {
            let password = generate(GENERATED_PASSWORD_LENGTH).unwrap();
            assert!(password
                .expose_secret()
                .iter()
                .all(|ch| CRYPT64.contains(ch)));
        }
    }

    #[test]
    fn entropy_failure_is_an_error() {
        let result = generate_with_rng(&mut BrokenRng, GENERATED_PASSWORD_LENGTH);
        assert!(matches!(result, Err(GenerateError::Entropy(_))));
    }

    #[test]
    fn zero_length_is_an_error() {
        assert!(matches!(generate(0), Err(GenerateError::ZeroLength)));
    }
}
