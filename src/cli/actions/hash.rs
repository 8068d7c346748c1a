use crate::password::{self, PasswordSchemes, SchemeContext, GENERATED_PASSWORD_LENGTH};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub scheme: Option<String>,
    pub secret: Option<SecretString>,
}

/// Tagged hash, plus the plaintext when it was generated here.
#[derive(Debug)]
pub struct Hashed {
    pub generated: Option<SecretString>,
    pub hash: String,
}

/// # Errors
/// Returns an error if the scheme is unknown or hashing fails.
pub fn run(schemes: &PasswordSchemes, args: Args) -> Result<Hashed> {
    let (secret, generated) = match args.secret {
        Some(secret) => (secret, false),
        None => {
            let raw = password::generate(GENERATED_PASSWORD_LENGTH)?;
            let text = String::from_utf8(raw.expose_secret().to_vec())
                .context("generated password is not valid UTF-8")?;
            (SecretString::from(text), true)
        }
    };

    debug!(
        "hashing with {}",
        args.scheme.as_deref().unwrap_or(schemes.default_scheme())
    );

    let hash = schemes.hash(
        secret.expose_secret().as_bytes(),
        args.scheme.as_deref(),
        &SchemeContext::default(),
    )?;
    let hash = String::from_utf8(hash.into_bytes()).context("hash is not valid UTF-8")?;

    Ok(Hashed {
        generated: generated.then_some(secret),
        hash,
    })
}

/// # Errors
/// Returns an error if hashing fails.
pub fn execute(args: Args) -> Result<()> {
    let schemes = PasswordSchemes::with_builtin(None)?;
    let hashed = run(&schemes, args)?;

    if let Some(generated) = &hashed.generated {
        println!("{}", generated.expose_secret());
    }
    println!("{}", hashed.hash);

    Ok(())
}
