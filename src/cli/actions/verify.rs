use crate::password::{PasswordSchemes, SchemeContext, TaggedCredential};
use anyhow::{bail, Result};
use secrecy::{ExposeSecret, SecretString};

#[derive(Debug)]
pub struct Args {
    pub hashes: Vec<String>,
    pub secret: SecretString,
}

#[must_use]
pub fn run(schemes: &PasswordSchemes, args: &Args) -> bool {
    let stored: Vec<TaggedCredential> = args
        .hashes
        .iter()
        .map(|hash| TaggedCredential::from_stored(hash.as_bytes().to_vec()))
        .collect();

    schemes.verify(
        &stored,
        args.secret.expose_secret().as_bytes(),
        &SchemeContext::default(),
    )
}

/// # Errors
/// Returns an error when the password matches none of the stored values.
pub fn execute(args: Args) -> Result<()> {
    let schemes = PasswordSchemes::with_builtin(None)?;
    if !run(&schemes, &args) {
        bail!("password does not match");
    }

    println!("ok");
    Ok(())
}
