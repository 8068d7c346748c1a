use crate::password;
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};

#[derive(Debug)]
pub struct Args {
    pub length: usize,
}

/// # Errors
/// Returns an error if the entropy source fails.
pub fn run(args: &Args) -> Result<SecretString> {
    let raw = password::generate(args.length)?;
    let text = String::from_utf8(raw.expose_secret().to_vec())
        .context("generated password is not valid UTF-8")?;
    Ok(SecretString::from(text))
}

/// # Errors
/// Returns an error if the entropy source fails.
pub fn execute(args: Args) -> Result<()> {
    let generated = run(&args)?;
    println!("{}", generated.expose_secret());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_length() {
        let generated = run(&Args { length: 24 }).unwrap();
        assert_eq!(generated.expose_secret().len(), 24);
        assert!(generated
            .expose_secret()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '/'));
    }

    #[test]
    fn test_generate_zero_length() {
        assert!(run(&Args { length: 0 }).is_err());
    }
}
