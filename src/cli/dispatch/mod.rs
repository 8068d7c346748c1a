use crate::cli::actions::{decode, generate, hash, verify, Action};
use crate::cli::commands::{CMD_DECODE, CMD_GENERATE, CMD_HASH, CMD_SCHEMES, CMD_VERIFY};
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;
use std::path::PathBuf;

/// Secret from `--secret` or the first line of `--secret-file`.
fn read_secret(matches: &clap::ArgMatches) -> Result<Option<SecretString>> {
    if let Some(secret) = matches.get_one::<String>("secret") {
        return Ok(Some(SecretString::from(secret.clone())));
    }

    let Some(path) = matches.get_one::<PathBuf>("secret-file") else {
        return Ok(None);
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read secret file {}", path.display()))?;
    let line = contents.lines().next().unwrap_or_default().to_string();
    Ok(Some(SecretString::from(line)))
}

/// # Errors
/// Returns an error if required arguments are missing or a secret file cannot be read.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some((CMD_HASH, sub)) => Ok(Action::Hash(hash::Args {
            scheme: sub.get_one::<String>("scheme").cloned(),
            secret: read_secret(sub)?,
        })),
        Some((CMD_VERIFY, sub)) => Ok(Action::Verify(verify::Args {
            hashes: sub
                .get_many::<String>("hash")
                .context("missing required argument: --hash")?
                .cloned()
                .collect(),
            secret: read_secret(sub)?
                .context("missing required argument: --secret or --secret-file")?,
        })),
        Some((CMD_GENERATE, sub)) => Ok(Action::Generate(generate::Args {
            length: sub.get_one::<u16>("length").map_or(8, |&len| usize::from(len)),
        })),
        Some((CMD_DECODE, sub)) => Ok(Action::Decode(decode::Args {
            payload: sub
                .get_one::<String>("payload")
                .cloned()
                .context("missing required argument: <payload>")?,
            response: sub.get_flag("response"),
        })),
        Some((CMD_SCHEMES, _)) => Ok(Action::Schemes),
        _ => Err(anyhow!("unknown subcommand")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;
    use std::io::Write;

    fn dispatch(args: &[&str]) -> Result<Action> {
        let matches = commands::new().try_get_matches_from(args)?;
        handler(&matches)
    }

    #[test]
    fn test_hash_without_secret() {
        temp_env::with_vars(
            [
                ("PASSWD_EXOP_SECRET", None::<&str>),
                ("PASSWD_EXOP_SCHEME", None),
            ],
            || {
                let action = dispatch(&["passwd-exop", "hash"]).unwrap();
                let Action::Hash(args) = action else {
                    panic!("expected hash action");
                };
                assert!(args.secret.is_none());
                assert!(args.scheme.is_none());
            },
        );
    }

    #[test]
    fn test_secret_file_first_line() {
        let path = std::env::temp_dir().join(format!("passwd-exop-{}", ulid::Ulid::new()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "s3cret\nignored").unwrap();

        temp_env::with_vars([("PASSWD_EXOP_SECRET", None::<&str>)], || {
            let action = dispatch(&[
                "passwd-exop",
                "verify",
                "--hash",
                "{SHA}x",
                "--secret-file",
                path.to_str().unwrap(),
            ])
            .unwrap();
            let Action::Verify(args) = action else {
                panic!("expected verify action");
            };
            assert_eq!(args.secret.expose_secret(), "s3cret");
            assert_eq!(args.hashes, vec!["{SHA}x".to_string()]);
        });

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_verify_needs_secret() {
        temp_env::with_vars([("PASSWD_EXOP_SECRET", None::<&str>)], || {
            let err = dispatch(&["passwd-exop", "verify", "--hash", "{SHA}x"]).unwrap_err();
            assert!(err.to_string().contains("--secret"));
        });
    }

    #[test]
    fn test_missing_secret_file() {
        temp_env::with_vars([("PASSWD_EXOP_SECRET", None::<&str>)], || {
            let err = dispatch(&[
                "passwd-exop",
                "hash",
                "--secret-file",
                "/nonexistent/passwd-exop-secret",
            ])
            .unwrap_err();
            assert!(err.to_string().contains("failed to read secret file"));
        });
    }

    #[test]
    fn test_generate_and_decode() {
        temp_env::with_vars([("PASSWD_EXOP_LENGTH", None::<&str>)], || {
            let Action::Generate(args) = dispatch(&["passwd-exop", "generate"]).unwrap() else {
                panic!("expected generate action");
            };
            assert_eq!(args.length, 8);
        });

        let Action::Decode(args) =
            dispatch(&["passwd-exop", "decode", "MAA=", "--response"]).unwrap()
        else {
            panic!("expected decode action");
        };
        assert_eq!(args.payload, "MAA=");
        assert!(args.response);

        assert!(matches!(
            dispatch(&["passwd-exop", "schemes"]).unwrap(),
            Action::Schemes
        ));
    }
}
