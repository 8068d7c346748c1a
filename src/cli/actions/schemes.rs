use crate::password::PasswordSchemes;
use anyhow::Result;

/// Registered schemes, the default one marked with `*`.
#[must_use]
pub fn run(schemes: &PasswordSchemes) -> Vec<String> {
    schemes
        .names()
        .into_iter()
        .map(|name| {
            if name == schemes.default_scheme() {
                format!("{name} *")
            } else {
                name.to_string()
            }
        })
        .collect()
}

/// # Errors
/// Returns an error if the registry cannot be built.
pub fn execute() -> Result<()> {
    let schemes = PasswordSchemes::with_builtin(None)?;
    for line in run(&schemes) {
        println!("{line}");
    }
    Ok(())
}
