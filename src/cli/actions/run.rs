use crate::cli::actions::{decode, generate, hash, schemes, verify, Action};
use anyhow::Result;

/// Execute the provided action.
/// # Errors
/// Returns an error if the action fails.
pub fn execute(action: Action) -> Result<()> {
    match action {
        Action::Hash(args) => hash::execute(args),
        Action::Verify(args) => verify::execute(args),
        Action::Generate(args) => generate::execute(args),
        Action::Decode(args) => decode::execute(&args),
        Action::Schemes => schemes::execute(),
    }
}
