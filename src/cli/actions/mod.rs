pub mod decode;
pub mod generate;
pub mod hash;
pub mod schemes;
pub mod verify;

// Single dispatch point for `Action`.
mod run;

#[derive(Debug)]
pub enum Action {
    Hash(hash::Args),
    Verify(verify::Args),
    Generate(generate::Args),
    Decode(decode::Args),
    Schemes,
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub fn execute(self) -> anyhow::Result<()> {
        run::execute(self)
    }
}
