//! Engine configuration, fixed at startup.

use super::codec::FieldPolicy;
use crate::password::{HashError, PasswordSchemes};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExopConfig {
    default_scheme: Option<String>,
    multi_writer: bool,
    allow_identity: bool,
    allow_old_credential: bool,
    allow_new_credential: bool,
}

impl Default for ExopConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ExopConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            default_scheme: None,
            multi_writer: false,
            allow_identity: true,
            allow_old_credential: true,
            allow_new_credential: true,
        }
    }

    /// Scheme used for new hashes instead of the build default.
    #[must_use]
    pub fn with_default_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.default_scheme = Some(scheme.into());
        self
    }

    /// Accept changes on read-only replicas instead of referring them.
    #[must_use]
    pub fn with_multi_writer(mut self, enabled: bool) -> Self {
        self.multi_writer = enabled;
        self
    }

    #[must_use]
    pub fn with_field_policy(mut self, policy: FieldPolicy) -> Self {
        self.allow_identity = policy.identity;
        self.allow_old_credential = policy.old_credential;
        self.allow_new_credential = policy.new_credential;
        self
    }

    #[must_use]
    pub fn default_scheme(&self) -> Option<&str> {
        self.default_scheme.as_deref()
    }

    #[must_use]
    pub const fn multi_writer(&self) -> bool {
        self.multi_writer
    }

    #[must_use]
    pub const fn field_policy(&self) -> FieldPolicy {
        FieldPolicy {
            identity: self.allow_identity,
            old_credential: self.allow_old_credential,
            new_credential: self.allow_new_credential,
        }
    }

    /// Build the registry of built-in schemes with this configuration's default.
    ///
    /// # Errors
    /// Returns `HashError::UnknownScheme` if the configured default is not built in.
    pub fn password_schemes(&self) -> Result<PasswordSchemes, HashError> {
        PasswordSchemes::with_builtin(self.default_scheme())
    }
}
