//! # passwd-exop (Password Modify Extended Operation)
//!
//! `passwd-exop` implements the LDAP password modify extended operation
//! (`1.3.6.1.4.1.4203.1.11.1`) as an embeddable engine. The directory itself,
//! sessions, replication and admission control stay outside and are reached
//! through traits in [`directory`].
//!
//! ## Request Flow
//!
//! 1. **Decode:** the BER payload carries an optional identity, old password
//!    and new password. An empty payload changes the caller's own password to
//!    a generated one.
//! 2. **Route:** the target is resolved to its partition. Read-only replicas
//!    answer with a referral unless multi-writer mode is enabled.
//! 3. **Hash:** the new password is stored as a `{SCHEME}`-tagged value using
//!    the configured default scheme (`{ARGON2}` unless the `argon2` feature is
//!    disabled, then `{SSHA}`).
//! 4. **Modify:** a single-value replace of `userPassword` is submitted and the
//!    committed change is handed to replication.
//!
//! ## Verification
//!
//! [`password::PasswordSchemes::verify`] checks a presented password against
//! stored values. Values tagged with an unknown scheme are skipped rather than
//! failing the whole check.
//!
//! ## Secrets
//!
//! Plaintext passwords live in `zeroize`/`secrecy` wrappers and are wiped as
//! soon as they have been hashed. They are never logged.

pub mod cli;
pub mod directory;
pub mod exop;
pub mod password;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
