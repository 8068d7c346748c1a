//! Password hashing and verification.
//!
//! Flow Overview: schemes are registered once at startup into an immutable
//! [`PasswordSchemes`] registry which is then shared by every operation.
//! Hashing picks a scheme by name (or the configured default) and returns a
//! [`TaggedCredential`]; verification walks the stored values and asks the
//! scheme named by each label. Schemes that declare themselves `exclusive`
//! run under one process-wide mutex shared by hash and verify.

#[cfg(feature = "argon2")]
pub mod argon2id;
pub mod generate;
pub mod scheme;
pub mod schemes;

pub use generate::{generate, GenerateError, GENERATED_PASSWORD_LENGTH};
pub use scheme::{scheme_key, HashError, PasswordScheme, SchemeContext, TaggedCredential};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error};

#[cfg(feature = "argon2")]
pub const DEFAULT_SCHEME: &str = argon2id::ARGON2;
#[cfg(not(feature = "argon2"))]
pub const DEFAULT_SCHEME: &str = "{SSHA}";

/// Registry of password schemes keyed by their `{NAME}` label.
pub struct PasswordSchemes {
    schemes: HashMap<String, Arc<dyn PasswordScheme>>,
    default_scheme: String,
    exclusive: Mutex<()>,
}

impl std::fmt::Debug for PasswordSchemes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordSchemes")
            .field("schemes", &self.names())
            .field("default_scheme", &self.default_scheme)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct PasswordSchemesBuilder {
    schemes: HashMap<String, Arc<dyn PasswordScheme>>,
    default_scheme: Option<String>,
}

impl PasswordSchemesBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every scheme compiled into this build.
    #[must_use]
    pub fn with_builtin_schemes(self) -> Self {
        let builder = self
            .register(schemes::Cleartext)
            .register(schemes::sha1())
            .register(schemes::ssha1())
            .register(schemes::sha256())
            .register(schemes::ssha256())
            .register(schemes::sha512())
            .register(schemes::ssha512());

        #[cfg(feature = "argon2")]
        let builder = builder.register(argon2id::Argon2Scheme::default());

        builder
    }

    /// Register a scheme, replacing any previous one with the same label.
    #[must_use]
    pub fn register<S: PasswordScheme + 'static>(mut self, scheme: S) -> Self {
        self.schemes
            .insert(scheme_key(scheme.name()), Arc::new(scheme));
        self
    }

    #[must_use]
    pub fn default_scheme(mut self, name: &str) -> Self {
        self.default_scheme = Some(scheme_key(name));
        self
    }

    /// # Errors
    /// Returns `HashError::UnknownScheme` if the default scheme is not registered.
    pub fn build(self) -> Result<PasswordSchemes, HashError> {
        let default_scheme = self
            .default_scheme
            .unwrap_or_else(|| DEFAULT_SCHEME.to_string());

        if !self.schemes.contains_key(&default_scheme) {
            return Err(HashError::UnknownScheme(default_scheme));
        }

        Ok(PasswordSchemes {
            schemes: self.schemes,
            default_scheme,
            exclusive: Mutex::new(()),
        })
    }
}

impl PasswordSchemes {
    #[must_use]
    pub fn builder() -> PasswordSchemesBuilder {
        PasswordSchemesBuilder::new()
    }

    /// # Errors
    /// Returns an error if `default_scheme` names a scheme that is not built in.
    pub fn with_builtin(default_scheme: Option<&str>) -> Result<Self, HashError> {
        let builder = Self::builder().with_builtin_schemes();
        match default_scheme {
            Some(name) => builder.default_scheme(name).build(),
            None => builder.build(),
        }
    }

    #[must_use]
    pub fn default_scheme(&self) -> &str {
        &self.default_scheme
    }

    /// Registered labels, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn PasswordScheme>> {
        self.schemes.get(&scheme_key(name))
    }

    fn run<T>(&self, scheme: &dyn PasswordScheme, call: impl FnOnce() -> T) -> T {
        if scheme.exclusive() {
            let _guard = self
                .exclusive
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            call()
        } else {
            call()
        }
    }

    /// Hash `plaintext` with `scheme`, or the default scheme when `None`.
    ///
    /// # Errors
    /// Returns `HashError` if the scheme is unknown or hashing fails.
    pub fn hash(
        &self,
        plaintext: &[u8],
        scheme: Option<&str>,
        ctx: &SchemeContext<'_>,
    ) -> Result<TaggedCredential, HashError> {
        let name = scheme.unwrap_or(&self.default_scheme);
        let Some(entry) = self.get(name) else {
            error!("unknown password hash scheme {name}");
            return Err(HashError::UnknownScheme(name.to_string()));
        };

        let encoded = self
            .run(entry.as_ref(), || entry.hash(plaintext, ctx))
            .map_err(|err| match err {
                HashError::Failed(text) if text.is_empty() => HashError::failed(),
                err => err,
            })
            .inspect_err(|err| error!("{} hash failed: {err}", entry.name()))?;

        if encoded.is_empty() {
            error!("{} produced an empty hash", entry.name());
            return Err(HashError::failed());
        }

        Ok(TaggedCredential::new(entry.name(), &encoded))
    }

    /// Check `presented` against each stored value in order.
    ///
    /// Values with an unknown scheme or a malformed encoding are skipped.
    /// Untagged values are compared as cleartext only if `{CLEARTEXT}` is
    /// registered.
    #[must_use]
    pub fn verify(
        &self,
        stored: &[TaggedCredential],
        presented: &[u8],
        ctx: &SchemeContext<'_>,
    ) -> bool {
        for value in stored {
            let (entry, encoded) = match value.scheme() {
                Some(label) => match self.get(label) {
                    Some(entry) => (entry, value.encoded()),
                    None => {
                        debug!("skipping stored value with unknown scheme {label}");
                        continue;
                    }
                },
                None => match self.get(schemes::CLEARTEXT) {
                    Some(entry) => (entry, value.as_bytes()),
                    None => {
                        debug!("skipping untagged stored value");
                        continue;
                    }
                },
            };

            match self.run(entry.as_ref(), || entry.verify(encoded, presented, ctx)) {
                Ok(true) => return true,
                Ok(false) => {}
                Err(err) => debug!("skipping stored {} value: {err}", entry.name()),
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::ExecutionContext;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Deterministic scheme that records overlapping calls.
    struct Overlap {
        exclusive: bool,
        active: AtomicUsize,
        overlapped: AtomicBool,
    }

    impl Overlap {
        fn new(exclusive: bool) -> Self {
            Self {
                exclusive,
                active: AtomicUsize::new(0),
                overlapped: AtomicBool::new(false),
            }
        }
    }

    impl PasswordScheme for Arc<Overlap> {
        fn name(&self) -> &'static str {
            if self.exclusive {
                "{SERIAL}"
            } else {
                "{PARALLEL}"
            }
        }

        fn hash(&self, plaintext: &[u8], _ctx: &SchemeContext<'_>) -> Result<Vec<u8>, HashError> {
            if self.active.fetch_add(1, Ordering::SeqCst) > 0 {
                self.overlapped.store(true, Ordering::SeqCst);
            }
            std::thread::sleep(Duration::from_millis(5));
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(plaintext.iter().rev().copied().collect())
        }

        fn exclusive(&self) -> bool {
            self.exclusive
        }
    }

    /// Scheme whose output depends on the session's channel binding.
    struct Bound;

    impl PasswordScheme for Bound {
        fn name(&self) -> &'static str {
            "{BOUND}"
        }

        fn hash(&self, plaintext: &[u8], ctx: &SchemeContext<'_>) -> Result<Vec<u8>, HashError> {
            let binding = ctx
                .session
                .and_then(|session| session.channel_binding.as_deref())
                .ok_or(HashError::Failed("channel binding required".to_string()))?;
            let mut out = binding.to_vec();
            out.extend_from_slice(plaintext);
            Ok(out)
        }
    }

    /// Scheme that always fails without saying why.
    struct Silent;

    impl PasswordScheme for Silent {
        fn name(&self) -> &'static str {
            "{SILENT}"
        }

        fn hash(&self, _plaintext: &[u8], _ctx: &SchemeContext<'_>) -> Result<Vec<u8>, HashError> {
            Err(HashError::Failed(String::new()))
        }
    }

    fn ctx() -> SchemeContext<'static> {
        SchemeContext::default()
    }

    fn registry() -> PasswordSchemes {
        PasswordSchemes::with_builtin(None).unwrap()
    }

    #[test]
    fn builtin_default_scheme() {
        let schemes = registry();
        assert_eq!(schemes.default_scheme(), DEFAULT_SCHEME);
        let tagged = schemes.hash(b"secret", None, &ctx()).unwrap();
        assert_eq!(tagged.scheme(), Some(DEFAULT_SCHEME));
    }

    #[test]
    fn every_builtin_scheme_round_trips() {
        let schemes = registry();
        for name in schemes.names() {
            let tagged = schemes.hash(b"correct horse", Some(name), &ctx()).unwrap();
            assert_eq!(tagged.scheme(), Some(name));
            assert!(
                schemes.verify(&[tagged.clone()], b"correct horse", &ctx()),
                "{name} failed to verify"
            );
            assert!(
                !schemes.verify(&[tagged], b"correct horsE", &ctx()),
                "{name} accepted a wrong password"
            );
        }
    }

    #[test]
    fn scheme_lookup_is_case_insensitive() {
        let schemes = registry();
        let tagged = schemes.hash(b"pw", Some("ssha"), &ctx()).unwrap();
        assert_eq!(tagged.scheme(), Some("{SSHA}"));

        let lower = TaggedCredential::from_stored(
            [b"{ssha}".as_slice(), tagged.encoded()].concat(),
        );
        assert!(schemes.verify(&[lower], b"pw", &ctx()));
    }

    #[test]
    fn unknown_scheme_is_a_hash_error() {
        assert_eq!(
            registry().hash(b"pw", Some("{MD4}"), &ctx()),
            Err(HashError::UnknownScheme("{MD4}".to_string()))
        );
    }

    #[test]
    fn failure_without_text_reports_hash_failed() {
        let schemes = PasswordSchemes::builder()
            .register(Silent)
            .default_scheme("{SILENT}")
            .build()
            .unwrap();
        let err = schemes.hash(b"pw", None, &ctx()).unwrap_err();
        assert_eq!(err, HashError::failed());
        assert_eq!(err.to_string(), "password hash failed");
    }

    #[test]
    fn unknown_default_scheme_fails_to_build() {
        let result = PasswordSchemes::builder()
            .with_builtin_schemes()
            .default_scheme("{CRYPT}")
            .build();
        assert!(matches!(result, Err(HashError::UnknownScheme(name)) if name == "{CRYPT}"));
    }

    #[test]
    fn unknown_scheme_values_are_skipped_in_either_order() {
        let schemes = registry();
        let good = schemes.hash(b"pw", Some("{SSHA}"), &ctx()).unwrap();
        let unknown = TaggedCredential::from_stored(b"{KERBEROS}alice@EXAMPLE".to_vec());

        assert!(schemes.verify(&[unknown.clone(), good.clone()], b"pw", &ctx()));
        assert!(schemes.verify(&[good, unknown.clone()], b"pw", &ctx()));
        assert!(!schemes.verify(&[unknown], b"pw", &ctx()));
    }

    #[test]
    fn malformed_values_are_skipped() {
        let schemes = registry();
        let good = schemes.hash(b"pw", Some("{SHA256}"), &ctx()).unwrap();
        let broken = TaggedCredential::from_stored(b"{SHA256}***".to_vec());
        assert!(schemes.verify(&[broken.clone(), good], b"pw", &ctx()));
        assert!(!schemes.verify(&[broken], b"pw", &ctx()));
    }

    #[test]
    fn untagged_values_need_cleartext_scheme() {
        let plain = TaggedCredential::from_stored(b"pw".to_vec());
        assert!(registry().verify(&[plain.clone()], b"pw", &ctx()));

        let without_cleartext = PasswordSchemes::builder()
            .register(schemes::ssha1())
            .default_scheme("{SSHA}")
            .build()
            .unwrap();
        assert!(!without_cleartext.verify(&[plain], b"pw", &ctx()));
    }

    #[test]
    fn empty_stored_set_never_verifies() {
        assert!(!registry().verify(&[], b"pw", &ctx()));
    }

    #[test]
    fn session_context_is_passed_explicitly() {
        let schemes = PasswordSchemes::builder()
            .register(Bound)
            .default_scheme("{BOUND}")
            .build()
            .unwrap();

        assert!(matches!(
            schemes.hash(b"pw", None, &ctx()),
            Err(HashError::Failed(_))
        ));

        let session = ExecutionContext {
            channel_binding: Some(b"tls-unique:abc".to_vec()),
        };
        let bound = SchemeContext::new(Some(&session));
        let tagged = schemes.hash(b"pw", None, &bound).unwrap();
        assert!(schemes.verify(&[tagged.clone()], b"pw", &bound));

        let other = ExecutionContext {
            channel_binding: Some(b"tls-unique:xyz".to_vec()),
        };
        assert!(!schemes.verify(&[tagged], b"pw", &SchemeContext::new(Some(&other))));
    }

    fn hammer(overlap: &Arc<Overlap>) -> bool {
        let schemes = PasswordSchemes::builder()
            .register(Arc::clone(overlap))
            .default_scheme(overlap.name())
            .build()
            .unwrap();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..4 {
                        let tagged = schemes.hash(b"pw", None, &ctx()).unwrap();
                        assert!(schemes.verify(&[tagged], b"pw", &ctx()));
                    }
                });
            }
        });

        overlap.overlapped.load(Ordering::SeqCst)
    }

    #[test]
    fn exclusive_schemes_never_overlap() {
        let overlap = Arc::new(Overlap::new(true));
        assert!(!hammer(&overlap));
    }

    #[test]
    fn shared_schemes_run_concurrently() {
        let overlap = Arc::new(Overlap::new(false));
        assert!(hammer(&overlap));
    }
}
