//! Password modify extended operation.
//!
//! Flow Overview:
//! 1) Refuse anonymous callers, then decode the payload.
//! 2) Route the change: local partition, external store or referral.
//! 3) Take the presented password or generate one for the response.
//! 4) Hash it, drop the plaintext and submit a single-value replace.
//! 5) Enqueue the committed change for replication.

pub mod ber;
pub mod codec;
pub mod config;
pub mod error;
mod modify;
pub mod routing;


pub use codec::{decode, encode_response, Field, FieldPolicy, PasswdRequest};
pub use config::ExopConfig;
pub use error::{result_code, ExopError, Outcome, ResponseData};
pub use routing::rewrite_referral;

use crate::directory::{
    AdmissionGate, Dn, NoopAdmissionGate, NoopReplicationLog, PartitionResolver, ReplicationLog,
    Session,
};
use crate::password::{
    self, PasswordSchemes, SchemeContext, TaggedCredential, GENERATED_PASSWORD_LENGTH,
};
use chrono::Utc;
use routing::{Route, Router};
use secrecy::{ExposeSecret, SecretSlice};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

pub const OID_PASSWORD_MODIFY: &str = "1.3.6.1.4.1.4203.1.11.1";

/// Raw extended request as handed over by the protocol layer.
#[derive(Clone, Copy, Debug)]
pub struct ExtendedRequest<'a> {
    pub oid: &'a str,
    pub value: Option<&'a [u8]>,
}

impl<'a> ExtendedRequest<'a> {
    #[must_use]
    pub const fn password_modify(value: Option<&'a [u8]>) -> Self {
        Self {
            oid: OID_PASSWORD_MODIFY,
            value,
        }
    }
}

/// Credential store for identities that no local partition holds.
pub trait ExternalCredentialStore: Send + Sync {
    /// # Errors
    /// Returns the store's verdict when the change is refused.
    fn set_credential(
        &self,
        session: &dyn Session,
        target: &Dn,
        request: &PasswdRequest,
    ) -> Result<Outcome, ExopError>;
}

/// Engine shared by every connection; cheap to clone.
#[derive(Clone)]
pub struct PasswdExop {
    config: ExopConfig,
    schemes: Arc<PasswordSchemes>,
    resolver: Arc<dyn PartitionResolver>,
    gate: Arc<dyn AdmissionGate>,
    replication: Arc<dyn ReplicationLog>,
    external: Option<Arc<dyn ExternalCredentialStore>>,
}

impl PasswdExop {
    #[must_use]
    pub fn new(
        config: ExopConfig,
        schemes: Arc<PasswordSchemes>,
        resolver: Arc<dyn PartitionResolver>,
    ) -> Self {
        Self {
            config,
            schemes,
            resolver,
            gate: Arc::new(NoopAdmissionGate),
            replication: Arc::new(NoopReplicationLog),
            external: None,
        }
    }

    #[must_use]
    pub fn with_admission_gate(mut self, gate: Arc<dyn AdmissionGate>) -> Self {
        self.gate = gate;
        self
    }

    #[must_use]
    pub fn with_replication_log(mut self, replication: Arc<dyn ReplicationLog>) -> Self {
        self.replication = replication;
        self
    }

    #[must_use]
    pub fn with_external_store(mut self, store: Arc<dyn ExternalCredentialStore>) -> Self {
        self.external = Some(store);
        self
    }

    #[must_use]
    pub fn config(&self) -> &ExopConfig {
        &self.config
    }

    #[must_use]
    pub fn schemes(&self) -> &PasswordSchemes {
        &self.schemes
    }

    /// Handle one password modify request on behalf of `session`.
    ///
    /// # Errors
    /// Returns an `ExopError` carrying the result code and diagnostic text
    /// for every refused or failed change.
    #[instrument(skip_all, fields(oid = request.oid))]
    pub fn handle(
        &self,
        session: &dyn Session,
        request: ExtendedRequest<'_>,
    ) -> Result<Outcome, ExopError> {
        if request.oid != OID_PASSWORD_MODIFY {
            debug!("unexpected oid {}", request.oid);
            return Err(ExopError::Protocol("unsupported extended operation".to_string()));
        }

        let caller = session.authenticated_identity();
        if caller.is_root() {
            return Err(ExopError::AuthenticationRequired(
                "only authenticated users may change passwords".to_string(),
            ));
        }

        let payload = codec::decode(request.value.unwrap_or_default(), self.config.field_policy())?;
        debug!("request from {}: {payload:?}", caller.normalized());

        let router = Router {
            resolver: self.resolver.as_ref(),
            gate: self.gate.as_ref(),
            multi_writer: self.config.multi_writer(),
        };

        let target = match router.route(session, &caller, &payload)? {
            Route::Local(target) => target,
            Route::Refer(referrals) => {
                info!("referring password change ({} referrals)", referrals.len());
                return Ok(Outcome::Referral(referrals));
            }
            Route::External(dn) => {
                let Some(store) = &self.external else {
                    return Err(ExopError::Internal("no authz backend".to_string()));
                };
                debug!("delegating {} to the external credential store", dn.normalized());
                return store.set_credential(session, &dn, &payload);
            }
        };

        let (plaintext, response) = match payload.new_credential.as_deref().filter(|v| !v.is_empty())
        {
            Some(presented) => (SecretSlice::from(presented.clone()), None),
            None => {
                let generated = password::generate(GENERATED_PASSWORD_LENGTH).map_err(|err| {
                    error!("{err}");
                    ExopError::Internal("password generation failed".to_string())
                })?;
                let response = codec::encode_response(generated.expose_secret())?;
                (generated, Some(response))
            }
        };

        let context = session.execution_context();
        let credential = self.hash(&plaintext, &SchemeContext::new(context.as_ref()));
        drop(plaintext);
        let credential = credential?;

        let change = modify::build_request(target.dn, &caller, credential, Utc::now());
        modify::dispatch(target.partition.as_ref(), self.replication.as_ref(), change)?;

        info!("password changed");
        Ok(Outcome::Success(response.map(ResponseData::new)))
    }

    /// Hash with the configured default scheme, else the registry's default.
    fn hash(
        &self,
        plaintext: &SecretSlice<u8>,
        ctx: &SchemeContext<'_>,
    ) -> Result<TaggedCredential, ExopError> {
        self.schemes
            .hash(plaintext.expose_secret(), self.config.default_scheme(), ctx)
            .map_err(|err| ExopError::Internal(err.to_string()))
    }

    /// Check a presented password against the stored values of an entry,
    /// using the same registry and locking as password changes.
    #[must_use]
    #[instrument(skip_all)]
    pub fn verify_credentials(
        &self,
        session: &dyn Session,
        stored: &[TaggedCredential],
        presented: &[u8],
    ) -> bool {
        let context = session.execution_context();
        self.schemes
            .verify(stored, presented, &SchemeContext::new(context.as_ref()))
    }
}

impl std::fmt::Debug for PasswdExop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswdExop")
            .field("config", &self.config)
            .field("schemes", &self.schemes)
            .field("external", &self.external.is_some())
            .finish_non_exhaustive()
    }
}
