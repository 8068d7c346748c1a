//! Target resolution, access checks and referrals.
//!
//! Flow Overview:
//! 1) Resolve the target from the request identity, or fall back to the
//!    caller and the partition bound to their session.
//! 2) Refuse the root DSE and partitions without modify support.
//! 3) Ask the admission gate.
//! 4) Hand targets outside every partition to the external store.
//! 5) Refer changes for read-only replicas unless running multi-writer.

use super::codec::PasswdRequest;
use super::error::ExopError;
use crate::directory::{AdmissionGate, Dn, Partition, PartitionResolver, RequestKind, Session};
use std::sync::Arc;
use tracing::debug;
use url::Url;

pub(crate) struct Target {
    pub dn: Dn,
    pub partition: Arc<dyn Partition>,
}

pub(crate) enum Route {
    Local(Target),
    External(Dn),
    Refer(Vec<String>),
}

pub(crate) struct Router<'a> {
    pub resolver: &'a dyn PartitionResolver,
    pub gate: &'a dyn AdmissionGate,
    pub multi_writer: bool,
}

impl Router<'_> {
    pub fn route(
        &self,
        session: &dyn Session,
        caller: &Dn,
        request: &PasswdRequest,
    ) -> Result<Route, ExopError> {
        let (dn, partition) = match request.identity.as_deref().filter(|id| !id.is_empty()) {
            Some(identity) => {
                let dn = Dn::from_bytes(identity).map_err(|err| {
                    debug!("invalid identity: {err}");
                    ExopError::InvalidDnSyntax("Invalid DN".to_string())
                })?;
                let partition = self.resolver.select_partition(&dn);
                (dn, partition)
            }
            None => (caller.clone(), session.authz_partition()),
        };

        if dn.is_root() {
            return Err(ExopError::Unwilling(
                "no password is associated with the Root DSE".to_string(),
            ));
        }

        if let Some(partition) = &partition {
            if !partition.supports_modify() {
                return Err(ExopError::Unwilling(
                    "operation not supported for current user".to_string(),
                ));
            }
        }

        self.gate
            .check_restrictions(RequestKind::PasswordModify, &dn)?;

        let Some(partition) = partition else {
            return Ok(Route::External(dn));
        };

        if !self.multi_writer && partition.is_read_only_replica() {
            debug!("{} is held by a read-only replica", dn.normalized());
            return Ok(Route::Refer(referrals(partition.as_ref())));
        }

        Ok(Route::Local(Target { dn, partition }))
    }
}

/// Live providers if known, else the rewritten static update referrals.
pub(crate) fn referrals(partition: &dyn Partition) -> Vec<String> {
    let providers = partition.upstream_providers();
    if !providers.is_empty() {
        return providers;
    }

    partition
        .update_referrals()
        .iter()
        .filter_map(|reference| rewrite_referral(reference))
        .collect()
}

/// Strip the DN from an LDAP URL so the client keeps its own target.
///
/// Non-LDAP URLs are returned unchanged; unparsable ones are dropped.
#[must_use]
pub fn rewrite_referral(reference: &str) -> Option<String> {
    let mut url = match Url::parse(reference) {
        Ok(url) => url,
        Err(err) => {
            debug!("dropping referral {reference}: {err}");
            return None;
        }
    };

    if !matches!(url.scheme(), "ldap" | "ldaps" | "ldapi") {
        return Some(reference.to_string());
    }

    url.set_path("/");
    Some(url.to_string())
}
