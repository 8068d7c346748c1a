//! Contracts the password modify engine consumes from the rest of the server.
//!
//! The engine never stores anything itself. Partitions own the entries, the
//! session layer knows who is calling, the admission gate decides whether an
//! operation may run at all and the replication log ships committed changes.

pub mod dn;

pub use dn::{Dn, DnError};

use std::fmt;
use std::sync::Arc;
use ulid::Ulid;

/// Attribute holding tagged credentials.
pub const PASSWORD_ATTRIBUTE: &str = "userPassword";
pub const MODIFIERS_NAME_ATTRIBUTE: &str = "modifiersName";
pub const MODIFY_TIMESTAMP_ATTRIBUTE: &str = "modifyTimestamp";

/// An LDAP result code with its diagnostic text, reported by a store or gate.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("backend error {code}: {}", .text.as_deref().unwrap_or(""))]
pub struct BackendError {
    pub code: u16,
    pub text: Option<String>,
}

impl BackendError {
    #[must_use]
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            text: Some(text.into()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModOp {
    Add,
    Delete,
    Replace,
}

/// One attribute change within a modify request.
#[derive(Clone, PartialEq, Eq)]
pub struct Modification {
    pub op: ModOp,
    pub attribute: &'static str,
    pub values: Vec<Vec<u8>>,
}

impl fmt::Debug for Modification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // values of userPassword are hashes, but still not for logs
        let values: Vec<String> = if self.attribute == PASSWORD_ATTRIBUTE {
            self.values
                .iter()
                .map(|v| format!("[REDACTED; {}]", v.len()))
                .collect()
        } else {
            self.values
                .iter()
                .map(|v| String::from_utf8_lossy(v).into_owned())
                .collect()
        };
        f.debug_struct("Modification")
            .field("op", &self.op)
            .field("attribute", &self.attribute)
            .field("values", &values)
            .finish()
    }
}

/// An internal modify request addressed to a single entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModifyRequest {
    pub target: Dn,
    pub modifications: Vec<Modification>,
}

/// A modify that the owning partition accepted, as handed to replication.
#[derive(Clone, Debug)]
pub struct CommittedChange {
    pub id: Ulid,
    pub request: ModifyRequest,
}

/// The part of the directory responsible for a subtree.
pub trait Partition: Send + Sync {
    /// Suffix naming the subtree held by this partition.
    fn suffix(&self) -> &Dn;

    /// Whether this partition implements modify at all.
    fn supports_modify(&self) -> bool;

    /// Whether this partition is a read-only replica of an upstream provider.
    fn is_read_only_replica(&self) -> bool;

    /// Live addresses of the providers this replica syncs from.
    fn upstream_providers(&self) -> Vec<String>;

    /// Statically configured referral URLs for updates.
    fn update_referrals(&self) -> Vec<String>;

    /// Apply a modify atomically.
    ///
    /// # Errors
    /// Returns the store's result code and diagnostic text on failure.
    fn modify(&self, request: &ModifyRequest) -> Result<(), BackendError>;
}

/// Selects the partition that holds a given DN.
pub trait PartitionResolver: Send + Sync {
    fn select_partition(&self, dn: &Dn) -> Option<Arc<dyn Partition>>;
}

/// Opaque per-session material some schemes need, e.g. channel bindings.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    pub channel_binding: Option<Vec<u8>>,
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field(
                "channel_binding",
                &self.channel_binding.as_ref().map(Vec::len),
            )
            .finish()
    }
}

/// What the engine needs to know about the calling connection.
pub trait Session: Send + Sync {
    /// Authenticated identity; the root DN when the caller is anonymous.
    fn authenticated_identity(&self) -> Dn;

    /// Partition that authorized the caller's identity at bind time.
    fn authz_partition(&self) -> Option<Arc<dyn Partition>>;

    fn execution_context(&self) -> Option<ExecutionContext> {
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    PasswordModify,
}

impl RequestKind {
    #[must_use]
    pub const fn oid(self) -> &'static str {
        match self {
            Self::PasswordModify => crate::exop::OID_PASSWORD_MODIFY,
        }
    }
}

/// Store-wide restrictions (rate limits, read-only windows, policy).
pub trait AdmissionGate: Send + Sync {
    /// # Errors
    /// Returns the verdict to report to the caller when the operation is refused.
    fn check_restrictions(&self, kind: RequestKind, target: &Dn) -> Result<(), BackendError>;
}

#[derive(Clone, Debug)]
pub struct NoopAdmissionGate;

impl AdmissionGate for NoopAdmissionGate {
    fn check_restrictions(&self, _kind: RequestKind, _target: &Dn) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Fire-and-forget sink for committed changes.
pub trait ReplicationLog: Send + Sync {
    fn enqueue(&self, change: CommittedChange);
}

#[derive(Clone, Debug)]
pub struct NoopReplicationLog;

impl ReplicationLog for NoopReplicationLog {
    fn enqueue(&self, _change: CommittedChange) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_gate_allows() {
        let gate = NoopAdmissionGate;
        assert_eq!(
            gate.check_restrictions(RequestKind::PasswordModify, &Dn::root()),
            Ok(())
        );
    }

    #[test]
    fn password_values_are_redacted_in_debug() {
        let modification = Modification {
            op: ModOp::Replace,
            attribute: PASSWORD_ATTRIBUTE,
            values: vec![b"{SSHA}secret-hash".to_vec()],
        };
        let rendered = format!("{modification:?}");
        assert!(!rendered.contains("secret-hash"));
        assert!(rendered.contains("[REDACTED; 17]"));
    }

    #[test]
    fn backend_error_display_includes_text() {
        let err = BackendError::new(50, "insufficient access");
        assert_eq!(err.to_string(), "backend error 50: insufficient access");
    }

    #[test]
    fn request_kind_exposes_oid() {
        assert_eq!(
            RequestKind::PasswordModify.oid(),
            "1.3.6.1.4.1.4203.1.11.1"
        );
    }
}
