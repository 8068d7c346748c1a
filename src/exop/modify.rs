//! Internal modify carrying the new password to the owning partition.

use super::error::ExopError;
use crate::directory::{
    CommittedChange, Dn, ModOp, Modification, ModifyRequest, Partition, ReplicationLog,
    MODIFIERS_NAME_ATTRIBUTE, MODIFY_TIMESTAMP_ATTRIBUTE, PASSWORD_ATTRIBUTE,
};
use crate::password::TaggedCredential;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use ulid::Ulid;

/// Replace the password attribute of `target` with `credential`, stamping
/// who made the change and when.
pub(crate) fn build_request(
    target: Dn,
    modifier: &Dn,
    credential: TaggedCredential,
    now: DateTime<Utc>,
) -> ModifyRequest {
    ModifyRequest {
        target,
        modifications: vec![
            Modification {
                op: ModOp::Replace,
                attribute: PASSWORD_ATTRIBUTE,
                values: vec![credential.into_bytes()],
            },
            Modification {
                op: ModOp::Replace,
                attribute: MODIFIERS_NAME_ATTRIBUTE,
                values: vec![modifier.raw().as_bytes().to_vec()],
            },
            Modification {
                op: ModOp::Replace,
                attribute: MODIFY_TIMESTAMP_ATTRIBUTE,
                values: vec![generalized_time(now).into_bytes()],
            },
        ],
    }
}

fn generalized_time(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d%H%M%SZ").to_string()
}

/// Submit the request and enqueue it for replication once committed.
///
/// The store's verdict is returned unchanged on failure.
pub(crate) fn dispatch(
    partition: &dyn Partition,
    replication: &dyn ReplicationLog,
    request: ModifyRequest,
) -> Result<(), ExopError> {
    match partition.modify(&request) {
        Ok(()) => {
            let change = CommittedChange {
                id: Ulid::new(),
                request,
            };
            debug!("enqueueing change {} for replication", change.id);
            replication.enqueue(change);
            Ok(())
        }
        Err(err) => {
            warn!(
                "modify of {} failed: {err}",
                request.target.normalized()
            );
            Err(ExopError::Backend(err))
        }
    }
}
