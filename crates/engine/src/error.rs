use syncline_core::CheckpointId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplicaError {
    #[error("refresh checkpoint {checkpoint} is no longer in the queue")]
    StaleRefresh { checkpoint: CheckpointId },
}
