pub mod checkpoint;
pub mod ids;
pub mod mutation;

pub use checkpoint::Checkpoint;
pub use ids::{ChangeId, CheckpointId};
pub use mutation::{ModifyOutcome, Mutation, PendingMutation};
