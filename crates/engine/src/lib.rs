pub mod error;
pub mod queue;
pub mod replica;

pub use error::ReplicaError;
pub use queue::ReconcileQueue;
pub use replica::Replica;
