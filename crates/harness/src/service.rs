use syncline_core::{ChangeId, CheckpointId};

/// An in-flight server call: the acknowledgement the queue is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Action(ChangeId),
    Refresh(CheckpointId),
}

/// Stand-in for the RPC layer: calls accumulate until the test resolves or
/// drops them, in whatever order the scenario needs.
pub struct FakeService {
    in_flight: Vec<Call>,
}

impl Default for FakeService {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeService {
    pub fn new() -> Self {
        Self {
            in_flight: Vec::new(),
        }
    }

    pub fn send(&mut self, call: Call) {
        self.in_flight.push(call);
    }

    /// Remove a call from the in-flight set. Returns whether it was there.
    pub fn resolve(&mut self, call: Call) -> bool {
        match self.in_flight.iter().position(|c| *c == call) {
            Some(index) => {
                self.in_flight.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn calls(&self) -> &[Call] {
        &self.in_flight
    }

    /// Simulate the connection dropping: every in-flight call is lost and
    /// will never be acknowledged.
    pub fn drop_all(&mut self) {
        self.in_flight.clear();
    }
}
