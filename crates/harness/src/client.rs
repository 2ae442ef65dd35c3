use std::collections::BTreeMap;

use syncline_core::{ChangeId, CheckpointId, ModifyOutcome};
use syncline_engine::{Replica, ReplicaError};

use crate::service::{Call, FakeService};

/// Membership row the test client tracks per circle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Circle {
    pub title: String,
    pub joined: bool,
}

impl Circle {
    pub fn new(title: &str, joined: bool) -> Self {
        Self {
            title: title.to_string(),
            joined,
        }
    }
}

/// A client owning a replica of its circle list plus the fake service its
/// optimistic actions go out on. Mirrors the production wiring: every
/// staged change immediately produces an in-flight call whose resolution
/// confirms the corresponding queue entry.
pub struct TestClient {
    pub replica: Replica<String, Circle>,
    pub service: FakeService,
}

impl Default for TestClient {
    fn default() -> Self {
        Self::new()
    }
}

impl TestClient {
    pub fn new() -> Self {
        crate::init_logging();
        Self {
            replica: Replica::new(),
            service: FakeService::new(),
        }
    }

    /// A client whose base snapshot was already fetched.
    pub fn with_circles(rows: &[(&str, Circle)]) -> Self {
        let base: BTreeMap<String, Circle> = rows
            .iter()
            .map(|(id, circle)| (id.to_string(), circle.clone()))
            .collect();
        let mut client = Self::new();
        client.replica = Replica::with_base(base);
        client
    }

    // ========================================================================
    // Optimistic actions
    // ========================================================================

    /// Optimistically join a circle already in the list.
    pub fn join(&mut self, circle_id: &str) -> ChangeId {
        let id = self.replica.stage_modify(circle_id.to_string(), |circle: Circle| {
            ModifyOutcome::Keep(Circle {
                joined: true,
                ..circle
            })
        });
        self.service.send(Call::Action(id));
        id
    }

    /// Optimistically leave a circle already in the list.
    pub fn leave(&mut self, circle_id: &str) -> ChangeId {
        let id = self.replica.stage_modify(circle_id.to_string(), |circle: Circle| {
            ModifyOutcome::Keep(Circle {
                joined: false,
                ..circle
            })
        });
        self.service.send(Call::Action(id));
        id
    }

    /// Optimistically create a circle.
    pub fn create_circle(&mut self, circle_id: &str, circle: Circle) -> ChangeId {
        let id = self.replica.stage_insert(circle_id.to_string(), circle);
        self.service.send(Call::Action(id));
        id
    }

    /// Optimistically delete a circle.
    pub fn delete_circle(&mut self, circle_id: &str) -> ChangeId {
        let id = self.replica.stage_remove(circle_id.to_string());
        self.service.send(Call::Action(id));
        id
    }

    /// Stage a compensating change after the server rejected an action:
    /// the queue has no rollback, so the application appends the reverse.
    pub fn stage_compensation(
        &mut self,
        circle_id: &str,
        transform: impl Fn(Circle) -> ModifyOutcome<Circle> + 'static,
    ) -> ChangeId {
        self.replica.stage_modify(circle_id.to_string(), transform)
    }

    // ========================================================================
    // Server round trips
    // ========================================================================

    /// Checkpoint the queue and put a full-state fetch in flight.
    pub fn start_refresh(&mut self) -> CheckpointId {
        let id = self.replica.begin_refresh();
        self.service.send(Call::Refresh(id));
        id
    }

    /// The server acknowledged an action: confirm its queue entry.
    pub fn resolve_action(&mut self, id: ChangeId) -> bool {
        self.service.resolve(Call::Action(id));
        self.replica.confirm(id)
    }

    /// The full-state fetch came back with `rows`.
    pub fn resolve_refresh(
        &mut self,
        id: CheckpointId,
        rows: &[(&str, Circle)],
    ) -> Result<(), ReplicaError> {
        self.service.resolve(Call::Refresh(id));
        let authoritative = rows
            .iter()
            .map(|(circle_id, circle)| (circle_id.to_string(), circle.clone()))
            .collect();
        self.replica.complete_refresh(id, authoritative)
    }

    /// The full-state fetch failed; the checkpoint stops gating prunes.
    pub fn fail_refresh(&mut self, id: CheckpointId) -> bool {
        self.service.resolve(Call::Refresh(id));
        self.replica.abort_refresh(id)
    }

    /// The optimistic circle list as rendered.
    pub fn view(&self) -> BTreeMap<String, Circle> {
        self.replica.view()
    }
}
