use std::collections::BTreeMap;

use tracing::{debug, trace};

use syncline_core::{ChangeId, Checkpoint, CheckpointId, PendingMutation};

enum Entry<K, V> {
    Mutation(PendingMutation<K, V>),
    Checkpoint(Checkpoint),
}

impl<K, V> Entry<K, V> {
    fn is_confirmed(&self) -> bool {
        match self {
            Self::Mutation(pending) => pending.is_confirmed(),
            Self::Checkpoint(checkpoint) => checkpoint.is_confirmed(),
        }
    }
}

/// An ordered history of pending mutations and refresh checkpoints.
///
/// Entries are appended at the tail in the order the user acted and are
/// never reordered. Confirmations flip a flag in place. History is only
/// discarded from the front, and only once both conditions hold for each
/// discarded mutation: it was individually confirmed, and a checkpoint
/// confirmed after it shows a fresh authoritative snapshot already embeds
/// its effect. Not internally synchronized; the owning context marshals
/// all calls.
pub struct ReconcileQueue<K, V> {
    entries: Vec<Entry<K, V>>,
}

impl<K, V> ReconcileQueue<K, V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a pending mutation at the tail, returning its handle for a
    /// later `confirm_mutation`.
    pub fn append(&mut self, pending: PendingMutation<K, V>) -> ChangeId {
        let id = pending.id();
        self.entries.push(Entry::Mutation(pending));
        trace!(change = %id, len = self.entries.len(), "mutation appended");
        id
    }

    /// Append a refresh checkpoint at the tail, returning its handle for a
    /// later `confirm_checkpoint`.
    pub fn append_checkpoint(&mut self, checkpoint: Checkpoint) -> CheckpointId {
        let id = checkpoint.id();
        self.entries.push(Entry::Checkpoint(checkpoint));
        trace!(checkpoint = %id, len = self.entries.len(), "checkpoint appended");
        id
    }

    /// Mark a mutation as acknowledged by the server. Never prunes.
    ///
    /// Returns whether the record was found. An id that was never appended
    /// or was already pruned is a no-op returning `false`: a late
    /// acknowledgement racing a completed refresh is a normal shape of
    /// event, not a fault.
    pub fn confirm_mutation(&mut self, id: ChangeId) -> bool {
        for entry in &mut self.entries {
            if let Entry::Mutation(pending) = entry
                && pending.id() == id
            {
                pending.mark_confirmed();
                trace!(change = %id, "mutation confirmed");
                return true;
            }
        }
        false
    }

    /// Mark a checkpoint's fetch as completed, then prune the confirmed
    /// prefix it supersedes.
    ///
    /// Returns whether the checkpoint was found. An unknown or pruned id is
    /// a no-op returning `false`: pruning against a missing target could
    /// discard mutations no completed refresh covers yet.
    pub fn confirm_checkpoint(&mut self, id: CheckpointId) -> bool {
        let mut found = false;
        for entry in &mut self.entries {
            if let Entry::Checkpoint(checkpoint) = entry
                && checkpoint.id() == id
            {
                checkpoint.mark_confirmed();
                found = true;
                break;
            }
        }
        if found {
            self.prune_confirmed(id);
        }
        found
    }

    /// Fold every mutation, front to back, over a copy of `base` and return
    /// the optimistic view. Checkpoints contribute nothing. Confirmation
    /// flags are not consulted: a confirmed mutation keeps applying until it
    /// is pruned, which is redundant over a fresh snapshot but harmless.
    pub fn apply_to(&self, base: &BTreeMap<K, V>) -> BTreeMap<K, V>
    where
        K: Ord + Clone,
        V: Clone,
    {
        let mut view = base.clone();
        for entry in &self.entries {
            match entry {
                Entry::Mutation(pending) => pending.apply_to(&mut view),
                Entry::Checkpoint(_) => {}
            }
        }
        view
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Fully drained: no history left at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// At least one entry still awaits server acknowledgement.
    pub fn has_pending(&self) -> bool {
        self.entries.iter().any(|entry| !entry.is_confirmed())
    }

    pub fn contains_mutation(&self, id: ChangeId) -> bool {
        self.entries.iter().any(|entry| {
            matches!(entry, Entry::Mutation(pending) if pending.id() == id)
        })
    }

    pub fn contains_checkpoint(&self, id: CheckpointId) -> bool {
        self.entries.iter().any(|entry| {
            matches!(entry, Entry::Checkpoint(checkpoint) if checkpoint.id() == id)
        })
    }

    /// Remove the longest safe prefix superseded by the confirmed
    /// checkpoint `prior_to`.
    ///
    /// The scan walks from the front and stops at the first unconfirmed
    /// entry or at the target checkpoint, whichever comes first: the
    /// removable run must be unbroken, even if later entries happen to be
    /// confirmed. Only mutation records advance the removable index; a
    /// confirmed checkpoint other than the target is walked over, and is
    /// discarded with the prefix when a later mutation extends the run past
    /// it. Reaching the target extends the removal through the target
    /// itself (a superseded marker carries no further meaning), but only
    /// when at least one mutation in the run is removable. If no confirmed
    /// mutation precedes the stop point, nothing is removed.
    fn prune_confirmed(&mut self, prior_to: CheckpointId) {
        let mut last_removable = None;
        for (index, entry) in self.entries.iter().enumerate() {
            if !entry.is_confirmed() {
                break;
            }
            match entry {
                Entry::Checkpoint(checkpoint) => {
                    if checkpoint.id() == prior_to {
                        if last_removable.is_some() {
                            last_removable = Some(index);
                        }
                        break;
                    }
                }
                Entry::Mutation(_) => last_removable = Some(index),
            }
        }

        if let Some(index) = last_removable {
            self.entries.drain(0..=index);
            debug!(
                removed = index + 1,
                remaining = self.entries.len(),
                checkpoint = %prior_to,
                "pruned confirmed prefix"
            );
        }
    }
}

impl<K, V> Default for ReconcileQueue<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
