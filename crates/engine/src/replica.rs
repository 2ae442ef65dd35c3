use std::collections::BTreeMap;

use tracing::debug;

use syncline_core::{ChangeId, Checkpoint, CheckpointId, ModifyOutcome, PendingMutation};

use crate::error::ReplicaError;
use crate::queue::ReconcileQueue;

/// The last authoritative snapshot plus the queue of local changes not yet
/// settled against it. Reads go through `view`, which layers the queue over
/// the base; writes stage a mutation and hand back the handle the network
/// layer confirms once the server responds.
///
/// Single-owner: confirmations may originate on background completions, but
/// the owner marshals every call here onto its own sequencing context.
pub struct Replica<K, V> {
    base: BTreeMap<K, V>,
    queue: ReconcileQueue<K, V>,
}

impl<K: Ord + Clone, V: Clone> Replica<K, V> {
    pub fn new() -> Self {
        Self::with_base(BTreeMap::new())
    }

    /// Start from a previously persisted authoritative snapshot.
    pub fn with_base(base: BTreeMap<K, V>) -> Self {
        Self {
            base,
            queue: ReconcileQueue::new(),
        }
    }

    // ========================================================================
    // Staging
    // ========================================================================

    /// Optimistically set `key` to `value`.
    pub fn stage_insert(&mut self, key: K, value: V) -> ChangeId {
        self.queue.append(PendingMutation::insert(key, value))
    }

    /// Optimistically transform the value at `key`, if present.
    pub fn stage_modify(
        &mut self,
        key: K,
        transform: impl Fn(V) -> ModifyOutcome<V> + 'static,
    ) -> ChangeId {
        self.queue.append(PendingMutation::modify(key, transform))
    }

    /// Optimistically delete the entry at `key`.
    pub fn stage_remove(&mut self, key: K) -> ChangeId {
        self.queue.append(PendingMutation::remove(key))
    }

    /// Record the server's acknowledgement of a staged change.
    pub fn confirm(&mut self, id: ChangeId) -> bool {
        self.queue.confirm_mutation(id)
    }

    // ========================================================================
    // Refresh lifecycle
    // ========================================================================

    /// Append a checkpoint bracketing a full-state fetch. Call immediately
    /// before issuing the request; pass the handle to `complete_refresh`
    /// (or `abort_refresh`) when the round trip ends.
    pub fn begin_refresh(&mut self) -> CheckpointId {
        self.queue.append_checkpoint(Checkpoint::new())
    }

    /// Install the fetched snapshot as the new base, confirm the
    /// checkpoint, and prune the history it supersedes.
    ///
    /// Errs when the checkpoint is no longer in the queue: a later refresh
    /// already superseded this one, and installing its older snapshot would
    /// regress the base.
    pub fn complete_refresh(
        &mut self,
        id: CheckpointId,
        authoritative: BTreeMap<K, V>,
    ) -> Result<(), ReplicaError> {
        if !self.queue.contains_checkpoint(id) {
            return Err(ReplicaError::StaleRefresh { checkpoint: id });
        }
        self.base = authoritative;
        self.queue.confirm_checkpoint(id);
        debug!(checkpoint = %id, entries = self.base.len(), "refresh installed");
        Ok(())
    }

    /// Confirm the checkpoint without touching the base: the fetch failed
    /// or was abandoned, and the marker must stop gating later prunes.
    /// Returns whether the checkpoint was still in the queue.
    pub fn abort_refresh(&mut self, id: CheckpointId) -> bool {
        self.queue.confirm_checkpoint(id)
    }

    /// Overlay fetched rows onto the base without a checkpoint, e.g. one
    /// page of an incremental fetch.
    pub fn merge_base(&mut self, items: impl IntoIterator<Item = (K, V)>) {
        self.base.extend(items);
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// The optimistic view: every staged mutation folded over the base.
    /// Pure and non-blocking; safe to call on every render.
    pub fn view(&self) -> BTreeMap<K, V> {
        self.queue.apply_to(&self.base)
    }

    pub fn base(&self) -> &BTreeMap<K, V> {
        &self.base
    }

    pub fn queue(&self) -> &ReconcileQueue<K, V> {
        &self.queue
    }

    /// At least one staged change or open refresh awaits the server.
    pub fn has_outstanding(&self) -> bool {
        self.queue.has_pending()
    }

    /// All history confirmed and pruned: the view equals the base.
    pub fn is_settled(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<K: Ord + Clone, V: Clone> Default for Replica<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pairs: &[(&str, i64)]) -> BTreeMap<String, i64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn staged_changes_show_in_view_before_confirmation() {
        let mut replica = Replica::with_base(snapshot(&[("a", 1)]));
        replica.stage_insert("b".to_string(), 2);
        replica.stage_remove("a".to_string());

        assert_eq!(replica.view(), snapshot(&[("b", 2)]));
        assert_eq!(replica.base(), &snapshot(&[("a", 1)]));
        assert!(replica.has_outstanding());
    }

    #[test]
    fn refresh_cycle_settles_confirmed_history() {
        let mut replica = Replica::new();
        let change = replica.stage_insert("a".to_string(), 1);
        replica.confirm(change);

        let checkpoint = replica.begin_refresh();
        // Server state already embeds the confirmed insert.
        replica
            .complete_refresh(checkpoint, snapshot(&[("a", 1)]))
            .unwrap();

        assert!(replica.is_settled());
        assert_eq!(replica.view(), snapshot(&[("a", 1)]));
    }

    #[test]
    fn pending_change_survives_refresh() {
        let mut replica = Replica::new();
        replica.stage_insert("a".to_string(), 1);

        let checkpoint = replica.begin_refresh();
        replica.complete_refresh(checkpoint, snapshot(&[("z", 9)])).unwrap();

        // Base replaced, but the unconfirmed insert still layers on top.
        assert_eq!(replica.view(), snapshot(&[("a", 1), ("z", 9)]));
        assert!(!replica.is_settled());
    }

    #[test]
    fn stale_refresh_is_rejected() {
        let mut replica: Replica<String, i64> = Replica::new();
        let change = replica.stage_insert("a".to_string(), 1);
        replica.confirm(change);

        let checkpoint = replica.begin_refresh();
        replica
            .complete_refresh(checkpoint, snapshot(&[("a", 1)]))
            .unwrap();
        assert!(replica.is_settled());

        // The same response delivered twice: the checkpoint was consumed by
        // the first prune, so the duplicate must not clobber the base.
        let result = replica.complete_refresh(checkpoint, BTreeMap::new());
        assert!(matches!(result, Err(ReplicaError::StaleRefresh { .. })));
        assert_eq!(replica.base(), &snapshot(&[("a", 1)]));
    }

    #[test]
    fn abort_refresh_keeps_base_and_unblocks_pruning() {
        let mut replica = Replica::with_base(snapshot(&[("a", 1)]));
        let change = replica.stage_insert("b".to_string(), 2);
        replica.confirm(change);

        let checkpoint = replica.begin_refresh();
        assert!(replica.abort_refresh(checkpoint));

        assert_eq!(replica.base(), &snapshot(&[("a", 1)]));
        assert!(replica.is_settled());
        assert_eq!(replica.view(), snapshot(&[("a", 1)]));
    }

    #[test]
    fn merge_base_overlays_fetched_rows() {
        let mut replica = Replica::with_base(snapshot(&[("a", 1)]));
        replica.merge_base(snapshot(&[("a", 5), ("b", 2)]));

        assert_eq!(replica.base(), &snapshot(&[("a", 5), ("b", 2)]));
    }
}
