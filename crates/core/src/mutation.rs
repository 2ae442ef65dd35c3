use std::collections::BTreeMap;
use std::fmt;

use crate::ids::ChangeId;

/// Result of a `Modify` transform: replace the value or drop the entry.
/// Explicit so a conditional modify-or-delete reads as what it is at the
/// call site instead of hiding behind an optional return.
pub enum ModifyOutcome<V> {
    Keep(V),
    Remove,
}

type ModifyFn<V> = Box<dyn Fn(V) -> ModifyOutcome<V>>;

/// A single change to one entry of a keyed snapshot. Closed set: `apply`
/// matches exhaustively.
pub enum Mutation<K, V> {
    /// Transform the current value, if the key is present. `Remove`
    /// outcomes delete the entry; absent keys are a no-op.
    Modify { key: K, transform: ModifyFn<V> },
    /// Set or overwrite the entry unconditionally.
    Insert { key: K, value: V },
    /// Delete the entry, if present.
    Remove { key: K },
}

impl<K, V> Mutation<K, V> {
    /// The key this mutation addresses.
    pub fn key(&self) -> &K {
        match self {
            Self::Modify { key, .. } | Self::Insert { key, .. } | Self::Remove { key } => key,
        }
    }

    /// Apply this mutation in place. Total: never fails, whatever the
    /// snapshot contents.
    pub fn apply(&self, map: &mut BTreeMap<K, V>)
    where
        K: Ord + Clone,
        V: Clone,
    {
        match self {
            Self::Modify { key, transform } => {
                if let Some(value) = map.remove(key) {
                    match transform(value) {
                        ModifyOutcome::Keep(next) => {
                            map.insert(key.clone(), next);
                        }
                        ModifyOutcome::Remove => {}
                    }
                }
            }
            Self::Insert { key, value } => {
                map.insert(key.clone(), value.clone());
            }
            Self::Remove { key } => {
                map.remove(key);
            }
        }
    }
}

impl<K: fmt::Debug, V> fmt::Debug for Mutation<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Modify { key, .. } => f
                .debug_struct("Modify")
                .field("key", key)
                .finish_non_exhaustive(),
            Self::Insert { key, .. } => f
                .debug_struct("Insert")
                .field("key", key)
                .finish_non_exhaustive(),
            Self::Remove { key } => f.debug_struct("Remove").field("key", key).finish(),
        }
    }
}

/// A user action applied to the local view before the server has seen it.
/// Compared by identity token, never structurally: two records built from
/// identical mutations stay distinguishable for later individual
/// confirmation.
#[derive(Debug)]
pub struct PendingMutation<K, V> {
    id: ChangeId,
    mutation: Mutation<K, V>,
    confirmed: bool,
}

impl<K, V> PendingMutation<K, V> {
    /// A pending transform of the value at `key`.
    pub fn modify(key: K, transform: impl Fn(V) -> ModifyOutcome<V> + 'static) -> Self {
        Self::new(Mutation::Modify {
            key,
            transform: Box::new(transform),
        })
    }

    /// A pending insert of `value` at `key`.
    pub fn insert(key: K, value: V) -> Self {
        Self::new(Mutation::Insert { key, value })
    }

    /// A pending removal of the entry at `key`.
    pub fn remove(key: K) -> Self {
        Self::new(Mutation::Remove { key })
    }

    fn new(mutation: Mutation<K, V>) -> Self {
        Self {
            id: ChangeId::new(),
            mutation,
            confirmed: false,
        }
    }

    pub fn id(&self) -> ChangeId {
        self.id
    }

    pub fn mutation(&self) -> &Mutation<K, V> {
        &self.mutation
    }

    /// True once the server has acknowledged this change.
    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    /// Flip the confirmation flag. Monotonic; calling twice is harmless.
    pub fn mark_confirmed(&mut self) {
        self.confirmed = true;
    }

    /// Apply the underlying mutation in place. Does not consult the
    /// confirmation flag.
    pub fn apply_to(&self, map: &mut BTreeMap<K, V>)
    where
        K: Ord + Clone,
        V: Clone,
    {
        self.mutation.apply(map);
    }
}

impl<K, V> PartialEq for PendingMutation<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<K, V> Eq for PendingMutation<K, V> {}
