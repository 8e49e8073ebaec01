// src/dedup.rs
use std::collections::HashSet;

/// Identifiers already announced.
/// - `contains` is a pure check, consulted before filtering and before each send.
/// - `mark_seen` is called explicitly after a confirmed delivery.
///
/// Kept behind a trait so a persistent store can replace the in-memory one
/// without touching the filter or the dispatcher.
pub trait SeenStore: Send + Sync {
    fn contains(&self, identifier: &str) -> bool;
    /// Returns `true` if the identifier was not present before.
    fn mark_seen(&mut self, identifier: &str) -> bool;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-lifetime set. Grows monotonically, lost on restart.
#[derive(Debug, Clone, Default)]
pub struct InMemorySeenSet {
    ids: HashSet<String>,
}

impl InMemorySeenSet {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SeenStore for InMemorySeenSet {
    fn contains(&self, identifier: &str) -> bool {
        self.ids.contains(identifier)
    }

    fn mark_seen(&mut self, identifier: &str) -> bool {
        self.ids.insert(identifier.to_string())
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}
