//! # Transaction Event Context
//!
//! Identity and running state of one tracked operation. Nested operations
//! hold their parent explicitly; there is no ambient scope.

use parking_lot::Mutex;
use serde_json::Value;
use shared_bus::Topic;
use shared_types::TxEventInfo;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use uuid::Uuid;

struct ContextInner {
    id: Uuid,
    topic: Topic,
    options: Value,
    total_steps: u32,
    tx_count: AtomicU32,
    parent: Option<TxEventContext>,
    /// Shared by every context in one tree.
    outbox: Arc<Mutex<Outbox>>,
}

/// A notification taken under the tree lock, awaiting publication.
pub(crate) struct Pending {
    pub(crate) topic: Topic,
    pub(crate) info: TxEventInfo,
    pub(crate) total_steps: u32,
}

/// Notifications of one context tree in the order their counts were taken.
///
/// Counts are checked and advanced while the lock is held; publishing
/// happens after it is released, by whichever caller claimed `draining`.
#[derive(Default)]
pub(crate) struct Outbox {
    pub(crate) queue: VecDeque<Pending>,
    pub(crate) draining: bool,
}

/// One logical, possibly composite, operation.
///
/// Cheap to clone; clones share the running count, so a context handed by
/// value into a nested call still aggregates into the same tally.
#[derive(Clone)]
pub struct TxEventContext {
    inner: Arc<ContextInner>,
}

impl TxEventContext {
    pub(crate) fn new(
        topic: Topic,
        options: Value,
        total_steps: u32,
        parent: Option<TxEventContext>,
    ) -> Self {
        let outbox = parent
            .as_ref()
            .map_or_else(Arc::default, |p| p.inner.outbox.clone());
        Self {
            inner: Arc::new(ContextInner {
                id: Uuid::new_v4(),
                topic,
                options,
                total_steps,
                tx_count: AtomicU32::new(0),
                parent,
                outbox,
            }),
        }
    }

    /// Unique id of this context.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Topic notifications are published on.
    #[must_use]
    pub fn topic(&self) -> &Topic {
        &self.inner.topic
    }

    /// Arguments of the originating call.
    #[must_use]
    pub fn options(&self) -> &Value {
        &self.inner.options
    }

    /// Transactions expected, fixed at kickoff.
    #[must_use]
    pub fn total_steps(&self) -> u32 {
        self.inner.total_steps
    }

    /// Transactions recorded so far.
    #[must_use]
    pub fn tx_count(&self) -> u32 {
        self.inner.tx_count.load(Ordering::SeqCst)
    }

    /// Transactions still expected.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.total_steps().saturating_sub(self.tx_count())
    }

    /// True once every expected transaction has been recorded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.tx_count() == self.total_steps()
    }

    /// Enclosing context, if this operation is nested.
    #[must_use]
    pub fn parent(&self) -> Option<&TxEventContext> {
        self.inner.parent.as_ref()
    }

    /// Root of the context tree.
    #[must_use]
    pub fn root(&self) -> &TxEventContext {
        let mut current = self;
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Nesting depth; a top-level context has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.lineage().count() - 1
    }

    /// This context followed by each ancestor up to the root.
    pub fn lineage(&self) -> impl Iterator<Item = &TxEventContext> {
        std::iter::successors(Some(self), |context| context.parent())
    }

    pub(crate) fn outbox(&self) -> &Mutex<Outbox> {
        &self.inner.outbox
    }

    /// Advance the running count. Callers hold the outbox lock.
    pub(crate) fn increment(&self) -> u32 {
        self.inner.tx_count.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl PartialEq for TxEventContext {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for TxEventContext {}

impl fmt::Debug for TxEventContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxEventContext")
            .field("id", &self.inner.id)
            .field("topic", &self.inner.topic.as_str())
            .field("tx_count", &self.tx_count())
            .field("total_steps", &self.inner.total_steps)
            .field("parent", &self.inner.parent.as_ref().map(TxEventContext::id))
            .finish()
    }
}
