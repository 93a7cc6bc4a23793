//! # Event Subscriber
//!
//! Defines the subscription side of the event bus: callback subscriptions
//! with RAII unsubscribe, and channel receivers for async consumers.

use crate::events::{ArcEvent, BusMessage};
use crate::topic::{Topic, TopicPattern};
use parking_lot::RwLock;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The event bus was closed.
    #[error("Event bus closed")]
    Closed,
}

/// Error type a subscriber callback may return. Reported by the bus,
/// never propagated to the publisher.
pub type SubscriberError = Box<dyn std::error::Error + Send + Sync>;

/// Callback invoked for each matching publish.
pub type Callback = Arc<dyn Fn(&Topic, &ArcEvent) -> Result<(), SubscriberError> + Send + Sync>;

// =============================================================================
// CALLBACK REGISTRY
// =============================================================================

/// One registered callback.
pub(crate) struct CallbackEntry {
    pub(crate) id: u64,
    pub(crate) patterns: Vec<TopicPattern>,
    pub(crate) active: AtomicBool,
    pub(crate) callback: Callback,
}

impl CallbackEntry {
    pub(crate) fn matches(&self, topic: &Topic) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(topic))
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Live callback subscriptions, shared between the bus and its handles.
#[derive(Default)]
pub(crate) struct CallbackRegistry {
    entries: RwLock<Vec<Arc<CallbackEntry>>>,
}

impl CallbackRegistry {
    pub(crate) fn insert(&self, entry: Arc<CallbackEntry>) {
        self.entries.write().push(entry);
    }

    /// Snapshot of active entries matching `topic`. The lock is released
    /// before any callback runs, so callbacks may publish or unsubscribe.
    pub(crate) fn matching(&self, topic: &Topic) -> Vec<Arc<CallbackEntry>> {
        self.entries
            .read()
            .iter()
            .filter(|entry| entry.is_active() && entry.matches(topic))
            .cloned()
            .collect()
    }

    fn remove(&self, id: u64) {
        self.entries.write().retain(|entry| entry.id != id);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }
}

// =============================================================================
// CALLBACK SUBSCRIPTION
// =============================================================================

/// Handle for a callback subscription.
///
/// Dropping the handle unsubscribes. After `unsubscribe` returns, the bus
/// will not begin another invocation of the callback; an invocation that
/// already started may still complete.
#[must_use = "dropping a Subscription unsubscribes it"]
pub struct Subscription {
    entry: Arc<CallbackEntry>,
    registry: Weak<CallbackRegistry>,
}

impl Subscription {
    pub(crate) fn new(entry: Arc<CallbackEntry>, registry: Weak<CallbackRegistry>) -> Self {
        Self { entry, registry }
    }

    /// Stop receiving events. Idempotent.
    pub fn unsubscribe(&self) {
        if !self.entry.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.entry.id);
        }
        debug!(subscription = self.entry.id, "Subscription released");
    }

    /// True until `unsubscribe` is called or the handle dropped.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.entry.is_active()
    }

    /// Patterns this subscription listens on.
    #[must_use]
    pub fn patterns(&self) -> &[TopicPattern] {
        &self.entry.patterns
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.entry.id)
            .field("patterns", &self.entry.patterns)
            .field("active", &self.is_active())
            .finish()
    }
}

// =============================================================================
// CHANNEL RECEIVER
// =============================================================================

/// Async receiver for events matching a pattern.
pub struct TopicReceiver {
    /// The broadcast receiver.
    receiver: broadcast::Receiver<BusMessage>,

    /// Pattern for this receiver.
    pattern: TopicPattern,
}

impl TopicReceiver {
    pub(crate) fn new(receiver: broadcast::Receiver<BusMessage>, pattern: TopicPattern) -> Self {
        Self { receiver, pattern }
    }

    /// Receive the next message that matches the pattern.
    ///
    /// # Returns
    ///
    /// - `Some(message)` - The next matching message
    /// - `None` - The channel was closed (bus dropped)
    pub async fn recv(&mut self) -> Option<BusMessage> {
        loop {
            let message = match self.receiver.recv().await {
                Ok(m) => m,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "Receiver lagged, some events dropped");
                    continue;
                }
            };

            if self.pattern.matches(&message.topic) {
                return Some(message);
            }
        }
    }

    /// Try to receive the next message without blocking.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(message))` - A message was available and matched
    /// - `Ok(None)` - No message available (would block)
    /// - `Err(SubscriptionError::Closed)` - The channel was closed
    pub fn try_recv(&mut self) -> Result<Option<BusMessage>, SubscriptionError> {
        loop {
            let message = match self.receiver.try_recv() {
                Ok(m) => m,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            };

            if self.pattern.matches(&message.topic) {
                return Ok(Some(message));
            }
        }
    }

    /// Get the pattern for this receiver.
    #[must_use]
    pub fn pattern(&self) -> &TopicPattern {
        &self.pattern
    }

    /// Convert into a `Stream` of matching messages.
    #[must_use]
    pub fn into_stream(self) -> EventStream {
        EventStream::new(self)
    }
}

/// A stream wrapper for topic receivers.
///
/// Implements `tokio_stream::Stream` for use with stream combinators.
pub struct EventStream {
    inner: BroadcastStream<BusMessage>,
    pattern: TopicPattern,
}

impl EventStream {
    /// Create a new event stream from a receiver.
    #[must_use]
    pub fn new(receiver: TopicReceiver) -> Self {
        Self {
            inner: BroadcastStream::new(receiver.receiver),
            pattern: receiver.pattern,
        }
    }

    /// Get the pattern for this stream.
    #[must_use]
    pub fn pattern(&self) -> &TopicPattern {
        &self.pattern
    }
}

impl Stream for EventStream {
    type Item = BusMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(message))) => {
                    if self.pattern.matches(&message.topic) {
                        return Poll::Ready(Some(message));
                    }
                }
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(count)))) => {
                    debug!(lagged = count, "Stream lagged, some events dropped");
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
