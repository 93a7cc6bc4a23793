//! # Event Publisher
//!
//! Defines the publishing side of the event bus.

use crate::events::{ArcEvent, BusMessage};
use crate::subscriber::{
    Callback, CallbackEntry, CallbackRegistry, SubscriberError, Subscription, TopicReceiver,
};
use crate::topic::{Topic, TopicPattern};
use crate::DEFAULT_CHANNEL_CAPACITY;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

/// Trait for publishing events to the bus.
pub trait EventPublisher: Send + Sync {
    /// Publish an event on `topic`.
    ///
    /// Callbacks run synchronously on the caller's task, so two publishes
    /// on the same topic are delivered in call order. Subscriber failures
    /// are logged and swallowed.
    ///
    /// # Returns
    ///
    /// The number of callback subscriptions invoked.
    fn publish(&self, topic: &Topic, event: ArcEvent) -> usize;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;
}

/// In-memory implementation of the event bus.
///
/// Callback subscriptions are held in an observer list and invoked in
/// registration order. Channel receivers are fed through
/// `tokio::sync::broadcast` and filter on their side.
pub struct InMemoryEventBus {
    /// Callback subscriptions.
    registry: Arc<CallbackRegistry>,

    /// Broadcast sender for channel receivers.
    sender: broadcast::Sender<BusMessage>,

    /// Source of subscription ids.
    next_id: AtomicU64,

    /// Total events published.
    events_published: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl InMemoryEventBus {
    /// Create a new in-memory event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory event bus with specified channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            registry: Arc::new(CallbackRegistry::default()),
            sender,
            next_id: AtomicU64::new(1),
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Register `callback` for every topic matched by `pattern`.
    ///
    /// A pattern that matches nothing is accepted; it simply never fires.
    pub fn subscribe<F>(&self, pattern: TopicPattern, callback: F) -> Subscription
    where
        F: Fn(&Topic, &ArcEvent) -> Result<(), SubscriberError> + Send + Sync + 'static,
    {
        self.subscribe_many(vec![pattern], callback)
    }

    /// Register one callback for several patterns. A publish matching more
    /// than one of them still invokes the callback once.
    pub fn subscribe_many<F>(&self, patterns: Vec<TopicPattern>, callback: F) -> Subscription
    where
        F: Fn(&Topic, &ArcEvent) -> Result<(), SubscriberError> + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let callback: Callback = Arc::new(callback);
        let entry = Arc::new(CallbackEntry {
            id,
            patterns,
            active: AtomicBool::new(true),
            callback,
        });

        debug!(subscription = id, patterns = ?entry.patterns, "New subscription created");
        self.registry.insert(entry.clone());
        Subscription::new(entry, Arc::downgrade(&self.registry))
    }

    /// Open a channel receiver for `pattern`.
    #[must_use]
    pub fn subscribe_channel(&self, pattern: TopicPattern) -> TopicReceiver {
        debug!(pattern = %pattern, "New channel receiver created");
        TopicReceiver::new(self.sender.subscribe(), pattern)
    }

    /// Get the number of live subscriptions (callbacks and channels).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry.len() + self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn deliver(entry: &CallbackEntry, topic: &Topic, event: &ArcEvent) {
        let outcome = catch_unwind(AssertUnwindSafe(|| (entry.callback)(topic, event)));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(error)) => warn!(
                subscription = entry.id,
                topic = %topic,
                error = %error,
                "Subscriber failed"
            ),
            Err(_) => warn!(
                subscription = entry.id,
                topic = %topic,
                "Subscriber panicked"
            ),
        }
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for InMemoryEventBus {
    fn publish(&self, topic: &Topic, event: ArcEvent) -> usize {
        // Always increment counter (event was attempted)
        self.events_published.fetch_add(1, Ordering::Relaxed);

        let mut invoked = 0;
        for entry in self.registry.matching(topic) {
            // Unsubscribe may have landed after the snapshot was taken.
            if !entry.is_active() {
                continue;
            }
            Self::deliver(&entry, topic, &event);
            invoked += 1;
        }

        if self.sender.receiver_count() > 0 {
            let kind = event.kind();
            if let Err(e) = self.sender.send(BusMessage {
                topic: topic.clone(),
                event,
            }) {
                trace!(topic = %topic, kind, error = %e, "No channel receivers");
            }
        }

        debug!(topic = %topic, callbacks = invoked, "Event published");
        invoked
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
