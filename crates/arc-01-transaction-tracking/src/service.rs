//! # Transaction Tracker Service
//!
//! Publishes one kickoff notification per context and one notification per
//! mined transaction, on the context's topic and on every ancestor's topic.
//!
//! ## Notification Sequence
//!
//! ```text
//! begin_operation("DAO.new", total = 3)      -> txReceipts.DAO.new          count 0, tx null
//! record_step_mined(r1)                      -> txReceipts.DAO.new          count 1, r1
//!   begin_operation("SchemeRegistrar.registerSchemes", total = 2, parent)
//!                                            -> ...DAO.new.SchemeRegistrar.registerSchemes  count 0, tx null
//!                                            -> txReceipts.DAO.new          count 1, tx null
//!   record_step_mined(child, r2)             -> ...registerSchemes          count 1, r2
//!                                            -> txReceipts.DAO.new          count 2, r2
//!   record_step_mined(child, r3)             -> ...registerSchemes          count 2, r3
//!                                            -> txReceipts.DAO.new          count 3, r3
//! ```
//!
//! A re-published kickoff carries the ancestor's current count, so every
//! topic sees a non-decreasing sequence.
//!
//! ## Reentrancy
//!
//! Counts are taken under a lock shared by the whole context tree, but
//! subscribers run after it is released. A subscriber may begin nested
//! operations or record steps on the same tree; its notifications are
//! queued behind the ones being delivered.

use crate::domain::context::Pending;
use crate::domain::{TrackedOperation, TxEventContext};
use crate::errors::TrackerError;
use serde_json::Value;
use shared_bus::{ArcEvent, EventPublisher, Topic};
use shared_types::{NetworkError, TransactionReceipt, TxEventInfo};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Coordinates lifecycle notifications for tracked operations.
pub struct TransactionTracker {
    bus: Arc<dyn EventPublisher>,
    root: Topic,
}

impl TransactionTracker {
    /// Create a tracker publishing under `txReceipts`.
    pub fn new(bus: Arc<dyn EventPublisher>) -> Self {
        Self::with_root(bus, Topic::tx_receipts())
    }

    /// Create a tracker publishing under a custom root topic.
    pub fn with_root(bus: Arc<dyn EventPublisher>, root: Topic) -> Self {
        Self { bus, root }
    }

    /// Root topic for top-level operations.
    #[must_use]
    pub fn root(&self) -> &Topic {
        &self.root
    }

    /// Open a context for `operation` using its own estimate and options.
    ///
    /// # Errors
    ///
    /// See [`Self::begin_operation`].
    pub fn begin(
        &self,
        operation: &dyn TrackedOperation,
        parent: Option<&TxEventContext>,
    ) -> Result<TxEventContext, TrackerError> {
        self.begin_operation(
            operation.name(),
            operation.options(),
            operation.estimate_step_count(),
            parent,
        )
    }

    /// Open a context and publish its kickoff (`txCount = 0`, `tx = null`).
    ///
    /// A nested context's kickoff is re-published on every ancestor's topic
    /// with that ancestor's current count, so subscribers on a top-level
    /// topic see sub-operations start without knowing the depth.
    ///
    /// # Errors
    ///
    /// - `TrackerError::Topic` if `name` is not a valid topic suffix
    /// - `TrackerError::NestedEstimateExceeded` if an ancestor has fewer
    ///   transactions left than `total_steps`
    pub fn begin_operation(
        &self,
        name: &str,
        options: Value,
        total_steps: u32,
        parent: Option<&TxEventContext>,
    ) -> Result<TxEventContext, TrackerError> {
        let base = parent.map_or(&self.root, TxEventContext::topic);
        let topic = base.child(name)?;
        let context = TxEventContext::new(topic, options, total_steps, parent.cloned());

        {
            let mut outbox = context.outbox().lock();
            if let Some(ancestor) = context
                .lineage()
                .skip(1)
                .find(|a| a.remaining() < total_steps)
            {
                error!(
                    topic = %context.topic(),
                    parent = %ancestor.topic(),
                    requested = total_steps,
                    remaining = ancestor.remaining(),
                    "Nested operation exceeds parent estimate"
                );
                return Err(TrackerError::NestedEstimateExceeded {
                    topic: context.topic().to_string(),
                    parent: ancestor.topic().to_string(),
                    requested: total_steps,
                    remaining: ancestor.remaining(),
                });
            }

            outbox.queue.push_back(Self::pending(&context, 0, None));
            for ancestor in context.lineage().skip(1) {
                outbox.queue.push_back(Pending {
                    topic: ancestor.topic().clone(),
                    info: TxEventInfo {
                        topic: ancestor.topic().to_string(),
                        options: context.options().clone(),
                        tx_count: ancestor.tx_count(),
                        tx: None,
                        context_id: context.id(),
                    },
                    total_steps: ancestor.total_steps(),
                });
            }
        }
        self.flush(&context);

        info!(
            topic = %context.topic(),
            context = %context.id(),
            total_steps,
            depth = context.depth(),
            "Operation started"
        );
        Ok(context)
    }

    /// Record one mined transaction for `context`.
    ///
    /// Increments the count of the context and of every ancestor, publishing
    /// a notification carrying `receipt` on each of their topics. Must be
    /// called once per transaction, in mining order.
    ///
    /// # Returns
    ///
    /// The context's new transaction count.
    ///
    /// # Errors
    ///
    /// `TrackerError::EstimateExceeded` if the context or an ancestor has
    /// already recorded all its announced transactions. Nothing is published.
    pub fn record_step_mined(
        &self,
        context: &TxEventContext,
        receipt: &TransactionReceipt,
    ) -> Result<u32, TrackerError> {
        let step = {
            let mut outbox = context.outbox().lock();

            if let Some(full) = context.lineage().find(|c| c.remaining() == 0) {
                error!(
                    topic = %full.topic(),
                    expected = full.total_steps(),
                    tx = %receipt.tx_hash,
                    "Transaction recorded beyond estimate"
                );
                return Err(TrackerError::EstimateExceeded {
                    topic: full.topic().to_string(),
                    expected: full.total_steps(),
                });
            }

            let step = context.increment();
            outbox.queue.push_back(Self::pending(context, step, Some(receipt)));
            for ancestor in context.lineage().skip(1) {
                let count = ancestor.increment();
                outbox.queue.push_back(Self::pending(ancestor, count, Some(receipt)));
            }
            step
        };
        self.flush(context);
        Ok(step)
    }

    /// Await one submission and record it when mined.
    ///
    /// # Errors
    ///
    /// - `TrackerError::StepFailed` if the submission fails; nothing is
    ///   published and earlier notifications stand
    /// - any error from [`Self::record_step_mined`]
    pub async fn run_step<F>(
        &self,
        context: &TxEventContext,
        submission: F,
    ) -> Result<TransactionReceipt, TrackerError>
    where
        F: Future<Output = Result<TransactionReceipt, NetworkError>>,
    {
        match submission.await {
            Ok(receipt) => {
                self.record_step_mined(context, &receipt)?;
                Ok(receipt)
            }
            Err(source) => {
                let step = context.tx_count() + 1;
                warn!(
                    topic = %context.topic(),
                    step,
                    error = %source,
                    "Transaction failed before being mined"
                );
                Err(TrackerError::StepFailed {
                    topic: context.topic().to_string(),
                    step,
                    source,
                })
            }
        }
    }

    /// Check that `context` recorded exactly the announced number of
    /// transactions.
    ///
    /// # Errors
    ///
    /// `TrackerError::EstimateShortfall` if fewer were recorded.
    pub fn complete(&self, context: &TxEventContext) -> Result<(), TrackerError> {
        if !context.is_complete() {
            error!(
                topic = %context.topic(),
                expected = context.total_steps(),
                observed = context.tx_count(),
                "Operation finished short of its estimate"
            );
            return Err(TrackerError::EstimateShortfall {
                topic: context.topic().to_string(),
                expected: context.total_steps(),
                observed: context.tx_count(),
            });
        }
        info!(
            topic = %context.topic(),
            context = %context.id(),
            tx_count = context.tx_count(),
            "Operation complete"
        );
        Ok(())
    }

    fn pending(context: &TxEventContext, tx_count: u32, tx: Option<&TransactionReceipt>) -> Pending {
        Pending {
            topic: context.topic().clone(),
            info: TxEventInfo {
                topic: context.topic().to_string(),
                options: context.options().clone(),
                tx_count,
                tx: tx.cloned(),
                context_id: context.id(),
            },
            total_steps: context.total_steps(),
        }
    }

    /// Publish queued notifications of `context`'s tree unless another
    /// caller is already doing so.
    fn flush(&self, context: &TxEventContext) {
        {
            let mut outbox = context.outbox().lock();
            if outbox.draining {
                return;
            }
            outbox.draining = true;
        }

        loop {
            let next = {
                let mut outbox = context.outbox().lock();
                match outbox.queue.pop_front() {
                    Some(next) => next,
                    None => {
                        outbox.draining = false;
                        return;
                    }
                }
            };

            let tx_count = next.info.tx_count;
            let delivered = self
                .bus
                .publish(&next.topic, ArcEvent::TxLifecycle(next.info));
            debug!(
                topic = %next.topic,
                tx_count,
                total = next.total_steps,
                delivered,
                "Lifecycle notification published"
            );
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Composite, SingleCall};
    use parking_lot::Mutex;
    use serde_json::json;
    use shared_bus::{InMemoryEventBus, SubscriberError, Subscription, TopicPattern};
    use shared_types::Hash;

    fn receipt(n: u64) -> TransactionReceipt {
        TransactionReceipt {
            tx_hash: Hash::from_low_u64(n),
            block_number: n,
            from: Default::default(),
            to: None,
            contract_address: None,
            gas_used: 21_000,
            logs: Vec::new(),
        }
    }

    struct Harness {
        bus: Arc<InMemoryEventBus>,
        tracker: TransactionTracker,
    }

    impl Harness {
        fn new() -> Self {
            let bus = Arc::new(InMemoryEventBus::new());
            let tracker = TransactionTracker::new(bus.clone());
            Self { bus, tracker }
        }

        fn record(&self, pattern: TopicPattern) -> (Arc<Mutex<Vec<TxEventInfo>>>, Subscription) {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let sink = seen.clone();
            let sub = self.bus.subscribe(pattern, move |_, event| {
                if let Some(info) = event.as_tx_lifecycle() {
                    sink.lock().push(info.clone());
                }
                Ok::<(), SubscriberError>(())
            });
            (seen, sub)
        }
    }

    fn exact(topic: &str) -> TopicPattern {
        TopicPattern::exact(&Topic::parse(topic).unwrap())
    }

    fn counts(infos: &[TxEventInfo]) -> Vec<u32> {
        infos.iter().map(|i| i.tx_count).collect()
    }

    fn hashes(infos: &[TxEventInfo]) -> Vec<Option<Hash>> {
        infos.iter().map(|i| i.tx.as_ref().map(|r| r.tx_hash)).collect()
    }

    #[test]
    fn test_three_step_operation_sequence() {
        let h = Harness::new();
        let (seen, _sub) = h.record(exact("txReceipts.Op.create"));

        let context = h
            .tracker
            .begin_operation("Op.create", json!({ "n": 2 }), 3, None)
            .unwrap();
        for n in 1..=3 {
            assert_eq!(h.tracker.record_step_mined(&context, &receipt(n)).unwrap(), n as u32);
        }
        h.tracker.complete(&context).unwrap();

        let seen = seen.lock();
        assert_eq!(counts(&seen), vec![0, 1, 2, 3]);
        assert_eq!(
            hashes(&seen),
            vec![
                None,
                Some(Hash::from_low_u64(1)),
                Some(Hash::from_low_u64(2)),
                Some(Hash::from_low_u64(3))
            ]
        );
        assert!(seen.iter().all(|i| i.options == json!({ "n": 2 })));
        assert!(seen.iter().all(|i| i.topic == "txReceipts.Op.create"));
        assert!(seen.iter().all(|i| i.context_id == context.id()));
    }

    #[test]
    fn test_step_beyond_estimate_fails_loudly() {
        let h = Harness::new();
        let (seen, _sub) = h.record(TopicPattern::All);

        let context = h.tracker.begin_operation("Op.single", json!({}), 1, None).unwrap();
        h.tracker.record_step_mined(&context, &receipt(1)).unwrap();

        let err = h.tracker.record_step_mined(&context, &receipt(2)).unwrap_err();
        assert!(err.is_estimate_mismatch());
        assert!(matches!(err, TrackerError::EstimateExceeded { expected: 1, .. }));
        assert_eq!(seen.lock().len(), 2);
        assert_eq!(context.tx_count(), 1);
    }

    #[test]
    fn test_shortfall_detected_on_complete() {
        let h = Harness::new();
        let context = h.tracker.begin_operation("Op.pair", json!({}), 2, None).unwrap();
        h.tracker.record_step_mined(&context, &receipt(1)).unwrap();

        let err = h.tracker.complete(&context).unwrap_err();
        assert_eq!(
            err,
            TrackerError::EstimateShortfall {
                topic: "txReceipts.Op.pair".to_string(),
                expected: 2,
                observed: 1,
            }
        );
    }

    #[test]
    fn test_nested_operation_aggregates_into_parent() {
        let h = Harness::new();
        let (parent_exact, _a) = h.record(exact("txReceipts.DAO.new"));
        let (parent_plain, _b) = h.record(TopicPattern::parse("txReceipts.DAO.new").unwrap());
        let (below_parent, _c) = h.record(TopicPattern::parse("txReceipts.DAO.new.*").unwrap());
        let (child_exact, _d) =
            h.record(exact("txReceipts.DAO.new.SchemeRegistrar.registerSchemes"));

        let parent = h.tracker.begin_operation("DAO.new", json!({}), 3, None).unwrap();
        h.tracker.record_step_mined(&parent, &receipt(1)).unwrap();

        let child = h
            .tracker
            .begin_operation("SchemeRegistrar.registerSchemes", json!({ "count": 2 }), 2, Some(&parent))
            .unwrap();
        h.tracker.record_step_mined(&child, &receipt(2)).unwrap();
        h.tracker.record_step_mined(&child, &receipt(3)).unwrap();
        h.tracker.complete(&child).unwrap();
        h.tracker.complete(&parent).unwrap();

        // Parent topic: own kickoff, first step, child kickoff, child steps.
        let parent_exact = parent_exact.lock();
        assert_eq!(counts(&parent_exact), vec![0, 1, 1, 2, 3]);
        assert!(parent_exact.iter().all(|i| i.topic == "txReceipts.DAO.new"));
        assert_eq!(
            hashes(&parent_exact),
            vec![
                None,
                Some(Hash::from_low_u64(1)),
                None,
                Some(Hash::from_low_u64(2)),
                Some(Hash::from_low_u64(3))
            ]
        );
        let child_kickoff = &parent_exact[2];
        assert_eq!(child_kickoff.context_id, child.id());
        assert_eq!(child_kickoff.options, json!({ "count": 2 }));

        // Child topic: its own N + 1 sequence.
        let child_exact = child_exact.lock();
        assert_eq!(counts(&child_exact), vec![0, 1, 2]);
        assert_eq!(
            &hashes(&child_exact)[1..],
            &[Some(Hash::from_low_u64(2)), Some(Hash::from_low_u64(3))]
        );

        // A plain pattern is exact; descendants need the wildcard form.
        assert_eq!(parent_plain.lock().as_slice(), parent_exact.as_slice());
        assert_eq!(below_parent.lock().as_slice(), child_exact.as_slice());
    }

    #[test]
    fn test_child_kickoff_reaches_parent_topic() {
        let h = Harness::new();
        let (seen, _sub) = h.record(exact("txReceipts.DAO.new"));

        let parent = h.tracker.begin_operation("DAO.new", json!({}), 2, None).unwrap();
        let child = h
            .tracker
            .begin_operation("Organization.registerSchemes", json!({}), 2, Some(&parent))
            .unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|i| i.is_kickoff() && i.tx_count == 0));
        assert_eq!(seen[0].context_id, parent.id());
        assert_eq!(seen[1].context_id, child.id());
    }

    #[test]
    fn test_three_level_nesting() {
        let h = Harness::new();
        let (all, _sub) = h.record(TopicPattern::All);

        let root = h.tracker.begin_operation("a", json!({}), 2, None).unwrap();
        let middle = h.tracker.begin_operation("b", json!({}), 2, Some(&root)).unwrap();
        let leaf = h.tracker.begin_operation("c", json!({}), 1, Some(&middle)).unwrap();
        assert_eq!(leaf.topic().as_str(), "txReceipts.a.b.c");

        h.tracker.record_step_mined(&leaf, &receipt(1)).unwrap();
        h.tracker.record_step_mined(&middle, &receipt(2)).unwrap();

        assert!(leaf.is_complete() && middle.is_complete() && root.is_complete());

        let all = all.lock();
        let on = |topic: &str| -> Vec<u32> {
            all.iter()
                .filter(|i| i.topic == topic)
                .map(|i| i.tx_count)
                .collect()
        };
        // Root: own kickoff, middle and leaf kickoffs, leaf step, middle step.
        assert_eq!(on("txReceipts.a"), vec![0, 0, 0, 1, 2]);
        assert_eq!(on("txReceipts.a.b"), vec![0, 0, 1, 2]);
        assert_eq!(on("txReceipts.a.b.c"), vec![0, 1]);
        // Kickoffs at 1 + 2 + 3 levels, leaf step at 3, middle step at 2.
        assert_eq!(all.len(), 6 + 3 + 2);
    }

    #[test]
    fn test_subscriber_may_begin_nested_operation() {
        let h = Harness::new();
        let tracker = Arc::new(TransactionTracker::new(h.bus.clone()));
        let parent_slot: Arc<Mutex<Option<TxEventContext>>> = Arc::new(Mutex::new(None));
        let followup_slot: Arc<Mutex<Option<TxEventContext>>> = Arc::new(Mutex::new(None));

        let (seen, _seen) = h.record(exact("txReceipts.DAO.new"));
        let _reactor = {
            let tracker = tracker.clone();
            let parent_slot = parent_slot.clone();
            let followup_slot = followup_slot.clone();
            h.bus.subscribe(exact("txReceipts.DAO.new"), move |_, event| {
                let first_step = event.as_tx_lifecycle().is_some_and(|i| i.tx_count == 1 && !i.is_kickoff());
                if first_step {
                    if let Some(parent) = parent_slot.lock().clone() {
                        let followup =
                            tracker.begin_operation("followup", json!({}), 1, Some(&parent))?;
                        tracker.record_step_mined(&followup, &receipt(9))?;
                        *followup_slot.lock() = Some(followup);
                    }
                }
                Ok(())
            })
        };

        let parent = tracker.begin_operation("DAO.new", json!({}), 2, None).unwrap();
        *parent_slot.lock() = Some(parent.clone());
        tracker.record_step_mined(&parent, &receipt(1)).unwrap();

        let followup = followup_slot.lock().clone().unwrap();
        assert!(followup.is_complete());
        assert!(parent.is_complete());
        // Reentrant notifications are delivered after the one that caused them.
        assert_eq!(counts(&seen.lock()), vec![0, 1, 1, 2]);
        assert_eq!(seen.lock()[3].tx.as_ref().unwrap().tx_hash, Hash::from_low_u64(9));
    }

    #[test]
    fn test_nested_estimate_larger_than_parent_remaining() {
        let h = Harness::new();
        let parent = h.tracker.begin_operation("DAO.new", json!({}), 2, None).unwrap();
        h.tracker.record_step_mined(&parent, &receipt(1)).unwrap();

        let err = h
            .tracker
            .begin_operation("SchemeRegistrar.registerSchemes", json!({}), 2, Some(&parent))
            .unwrap_err();
        assert!(matches!(
            err,
            TrackerError::NestedEstimateExceeded {
                requested: 2,
                remaining: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_child_step_blocked_by_exhausted_parent() {
        let h = Harness::new();
        let parent = h.tracker.begin_operation("p", json!({}), 1, None).unwrap();
        let child = h.tracker.begin_operation("c", json!({}), 1, Some(&parent)).unwrap();
        h.tracker.record_step_mined(&parent, &receipt(1)).unwrap();

        let err = h.tracker.record_step_mined(&child, &receipt(2)).unwrap_err();
        assert_eq!(
            err,
            TrackerError::EstimateExceeded {
                topic: "txReceipts.p".to_string(),
                expected: 1,
            }
        );
        assert_eq!(child.tx_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_step_publishes_nothing() {
        let h = Harness::new();
        let (seen, _sub) = h.record(TopicPattern::All);
        let context = h.tracker.begin_operation("Op.pair", json!({}), 2, None).unwrap();

        h.tracker
            .run_step(&context, async { Ok(receipt(1)) })
            .await
            .unwrap();
        let err = h
            .tracker
            .run_step(&context, async {
                Err(NetworkError::TransactionFailed {
                    reason: "reverted".to_string(),
                })
            })
            .await
            .unwrap_err();

        assert!(matches!(err, TrackerError::StepFailed { step: 2, .. }));
        assert_eq!(counts(&seen.lock()), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_failed_step_labelled_after_concurrent_progress() {
        let h = Harness::new();
        let context = h.tracker.begin_operation("Op.pair", json!({}), 2, None).unwrap();

        // Another step lands while this submission is still pending.
        let err = h
            .tracker
            .run_step(&context, async {
                h.tracker.record_step_mined(&context, &receipt(1)).unwrap();
                Err(NetworkError::TransactionFailed {
                    reason: "reverted".to_string(),
                })
            })
            .await
            .unwrap_err();

        assert!(matches!(err, TrackerError::StepFailed { step: 2, .. }));
    }

    #[test]
    fn test_begin_from_tracked_operation() {
        let h = Harness::new();
        let op = Composite::new("DAO.new", json!({ "name": "Acme" }), 1)
            .with_child(SingleCall::new("SchemeRegistrar.registerScheme", json!({})));

        let context = h.tracker.begin(&op, None).unwrap();
        assert_eq!(context.total_steps(), 2);
        assert_eq!(context.options(), &json!({ "name": "Acme" }));
    }

    #[test]
    fn test_invalid_operation_name() {
        let h = Harness::new();
        let err = h.tracker.begin_operation("DAO..new", json!({}), 1, None).unwrap_err();
        assert!(matches!(err, TrackerError::Topic(_)));
        assert_eq!(h.bus.events_published(), 0);
    }
}
