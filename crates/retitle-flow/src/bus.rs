//! Topic-addressed event bus.
//!
//! The bus is the pipeline's only controller: stages subscribe to their
//! trigger topic, publish to their success/error topics, and the resulting
//! topic graph *is* the job's possible paths. Publish is fire-and-forget;
//! delivery is asynchronous and at-least-once, so every handler must
//! tolerate duplicate delivery of the same envelope.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::error::{Error, Result};
use crate::events::Event;
use crate::metrics as flow_metrics;
use crate::topic::Topic;

fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::storage("subscriber lock poisoned")
}

/// A handler invoked once per delivered event.
///
/// Handlers must never propagate failures back into the bus: a failed
/// invocation is the handler's own problem to log or convert into an error
/// event. The bus does not retry beyond at-least-once redelivery.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handles one delivery.
    async fn handle(&self, event: Event);
}

/// Topic-addressed asynchronous dispatcher.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Enqueues delivery of `event` to every handler subscribed to its
    /// topic. Fire-and-forget: returns once delivery is scheduled, not once
    /// handlers ran.
    async fn publish(&self, event: Event) -> Result<()>;

    /// Registers a handler for a topic. One handler may be registered for
    /// several topics (the error aggregator is).
    fn subscribe(&self, topic: Topic, handler: Arc<dyn EventHandler>) -> Result<()>;
}

/// In-process event bus delivering each event on a spawned task per
/// subscriber.
///
/// # Limitations
///
/// This implementation is for single-process deployments and tests:
/// - No persistence: events in flight are lost if the process exits.
/// - No cross-process fan-out.
///
/// Delivery of one envelope to one subscriber happens exactly once in
/// practice; handlers must still be idempotent because callers may publish
/// the same envelope again (at-least-once is the contract, not the
/// mechanism).
#[derive(Clone, Default)]
pub struct InMemoryEventBus {
    inner: Arc<BusInner>,
}

#[derive(Default)]
struct BusInner {
    subscribers: RwLock<HashMap<Topic, Vec<Arc<dyn EventHandler>>>>,
    in_flight: AtomicUsize,
    idle: Notify,
}

/// Decrements the in-flight count when a delivery task finishes, even if the
/// handler panicked.
struct DeliveryGuard {
    inner: Arc<BusInner>,
}

impl Drop for DeliveryGuard {
    fn drop(&mut self) {
        if self.inner.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

impl InMemoryEventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until every in-flight delivery, including deliveries spawned by
    /// deliveries, has finished.
    ///
    /// A handler that publishes increments the in-flight count before its own
    /// delivery completes, so the count only reaches zero once the whole
    /// cascade has drained.
    pub async fn wait_idle(&self) {
        loop {
            if self.inner.in_flight.load(Ordering::Acquire) == 0 {
                return;
            }
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            // Register before the re-check; a wakeup landing in between
            // would otherwise be lost and this task would wait forever.
            notified.as_mut().enable();
            if self.inner.in_flight.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for InMemoryEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryEventBus")
            .field("in_flight", &self.inner.in_flight.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, event: Event) -> Result<()> {
        let topic = event.topic();
        let handlers = {
            let subscribers = self.inner.subscribers.read().map_err(poison_err)?;
            subscribers.get(&topic).cloned().unwrap_or_default()
        };

        flow_metrics::record_event_published(topic.as_str());
        if handlers.is_empty() {
            tracing::debug!(topic = %topic, event_id = %event.id, "no subscribers for topic");
            return Ok(());
        }

        for handler in handlers {
            self.inner.in_flight.fetch_add(1, Ordering::AcqRel);
            let guard = DeliveryGuard {
                inner: Arc::clone(&self.inner),
            };
            let event = event.clone();
            tokio::spawn(async move {
                let _guard = guard;
                tracing::debug!(
                    topic = %event.topic(),
                    event_id = %event.id,
                    idempotency_key = %event.idempotency_key,
                    "delivering event"
                );
                handler.handle(event).await;
            });
        }
        Ok(())
    }

    fn subscribe(&self, topic: Topic, handler: Arc<dyn EventHandler>) -> Result<()> {
        let mut subscribers = self.inner.subscribers.write().map_err(poison_err)?;
        subscribers.entry(topic).or_default().push(handler);
        Ok(())
    }
}
