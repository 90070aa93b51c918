//! In-process typed publish/subscribe bus.
//!
//! Publishing stamps the event timestamp, snapshots the current subscriber
//! list for the event's kind and schedules one task per subscriber in
//! subscription order. The publisher never waits for handler completion, and
//! a failing handler never prevents delivery to the others.

use std::{
    future::Future,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, error};

use crate::events::{DomainEvent, EventKind};
use crate::{ERROR_TARGET, EVENT_TARGET, Error};

type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), Error>> + Send>>;
type Handler = Arc<dyn Fn(DomainEvent) -> HandlerFuture + Send + Sync>;

struct Registration {
    id: u64,
    name: &'static str,
    handler: Handler,
}

/// Identifies a subscription so it can be removed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// One bus instance lives for the whole process, owned by the context and
/// injected into every component.
#[derive(Clone)]
pub struct EventBus(Arc<BusInner>);

struct BusInner {
    subscribers: DashMap<EventKind, Vec<Registration>>,
    next_id: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(BusInner {
            subscribers: DashMap::new(),
            next_id: AtomicU64::new(0),
        }))
    }

    /// Register a handler for one event kind. The `name` shows up in error
    /// logs when the handler fails.
    pub fn subscribe<F, Fut>(&self, kind: EventKind, name: &'static str, handler: F) -> SubscriptionId
    where
        F: Fn(DomainEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let id = self.0.next_id.fetch_add(1, Ordering::Relaxed);
        let handler: Handler = Arc::new(move |event| Box::pin(handler(event)));
        self.0
            .subscribers
            .entry(kind)
            .or_default()
            .push(Registration { id, name, handler });
        SubscriptionId(id)
    }

    pub fn unsubscribe(&self, kind: EventKind, subscription: SubscriptionId) {
        if let Some(mut registrations) = self.0.subscribers.get_mut(&kind) {
            registrations.retain(|registration| registration.id != subscription.0);
        }
    }

    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.0
            .subscribers
            .get(&kind)
            .map_or(0, |registrations| registrations.len())
    }

    /// Publish an event to all current subscribers of its kind.
    ///
    /// The emitted-at timestamp is stamped here, overwriting any value the
    /// producer set. Handlers registered after this call returns will not see
    /// the event; there is no buffering or replay.
    pub fn publish(&self, event: impl Into<DomainEvent>) {
        let mut event = event.into();
        event.metadata.emitted_at = Some(Utc::now());
        let kind = event.kind();

        // Snapshot under the shard lock, then release before scheduling so
        // handlers may subscribe or publish without deadlocking.
        let snapshot: Vec<(&'static str, Handler)> = self
            .0
            .subscribers
            .get(&kind)
            .map(|registrations| {
                registrations
                    .iter()
                    .map(|registration| (registration.name, Arc::clone(&registration.handler)))
                    .collect()
            })
            .unwrap_or_default();

        debug!(
            target: EVENT_TARGET,
            kind = %kind,
            subscribers = snapshot.len(),
            "Publishing event"
        );

        for (name, handler) in snapshot {
            let event = event.clone();
            tokio::spawn(async move {
                if let Err(error) = handler(event).await {
                    error!(
                        target: ERROR_TARGET,
                        subscriber = name,
                        error = %error,
                        "Event handler failed"
                    );
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::SendMessage;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    fn outbound(text: &str) -> SendMessage {
        SendMessage::text("chat-test", text)
    }

    #[tokio::test]
    async fn test_publish_stamps_emitted_at() {
        let bus = EventBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        bus.subscribe(EventKind::SendMessage, "probe", move |event| {
            let tx = tx.clone();
            async move {
                tx.send(event.metadata.emitted_at).unwrap();
                Ok(())
            }
        });

        // Producers cannot pre-stamp the timestamp
        let mut event: DomainEvent = outbound("hi").into();
        event.metadata.emitted_at = Some(chrono::DateTime::UNIX_EPOCH.into());
        let before = Utc::now();
        bus.publish(event);

        let stamped = rx.recv().await.unwrap().unwrap();
        assert!(stamped >= before);
    }

    #[tokio::test]
    async fn test_delivery_in_subscription_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let (tx, mut rx) = mpsc::unbounded_channel();

        for tag in 1..=3u32 {
            let order = Arc::clone(&order);
            let tx = tx.clone();
            bus.subscribe(EventKind::SendMessage, "ordered", move |_| {
                let order = Arc::clone(&order);
                let tx = tx.clone();
                async move {
                    order.lock().unwrap().push(tag);
                    tx.send(()).unwrap();
                    Ok(())
                }
            });
        }

        bus.publish(outbound("go"));
        for _ in 0..3 {
            rx.recv().await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_block_others() {
        let bus = EventBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        bus.subscribe(EventKind::SendMessage, "failing", |_| async {
            Err::<(), Error>("boom".into())
        });
        bus.subscribe(EventKind::SendMessage, "healthy", move |_| {
            let tx = tx.clone();
            async move {
                tx.send(()).unwrap();
                Ok(())
            }
        });

        bus.publish(outbound("go"));
        // The healthy subscriber still runs after its sibling fails
        rx.recv().await.unwrap();
    }

    #[tokio::test]
    async fn test_no_delivery_to_late_subscribers() {
        let bus = EventBus::new();
        bus.publish(outbound("early"));

        let (tx, mut rx) = mpsc::unbounded_channel();
        bus.subscribe(EventKind::SendMessage, "late", move |_| {
            let tx = tx.clone();
            async move {
                tx.send(()).unwrap();
                Ok(())
            }
        });

        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());

        // A fresh publish reaches the subscriber
        bus.publish(outbound("later"));
        rx.recv().await.unwrap();
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscription = bus.subscribe(EventKind::SendMessage, "removable", move |_| {
            let tx = tx.clone();
            async move {
                tx.send(()).unwrap();
                Ok(())
            }
        });
        assert_eq!(bus.subscriber_count(EventKind::SendMessage), 1);

        bus.unsubscribe(EventKind::SendMessage, subscription);
        assert_eq!(bus.subscriber_count(EventKind::SendMessage), 0);

        bus.publish(outbound("gone"));
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }
}
