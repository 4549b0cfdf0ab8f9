//! Change notifications keyed by resource identifier.
//!
//! Every successful write publishes its identifier on the bus. A subscriber
//! receives the event when its own identifier overlaps the published one:
//! the same path, an ancestor of it (the collection sees item and sell
//! writes), or a descendant of it (an item observer sees a bulk write on the
//! collection). Events are pushed onto each subscriber's channel before
//! `publish` returns, so they are visible as soon as the write call is done.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::trace;

use crate::contract::BookUri;

/// A write landed on `uri`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub uri: BookUri,
}

/// Receiving end of the bus, bound to one identifier. Dropping it
/// unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    uri: BookUri,
    receiver: Receiver<ChangeEvent>,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Identifier this subscription observes.
    pub fn uri(&self) -> BookUri {
        self.uri
    }

    /// Next pending event, without blocking.
    pub fn try_next(&self) -> Option<ChangeEvent> {
        self.receiver.try_recv().ok()
    }

    /// Take every pending event.
    pub fn drain(&self) -> Vec<ChangeEvent> {
        self.receiver.try_iter().collect()
    }

    /// Consume pending events and report whether there were any. Views call
    /// this to decide whether to re-query.
    pub fn has_changed(&self) -> bool {
        !self.drain().is_empty()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry)
                .subscribers
                .retain(|subscriber| subscriber.id != self.id);
        }
    }
}

#[derive(Debug)]
struct Subscriber {
    id: u64,
    path: Vec<String>,
    sender: Sender<ChangeEvent>,
}

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

/// Publish/subscribe registry owned by the provider. Subscriptions hold a
/// weak handle back to it so they can deregister themselves on drop, even
/// after the bus is gone.
#[derive(Debug, Default)]
pub struct ChangeBus {
    registry: Arc<Mutex<Registry>>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in `uri` and everything that overlaps it.
    pub fn subscribe(&self, uri: BookUri) -> Subscription {
        let (sender, receiver) = mpsc::channel();
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscribers.push(Subscriber {
            id,
            path: uri.path_segments(),
            sender,
        });
        Subscription {
            id,
            uri,
            receiver,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver a change for `uri` to every overlapping subscriber and return
    /// how many received it. Subscribers whose receiving end is gone without
    /// deregistering are dropped from the registry.
    pub fn publish(&self, uri: BookUri) -> usize {
        let changed = uri.path_segments();
        let event = ChangeEvent { uri };
        let mut delivered = 0;

        lock(&self.registry).subscribers.retain(|subscriber| {
            if !overlaps(&subscriber.path, &changed) {
                return true;
            }
            match subscriber.sender.send(event) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            }
        });

        trace!(uri = %uri, delivered, "published change");
        delivered
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).subscribers.len()
    }
}

/// Lock the registry, recovering it from a poisoned mutex.
fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

fn overlaps(observed: &[String], changed: &[String]) -> bool {
    changed.starts_with(observed) || observed.starts_with(changed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_observer_sees_item_and_sell_writes() {
        let bus = ChangeBus::new();
        let catalog = bus.subscribe(BookUri::Collection);

        bus.publish(BookUri::Item(4));
        bus.publish(BookUri::Sell(4));

        assert_eq!(
            catalog.drain(),
            vec![
                ChangeEvent {
                    uri: BookUri::Item(4)
                },
                ChangeEvent {
                    uri: BookUri::Sell(4)
                },
            ]
        );
    }

    #[test]
    fn item_observer_sees_bulk_writes_but_not_siblings() {
        let bus = ChangeBus::new();
        let editor = bus.subscribe(BookUri::Item(4));

        bus.publish(BookUri::Item(5));
        assert!(!editor.has_changed());

        bus.publish(BookUri::Collection);
        assert_eq!(
            editor.try_next(),
            Some(ChangeEvent {
                uri: BookUri::Collection
            })
        );
    }

    #[test]
    fn item_observer_is_not_reached_through_the_sell_path() {
        let bus = ChangeBus::new();
        let editor = bus.subscribe(BookUri::Item(4));

        assert_eq!(bus.publish(BookUri::Sell(4)), 0);
        assert!(editor.try_next().is_none());
    }

    #[test]
    fn dropping_a_subscription_deregisters_it() {
        let bus = ChangeBus::new();
        let kept = bus.subscribe(BookUri::Collection);
        drop(bus.subscribe(BookUri::Collection));
        assert_eq!(bus.subscriber_count(), 1);

        assert_eq!(bus.publish(BookUri::Collection), 1);
        assert!(kept.has_changed());
    }

    #[test]
    fn short_lived_readers_do_not_accumulate() {
        let bus = ChangeBus::new();
        for _ in 0..10_000 {
            drop(bus.subscribe(BookUri::Item(1)));
        }
        bus.publish(BookUri::Item(2));
        bus.publish(BookUri::Sell(1));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn subscription_outliving_the_bus_drops_cleanly() {
        let bus = ChangeBus::new();
        let editor = bus.subscribe(BookUri::Item(3));
        drop(bus);
        assert!(editor.try_next().is_none());
        drop(editor);
    }
}
