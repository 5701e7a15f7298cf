//! Ordered broadcast fan-out with removable registrations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Observer callback for one broadcast kind.
///
/// A returned error is contained: it is logged and the fan-out continues
/// with the remaining observers.
type Observer<T> = Arc<dyn Fn(&T) -> anyhow::Result<()> + Send + Sync>;

struct Registration<T> {
    id: u64,
    observer: Observer<T>,
}

impl<T> Clone for Registration<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            observer: Arc::clone(&self.observer),
        }
    }
}

struct Registry<T> {
    entries: Mutex<Vec<Registration<T>>>,
    next_id: AtomicU64,
}

/// Fan-out point for one broadcast kind.
///
/// Observers run synchronously in registration order. No lock is held while
/// an observer runs, so an observer may subscribe, unsubscribe, or publish
/// reentrantly without corrupting an in-progress pass.
pub struct Relay<T> {
    registry: Arc<Registry<T>>,
}

impl<T> Clone for Relay<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T: 'static> Default for Relay<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Relay<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                entries: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register an observer. It sees every publish after this call, until
    /// the returned [`Subscription`] is dropped or cancelled.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.entries.lock().unwrap().push(Registration {
            id,
            observer: Arc::new(observer),
        });

        let registry = Arc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.entries.lock().unwrap().retain(|r| r.id != id);
            }
        })
    }

    /// Number of live registrations.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.registry.entries.lock().unwrap().len()
    }

    /// Deliver `payload` to every observer registered before this call, in
    /// registration order.
    ///
    /// Observers removed mid-pass are skipped if not yet invoked; observers
    /// added mid-pass wait for the next publish. A failing observer does not
    /// stop the pass.
    pub fn publish(&self, payload: &T) {
        let snapshot: Vec<Registration<T>> = self.registry.entries.lock().unwrap().clone();
        for registration in snapshot {
            let live = self
                .registry
                .entries
                .lock()
                .unwrap()
                .iter()
                .any(|r| r.id == registration.id);
            if !live {
                continue;
            }
            if let Err(e) = (registration.observer)(payload) {
                tracing::warn!("broadcast observer failed: {e}");
            }
        }
    }
}

/// Capability to remove one registration.
///
/// Dropping it unsubscribes; unsubscribing after the relay is gone is a
/// no-op.
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    fn new(remove: impl FnOnce() + Send + 'static) -> Self {
        Self {
            remove: Some(Box::new(remove)),
        }
    }

    /// Remove the registration now.
    pub fn cancel(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }

    /// Keep the registration alive for the rest of the process.
    pub fn forever(mut self) {
        self.remove = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(
        log: Arc<Mutex<Vec<&'static str>>>,
        tag: &'static str,
    ) -> impl Fn(&u32) -> anyhow::Result<()> + use<> {
        move |_| {
            log.lock().unwrap().push(tag);
            Ok(())
        }
    }

    #[test]
    fn delivers_in_registration_order() {
        let relay = Relay::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let _first = relay.subscribe(recorder(Arc::clone(&log), "first"));
        let _second = relay.subscribe(recorder(Arc::clone(&log), "second"));
        let _third = relay.subscribe(recorder(Arc::clone(&log), "third"));

        relay.publish(&1);
        assert_eq!(*log.lock().unwrap(), ["first", "second", "third"]);

        relay.publish(&2);
        assert_eq!(log.lock().unwrap().len(), 6);
    }

    #[test]
    fn dropping_the_subscription_unsubscribes() {
        let relay = Relay::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = relay.subscribe(recorder(Arc::clone(&log), "first"));
        let _second = relay.subscribe(recorder(Arc::clone(&log), "second"));
        assert_eq!(relay.observer_count(), 2);

        drop(first);
        assert_eq!(relay.observer_count(), 1);

        relay.publish(&1);
        assert_eq!(*log.lock().unwrap(), ["second"]);
    }

    #[test]
    fn observer_removed_during_fanout_is_not_invoked() {
        let relay = Relay::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let parked: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let canceller = {
            let log = Arc::clone(&log);
            let parked = Arc::clone(&parked);
            move |_: &u32| -> anyhow::Result<()> {
                log.lock().unwrap().push("first");
                if let Some(subscription) = parked.lock().unwrap().take() {
                    subscription.cancel();
                }
                Ok(())
            }
        };

        let _first = relay.subscribe(canceller);
        let _second = relay.subscribe(recorder(Arc::clone(&log), "second"));
        let third = relay.subscribe(recorder(Arc::clone(&log), "third"));
        *parked.lock().unwrap() = Some(third);

        relay.publish(&1);
        assert_eq!(*log.lock().unwrap(), ["first", "second"]);
    }

    #[test]
    fn failing_observer_does_not_stop_the_pass() {
        let relay = Relay::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let _first = relay.subscribe(|_: &u32| Err(anyhow::anyhow!("boom")));
        let _second = relay.subscribe(recorder(Arc::clone(&log), "second"));

        relay.publish(&1);
        assert_eq!(*log.lock().unwrap(), ["second"]);
    }

    #[test]
    fn observer_added_during_fanout_waits_for_the_next_pass() {
        let relay: Relay<u32> = Relay::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let guards: Arc<Mutex<Vec<Subscription>>> = Arc::new(Mutex::new(Vec::new()));

        let joiner = {
            let relay = relay.clone();
            let log = Arc::clone(&log);
            let guards = Arc::clone(&guards);
            let joined = Mutex::new(false);
            move |_: &u32| -> anyhow::Result<()> {
                log.lock().unwrap().push("first");
                let mut joined = joined.lock().unwrap();
                if !*joined {
                    *joined = true;
                    guards
                        .lock()
                        .unwrap()
                        .push(relay.subscribe(recorder(Arc::clone(&log), "late")));
                }
                Ok(())
            }
        };
        let _first = relay.subscribe(joiner);

        relay.publish(&1);
        assert_eq!(*log.lock().unwrap(), ["first"]);

        relay.publish(&2);
        assert_eq!(*log.lock().unwrap(), ["first", "first", "late"]);
    }

    #[test]
    fn cancel_after_the_relay_is_gone_is_a_no_op() {
        let relay = Relay::new();
        let subscription = relay.subscribe(|_: &u32| Ok(()));
        drop(relay);
        subscription.cancel();
    }
}
