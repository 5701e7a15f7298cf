//! Connection health tracking.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::relay::{Relay, Subscription};

/// The client's view of transport health.
///
/// Independent of any individual request's outcome: only transport lifecycle
/// events move it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// Initial state: the transport has not reported a link yet.
    Connecting,
    /// The link is up.
    Connected,
    /// The link dropped and the transport is retrying.
    Reconnecting,
    /// The transport gave up retrying.
    Disconnected,
}

/// Tracks the current status and notifies observers of every transition.
pub struct StatusTracker {
    current: Mutex<ConnectionStatus>,
    changes: Relay<ConnectionStatus>,
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusTracker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: Mutex::new(ConnectionStatus::Connecting),
            changes: Relay::new(),
        }
    }

    /// Current status.
    #[must_use]
    pub fn current(&self) -> ConnectionStatus {
        *self.current.lock().unwrap()
    }

    /// Observe every transition; the observer receives the new value, not a
    /// delta.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&ConnectionStatus) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.changes.subscribe(observer)
    }

    /// Record a transition and notify observers.
    ///
    /// Driven exclusively by transport lifecycle events; request traffic
    /// never lands here.
    pub(crate) fn transition(&self, next: ConnectionStatus) {
        *self.current.lock().unwrap() = next;
        tracing::debug!(status = ?next, "connection status changed");
        self.changes.publish(&next);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn starts_connecting() {
        let tracker = StatusTracker::new();
        assert_eq!(tracker.current(), ConnectionStatus::Connecting);
    }

    #[test]
    fn lifecycle_transitions_notify_with_the_new_value() {
        let tracker = StatusTracker::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let _subscription = {
            let seen = Arc::clone(&seen);
            tracker.subscribe(move |status| {
                seen.lock().unwrap().push(*status);
                Ok(())
            })
        };

        tracker.transition(ConnectionStatus::Connected);
        tracker.transition(ConnectionStatus::Reconnecting);
        tracker.transition(ConnectionStatus::Disconnected);

        assert_eq!(tracker.current(), ConnectionStatus::Disconnected);
        assert_eq!(
            *seen.lock().unwrap(),
            [
                ConnectionStatus::Connected,
                ConnectionStatus::Reconnecting,
                ConnectionStatus::Disconnected,
            ]
        );
    }
}
