//! Typed event channels connecting the core to its observers.
//!
//! The UI-adjacent layers subscribe to the channels on [`EventHub`] and
//! receive callbacks in subscription order. Subscriptions are identified by
//! a token so observers can unsubscribe on teardown instead of leaking
//! callbacks into disposed views. Emission snapshots the subscriber list
//! first, so no internal lock is held while user code runs.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::library::Track;

/// Token returned by [`EventChannel::subscribe`], used to unsubscribe.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Callback<T> = std::sync::Arc<dyn Fn(&T) + Send + Sync + 'static>;

/// One ordered broadcast channel for a single event type.
pub struct EventChannel<T> {
    subscribers: Mutex<Vec<(SubscriptionId, Callback<T>)>>,
    next_id: AtomicU64,
}

impl<T> Default for EventChannel<T> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<T> EventChannel<T> {
    /// Register a callback; it is invoked for every later emission until
    /// unsubscribed.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .lock()
            .unwrap()
            .push((id, std::sync::Arc::new(callback)));
        id
    }

    /// Remove a previously registered callback. Returns whether it existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscribers.lock().unwrap();
        let before = subs.len();
        subs.retain(|(sub_id, _)| *sub_id != id);
        subs.len() != before
    }

    /// Deliver `value` to every subscriber in subscription order.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<Callback<T>> = self
            .subscribers
            .lock()
            .unwrap()
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        for callback in snapshot {
            callback(value);
        }
    }
}

/// One progress report for the currently playing track.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub position: Duration,
    pub duration: Duration,
    /// `position / duration`, clamped to `[0, 1]`.
    pub fraction: f64,
}

/// Volume plus mute flag as observed after a volume command.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeState {
    pub volume: f64,
    pub muted: bool,
}

/// All outbound event channels of the player core.
#[derive(Default)]
pub struct EventHub {
    pub track_changed: EventChannel<Track>,
    pub play_state_changed: EventChannel<bool>,
    pub progress_changed: EventChannel<Progress>,
    pub volume_state_changed: EventChannel<VolumeState>,
    /// Normalized FFT magnitudes, one frame per sampling cycle.
    pub spectrum_frame: EventChannel<Vec<f32>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::mpsc;

    #[test]
    fn emits_in_subscription_order() {
        let channel = EventChannel::<u32>::default();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = seen.clone();
            channel.subscribe(move |v| seen.lock().unwrap().push((tag, *v)));
        }

        channel.emit(&7);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![("first", 7), ("second", 7), ("third", 7)]
        );
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let channel = EventChannel::<u32>::default();
        let (tx, rx) = mpsc::channel();
        let id = channel.subscribe(move |v| tx.send(*v).unwrap());

        channel.emit(&1);
        assert_eq!(rx.recv().unwrap(), 1);

        assert!(channel.unsubscribe(id));
        assert!(!channel.unsubscribe(id));
        channel.emit(&2);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn subscribing_from_a_callback_does_not_deadlock() {
        let channel = Arc::new(EventChannel::<u32>::default());
        let inner = channel.clone();
        channel.subscribe(move |_| {
            inner.subscribe(|_| {});
        });
        channel.emit(&1);
        channel.emit(&2);
    }
}
