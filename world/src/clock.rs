//! Deterministic metronome that converts accumulated time into beats.

use std::time::Duration;

use beatgrid_core::{ActorId, BeatIndex, BeatPolicy};

/// The two ordered notifications emitted for every beat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Notification {
    /// Emitted first, before any actor acts.
    BeatStart,
    /// Emitted second; subscribed actors take their turn.
    Beat,
}

/// Party registered to receive clock notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subscriber {
    /// The hazard warning aggregator.
    Hazards,
    /// An actor driven by the beat.
    Actor(ActorId),
}

/// Beat clock with a fixed tempo and explicit subscriber lists.
///
/// The clock does not call subscribers itself. The owner feeds time through
/// [`BeatClock::accumulate`], drains beats with [`BeatClock::try_fire`] and
/// delivers each notification to a [`BeatClock::snapshot`] of the matching
/// subscriber list, so subscribers may come and go during delivery without
/// disturbing the emission in progress.
#[derive(Clone, Debug)]
pub struct BeatClock {
    interval: Option<Duration>,
    policy: BeatPolicy,
    accumulator: Duration,
    beat: BeatIndex,
    fired_since_accumulate: bool,
    beat_start_subscribers: Vec<Subscriber>,
    beat_subscribers: Vec<Subscriber>,
}

impl BeatClock {
    /// Creates a clock running at `bpm` beats per minute.
    ///
    /// A tempo that is not a positive finite number yields a clock that
    /// accumulates time but never fires.
    #[must_use]
    pub fn new(bpm: f64, policy: BeatPolicy) -> Self {
        Self {
            interval: interval_for(bpm),
            policy,
            accumulator: Duration::ZERO,
            beat: BeatIndex::ZERO,
            fired_since_accumulate: false,
            beat_start_subscribers: Vec::new(),
            beat_subscribers: Vec::new(),
        }
    }

    /// Duration of a single beat, if the tempo is usable.
    #[must_use]
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Policy deciding how many beats a single tick may fire.
    #[must_use]
    pub fn policy(&self) -> BeatPolicy {
        self.policy
    }

    /// Index of the most recently fired beat.
    #[must_use]
    pub fn beat_index(&self) -> BeatIndex {
        self.beat
    }

    /// Time accumulated toward the next beat.
    #[must_use]
    pub fn accumulated(&self) -> Duration {
        self.accumulator
    }

    /// Adds `dt` to the accumulator and opens a new firing window.
    pub fn accumulate(&mut self, dt: Duration) {
        self.accumulator = self.accumulator.saturating_add(dt);
        self.fired_since_accumulate = false;
    }

    /// Consumes one interval from the accumulator and advances the beat index.
    ///
    /// Returns the beat that was reached, or `None` when not enough time has
    /// accumulated or the policy forbids another beat in this window.
    pub fn try_fire(&mut self) -> Option<BeatIndex> {
        let interval = self.interval?;
        if self.accumulator < interval {
            return None;
        }
        if self.policy == BeatPolicy::OnePerAdvance && self.fired_since_accumulate {
            return None;
        }

        self.accumulator -= interval;
        self.beat = self.beat.next();
        self.fired_since_accumulate = true;
        Some(self.beat)
    }

    /// Accumulates `dt` and fires every beat the policy allows.
    pub fn advance(&mut self, dt: Duration) -> Vec<BeatIndex> {
        self.accumulate(dt);
        std::iter::from_fn(|| self.try_fire()).collect()
    }

    /// Registers `subscriber` for `notification`; returns `false` if already present.
    pub fn subscribe(&mut self, notification: Notification, subscriber: Subscriber) -> bool {
        let list = self.list_mut(notification);
        if list.contains(&subscriber) {
            return false;
        }
        list.push(subscriber);
        true
    }

    /// Removes `subscriber` from `notification`; returns `false` if it was absent.
    pub fn unsubscribe(&mut self, notification: Notification, subscriber: Subscriber) -> bool {
        let list = self.list_mut(notification);
        let before = list.len();
        list.retain(|entry| *entry != subscriber);
        list.len() != before
    }

    /// Removes `subscriber` from every notification.
    pub fn unsubscribe_all(&mut self, subscriber: Subscriber) {
        let _ = self.unsubscribe(Notification::BeatStart, subscriber);
        let _ = self.unsubscribe(Notification::Beat, subscriber);
    }

    /// Drops every actor subscription, keeping non-actor subscribers.
    pub fn unsubscribe_actors(&mut self) {
        self.beat_start_subscribers
            .retain(|entry| !matches!(entry, Subscriber::Actor(_)));
        self.beat_subscribers
            .retain(|entry| !matches!(entry, Subscriber::Actor(_)));
    }

    /// Subscribers of `notification` in subscription order.
    #[must_use]
    pub fn subscribers(&self, notification: Notification) -> &[Subscriber] {
        match notification {
            Notification::BeatStart => &self.beat_start_subscribers,
            Notification::Beat => &self.beat_subscribers,
        }
    }

    /// Copy of the subscriber list taken at the start of an emission.
    #[must_use]
    pub fn snapshot(&self, notification: Notification) -> Vec<Subscriber> {
        self.subscribers(notification).to_vec()
    }

    /// Reports whether `subscriber` receives `notification`.
    #[must_use]
    pub fn is_subscribed(&self, notification: Notification, subscriber: Subscriber) -> bool {
        self.subscribers(notification).contains(&subscriber)
    }

    fn list_mut(&mut self, notification: Notification) -> &mut Vec<Subscriber> {
        match notification {
            Notification::BeatStart => &mut self.beat_start_subscribers,
            Notification::Beat => &mut self.beat_subscribers,
        }
    }
}

fn interval_for(bpm: f64) -> Option<Duration> {
    if !bpm.is_finite() || bpm <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(60.0 / bpm)
        .ok()
        .filter(|interval| !interval.is_zero())
}
