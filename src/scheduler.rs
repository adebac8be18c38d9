//! Per-tick evaluation of every registered birthday.

use std::collections::BTreeMap;
use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, TimeDelta};
use tokio::time::MissedTickBehavior;

use crate::registration::BirthdayStore;
use crate::sensor::{SensorState, publish};

/// True when `current` is unavailable and the previous reading, if any,
/// was not.
fn became_unavailable(previous: Option<&SensorState>, current: &SensorState) -> bool {
    !current.is_available() && previous.is_none_or(SensorState::is_available)
}

/// Time source boundary for local wall-clock instants.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Latest published state per entity id.
#[derive(Debug, Clone, Default)]
pub struct StateBoard {
    states: BTreeMap<String, SensorState>,
}

impl StateBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, entity_id: &str) -> Option<&SensorState> {
        self.states.get(entity_id)
    }

    pub fn insert(&mut self, state: SensorState) {
        self.states.insert(state.entity_id.clone(), state);
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SensorState> {
        self.states.values()
    }

    fn retain_ids(&mut self, ids: &[String]) {
        self.states.retain(|id, _| ids.contains(id));
    }
}

pub struct Scheduler<S, C> {
    store: S,
    clock: C,
    period: Duration,
    board: StateBoard,
}

impl<S: BirthdayStore, C: Clock> Scheduler<S, C> {
    pub fn new(store: S, clock: C, period: Duration) -> Self {
        Self {
            store,
            clock,
            period,
            board: StateBoard::new(),
        }
    }

    pub fn board(&self) -> &StateBoard {
        &self.board
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Evaluates every registration once at the clock's current instant and
    /// returns the number of sensors published. Sensors of removed
    /// registrations are dropped from the board.
    pub fn tick(&mut self) -> usize {
        let now = self.clock.now();
        let registrations = self.store.list();

        let mut published = Vec::with_capacity(registrations.len());
        for registration in &registrations {
            let state = publish(registration, now);
            tracing::trace!(entity = %state.entity_id, state = ?state.state, "published");
            if became_unavailable(self.board.get(&state.entity_id), &state) {
                tracing::warn!("{} became unavailable", state.friendly_name);
            }
            published.push(state.entity_id.clone());
            self.board.insert(state);
        }
        self.board.retain_ids(&published);

        published.len()
    }

    /// Ticks every period until `shutdown` resolves or `on_tick` breaks.
    /// The first tick happens immediately; missed ticks are skipped.
    pub async fn run_until<F, T>(&mut self, shutdown: F, mut on_tick: T) -> u64
    where
        F: Future<Output = ()>,
        T: FnMut(&StateBoard) -> ControlFlow<()>,
    {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        tracing::info!(
            "Updating {} birthday sensors every {:?}",
            self.store.list().len(),
            self.period
        );

        let mut ticks = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested after {} ticks", ticks);
                    break;
                }
                _ = interval.tick() => {
                    self.tick();
                    ticks += 1;
                    if on_tick(&self.board).is_break() {
                        break;
                    }
                }
            }
        }

        ticks
    }
}
