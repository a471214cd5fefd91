//! Phase barriers: the publish/consume handshake between one owner color
//! and the colors that mirror its shared cells.
//!
//! Each phase `p` of a barrier has two gates:
//!
//! - **published(p)**: the owner has arrived as many times as its quota
//!   for `p` (one from the read prolog plus one per registered write
//!   launch). Consumers wait on this before copying ghosts.
//! - **consumed(p)**: every consumer has arrived for `p`, i.e. finished
//!   copying. The owner waits on `consumed(p - 1)` before overwriting its
//!   shared cells in phase `p`.
//!
//! Phases whose two gates are both open are retired and their counters
//! dropped, so memory stays bounded by the number of phases in flight.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use halo_core::{Color, FieldId, SyncError};
use tracing::{trace, warn};

/// Index of a barrier in a [`BarrierRegistry`](crate::BarrierRegistry).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BarrierId(pub u32);

impl fmt::Display for BarrierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which side of the handshake a handle acts for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// The color that owns the shared cells.
    Owner,
    /// A color that mirrors them as ghosts.
    Consumer,
}

/// A position in a barrier's phase sequence, held by one participant.
///
/// Handles are plain values; advancing one never affects another
/// participant's view of the barrier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BarrierHandle {
    /// The barrier.
    pub barrier: BarrierId,
    /// Phase this handle arrives on and waits for.
    pub phase: u64,
    /// Side of the handshake.
    pub role: Role,
}

impl BarrierHandle {
    /// Owner handle at phase 0.
    pub fn owner(barrier: BarrierId) -> Self {
        Self {
            barrier,
            phase: 0,
            role: Role::Owner,
        }
    }

    /// Consumer handle at phase 0.
    pub fn consumer(barrier: BarrierId) -> Self {
        Self {
            barrier,
            phase: 0,
            role: Role::Consumer,
        }
    }

    /// The handle for the next phase.
    #[must_use]
    pub fn advance(self) -> Self {
        trace!(barrier = %self.barrier, phase = self.phase + 1, role = ?self.role, "advance");
        Self {
            phase: self.phase + 1,
            ..self
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct PhaseCounts {
    owner_arrivals: u64,
    extra_quota: u64,
    consumer_arrivals: u64,
}

#[derive(Debug, Default)]
struct BarrierState {
    phases: BTreeMap<u64, PhaseCounts>,
    /// Every phase below this one is published and consumed.
    retired: u64,
}

impl BarrierState {
    fn counts(&self, phase: u64) -> PhaseCounts {
        self.phases.get(&phase).copied().unwrap_or_default()
    }

    fn published(&self, phase: u64) -> bool {
        if phase < self.retired {
            return true;
        }
        let c = self.counts(phase);
        c.owner_arrivals >= 1 + c.extra_quota
    }

    fn consumed(&self, phase: u64, consumers: u32) -> bool {
        if phase < self.retired || consumers == 0 {
            return true;
        }
        self.counts(phase).consumer_arrivals >= u64::from(consumers)
    }

    fn retire(&mut self, consumers: u32) {
        while self.published(self.retired) && self.consumed(self.retired, consumers) {
            self.phases.remove(&self.retired);
            self.retired += 1;
        }
    }
}

/// A phase barrier scoped to one owner color and one field.
pub struct PhaseBarrier {
    id: BarrierId,
    owner: Color,
    field: FieldId,
    consumers: u32,
    state: Mutex<BarrierState>,
    changed: Condvar,
}

// Compile-time assertion: barriers are shared by every color's thread.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<PhaseBarrier>();
};

impl fmt::Debug for PhaseBarrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseBarrier")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("field", &self.field)
            .field("consumers", &self.consumers)
            .finish_non_exhaustive()
    }
}

impl PhaseBarrier {
    /// Create a barrier for `owner`'s copy of `field`, read by
    /// `consumers` distinct colors.
    pub fn new(id: BarrierId, owner: Color, field: FieldId, consumers: u32) -> Self {
        Self {
            id,
            owner,
            field,
            consumers,
            state: Mutex::new(BarrierState::default()),
            changed: Condvar::new(),
        }
    }

    /// Registry index.
    pub fn id(&self) -> BarrierId {
        self.id
    }

    /// The owning color.
    pub fn owner(&self) -> Color {
        self.owner
    }

    /// The synchronized field.
    pub fn field(&self) -> FieldId {
        self.field
    }

    /// Number of consumer arrivals that consume a phase.
    pub fn consumers(&self) -> u32 {
        self.consumers
    }

    fn lock(&self) -> MutexGuard<'_, BarrierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `count` arrivals by `role` on `phase`.
    pub fn arrive(&self, role: Role, phase: u64, count: u64) {
        let mut state = self.lock();
        if phase < state.retired {
            warn!(barrier = %self.id, phase, ?role, "arrival on a retired phase ignored");
            return;
        }
        let counts = state.phases.entry(phase).or_default();
        match role {
            Role::Owner => counts.owner_arrivals += count,
            Role::Consumer => counts.consumer_arrivals += count,
        }
        trace!(
            barrier = %self.id,
            owner = %self.owner,
            field = %self.field,
            phase,
            ?role,
            count,
            "arrive"
        );
        state.retire(self.consumers);
        drop(state);
        self.changed.notify_all();
    }

    /// Raise the owner quota of `phase` by `delta`.
    ///
    /// Called when a write launch registers this barrier as an arrival
    /// barrier, so the phase is not published until that write lands.
    pub fn alter_arrival_count(&self, phase: u64, delta: u64) {
        let mut state = self.lock();
        if phase < state.retired {
            warn!(barrier = %self.id, phase, "quota change on a retired phase ignored");
            return;
        }
        state.phases.entry(phase).or_default().extra_quota += delta;
        trace!(barrier = %self.id, phase, delta, "alter arrival count");
    }

    /// Whether the owner has published `phase`.
    pub fn is_published(&self, phase: u64) -> bool {
        self.lock().published(phase)
    }

    /// Whether every consumer has arrived on `phase`.
    pub fn is_consumed(&self, phase: u64) -> bool {
        self.lock().consumed(phase, self.consumers)
    }

    /// Block until the gate for (`role`, `phase`) opens.
    ///
    /// Consumers wait for `published(phase)`; owners wait for
    /// `consumed(phase - 1)`, and never block on phase 0. With a
    /// `timeout`, a wait that outlives it fails with
    /// [`SyncError::SynchronizationDeadlock`].
    pub fn wait(&self, role: Role, phase: u64, timeout: Option<Duration>) -> Result<(), SyncError> {
        let consumers = self.consumers;
        let open = |s: &BarrierState| match role {
            Role::Consumer => s.published(phase),
            Role::Owner => phase == 0 || s.consumed(phase - 1, consumers),
        };

        let started = Instant::now();
        let mut state = self.lock();
        while !open(&*state) {
            match timeout {
                None => {
                    state = self
                        .changed
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                Some(limit) => {
                    let waited = started.elapsed();
                    if waited >= limit {
                        warn!(
                            barrier = %self.id,
                            owner = %self.owner,
                            field = %self.field,
                            phase,
                            ?role,
                            ?waited,
                            "barrier wait timed out"
                        );
                        return Err(SyncError::SynchronizationDeadlock {
                            barrier: self.id.0,
                            phase,
                            waited,
                        });
                    }
                    let (next, _) = self
                        .changed
                        .wait_timeout(state, limit - waited)
                        .unwrap_or_else(PoisonError::into_inner);
                    state = next;
                }
            }
        }
        trace!(barrier = %self.id, phase, ?role, "wait satisfied");
        Ok(())
    }
}
