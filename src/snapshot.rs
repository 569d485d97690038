//! Point-in-time reads of the runtime counters.

use std::time::Duration;

/// Number of slots in a [`PauseRing`].
pub const PAUSE_RING_CAPACITY: usize = 256;

/// Fixed-capacity history of recent pause durations in nanoseconds.
///
/// Slot `n % 256` holds the pause of cycle `n`, counting from zero. Older pauses are overwritten
/// once more than [`PAUSE_RING_CAPACITY`] cycles completed.
#[derive(Clone, PartialEq, Eq)]
pub struct PauseRing {
    slots: [u64; PAUSE_RING_CAPACITY],
    cycles: u32,
}

impl PauseRing {
    /// Creates an empty ring.
    pub const fn new() -> Self {
        Self {
            slots: [0; PAUSE_RING_CAPACITY],
            cycles: 0,
        }
    }

    /// Builds a ring from raw slots and a completed cycle count.
    pub const fn from_parts(slots: [u64; PAUSE_RING_CAPACITY], cycles: u32) -> Self {
        Self { slots, cycles }
    }

    /// Stores the pause of the next cycle.
    pub fn push(&mut self, pause: Duration) {
        let nanos = u64::try_from(pause.as_nanos()).unwrap_or(u64::MAX);
        self.slots[self.cycles as usize % PAUSE_RING_CAPACITY] = nanos;
        self.cycles = self.cycles.wrapping_add(1);
    }

    /// Number of completed cycles.
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    /// Raw slots, indexed by cycle number modulo the capacity.
    pub fn slots(&self) -> &[u64; PAUSE_RING_CAPACITY] {
        &self.slots
    }

    /// Pause of the most recently completed cycle, in nanoseconds.
    ///
    /// Reads slot `(cycles + capacity - 1) % capacity`. Before the first cycle this is the
    /// untouched last slot, i.e. zero.
    pub fn most_recent(&self) -> u64 {
        let index = (self.cycles as usize % PAUSE_RING_CAPACITY + PAUSE_RING_CAPACITY - 1)
            % PAUSE_RING_CAPACITY;
        self.slots[index]
    }
}

impl Default for PauseRing {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PauseRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PauseRing")
            .field("cycles", &self.cycles)
            .field("most_recent", &self.most_recent())
            .finish()
    }
}

/// Memory and scheduler counters read in a single tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuntimeSnapshot {
    /// Tasks currently alive on the scheduler.
    pub tasks: u64,
    /// Live bytes allocated on the heap.
    pub heap_alloc: u64,
    /// Bytes obtained from the operating system.
    pub heap_sys: u64,
    /// Recent pause history.
    pub pauses: PauseRing,
}

impl RuntimeSnapshot {
    /// Number of completed pause cycles.
    pub fn num_gc(&self) -> u32 {
        self.pauses.cycles()
    }

    /// Most recent pause in nanoseconds.
    pub fn last_pause_ns(&self) -> u64 {
        self.pauses.most_recent()
    }
}
