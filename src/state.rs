//! Per-channel and per-position state shared between the three workers of
//! a position.
//!
//! spec.md §5 "Shared state within a position": every cross-thread counter
//! is single-producer/single-consumer and monotonically non-decreasing.
//! We use atomics with acquire/release ordering rather than locks on the
//! hot path, per spec.md §9 Design Notes ("No locks on the data path"),
//! generalized to the handful of SPSC counters this spec needs.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};

use crate::container::intermediate::IntermediateWriter;

/// Per-channel state (spec.md §3 "Channel state").
///
/// All fields except `c_islow5` are touched only by ACQ; `c_islow5` is
/// written by ACQ and read by CONS (single-writer, single-reader). `c_s`
/// is the CONS-owned consumption counter for this channel.
pub struct ChannelState {
    pub read_number: Cell<i32>,
    pub len_raw_signal: Cell<u64>,
    pub raw_signal: Cell<Vec<i16>>,
    pub aq: Cell<u64>,
    pub chunk_number: Cell<u32>,

    /// Completed intermediate files on this channel, published to CONS.
    pub c_islow5: AtomicU32,
    /// Intermediate files this channel that CONS has consumed.
    pub c_s: AtomicU32,

    /// Open intermediate file handle while a multi-chunk read is in flight.
    /// Owned exclusively by ACQ; never touched from another thread.
    pub open_intermediate: Cell<Option<IntermediateWriter>>,
}

impl ChannelState {
    pub fn new(cz: usize) -> Self {
        ChannelState {
            read_number: Cell::new(0),
            len_raw_signal: Cell::new(0),
            raw_signal: Cell::new(vec![0i16; cz]),
            aq: Cell::new(0),
            chunk_number: Cell::new(0),
            c_islow5: AtomicU32::new(0),
            c_s: AtomicU32::new(0),
            open_intermediate: Cell::new(None),
        }
    }
}

// `Cell` is not `Sync`, but every `Cell` field here is touched from exactly
// one thread (ACQ) for the lifetime of the channel; cross-thread visibility
// of the non-`Cell` fields goes through the atomics below with explicit
// acquire/release fences, which is what actually needs to be `Sync`.
unsafe impl Sync for ChannelState {}

/// Per-position state (spec.md §3 "Position state").
pub struct PositionState {
    pub channels: Vec<ChannelState>,

    /// Reads written directly to the "direct" container so far.
    pub c_direct: AtomicI64,
    /// Reads written to the "streamed" container so far.
    pub c_s: AtomicI64,
    /// Reads consumed by CONS-R from "direct".
    pub c_bd: AtomicI64,
    /// Reads consumed by CONS-R from "streamed".
    pub c_bs: AtomicI64,

    /// Sum of sample counts of all completed reads.
    pub total_samples: AtomicI64,

    pub aq_done: AtomicBool,
    pub s_done: AtomicBool,
}

impl PositionState {
    pub fn new(nchan: usize, cz: usize) -> Self {
        PositionState {
            channels: (0..nchan).map(|_| ChannelState::new(cz)).collect(),
            c_direct: AtomicI64::new(0),
            c_s: AtomicI64::new(0),
            c_bd: AtomicI64::new(0),
            c_bs: AtomicI64::new(0),
            total_samples: AtomicI64::new(0),
            aq_done: AtomicBool::new(false),
            s_done: AtomicBool::new(false),
        }
    }

    /// Publish a monotonically non-decreasing counter with release
    /// ordering, after the corresponding container flush. This is the
    /// release half of the flush-then-publish barrier spec.md §5 mandates.
    pub fn publish(counter: &AtomicI64, value: i64) {
        counter.store(value, Ordering::Release);
    }

    /// Observe a published counter with acquire ordering.
    pub fn observe(counter: &AtomicI64) -> i64 {
        counter.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let pos = PositionState::new(4, 16);
        assert_eq!(PositionState::observe(&pos.c_direct), 0);
        assert_eq!(PositionState::observe(&pos.c_s), 0);
        assert!(!pos.aq_done.load(Ordering::Acquire));
    }

    #[test]
    fn channel_count_matches_request() {
        let pos = PositionState::new(7, 16);
        assert_eq!(pos.channels.len(), 7);
    }

    #[test]
    fn publish_and_observe_round_trip() {
        let pos = PositionState::new(1, 16);
        PositionState::publish(&pos.c_direct, 42);
        assert_eq!(PositionState::observe(&pos.c_direct), 42);
    }
}
