//! The consumer worker (CONS-R, the "pseudo-basecaller"), spec.md §4.3.
//!
//! One CONS-R thread per position. Sleeps `2*ct + 1` seconds, then opens
//! both final containers for sequential read and drains newly published
//! records from each as `(c_direct, c_bd)` and `(c_s, c_bs)` advance,
//! running two extra ticks after observing both `aq_done` and `s_done`
//! before a final end-of-file check and the global sample-count
//! cross-check.

use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};

use crate::constants::TERMINATION_LATCH_TICKS;
use crate::container::format::SignalReader;
use crate::error::{Result, SlowionError};
use crate::options::Config;
use crate::state::PositionState;

/// Run the consumer worker for one position to completion.
pub fn run(pos: i64, state: &PositionState, config: &Config) -> Result<()> {
    let ct = Duration::from_secs(config.derived.ct as u64);

    info!("position {pos}: CONS-R starting");
    std::thread::sleep(ct * 2 + Duration::from_secs(1));

    let direct_path = config.opt.dir.join(format!("pos{pos}_0.blow5"));
    let streamed_path = config.opt.dir.join(format!("pos{pos}_1.blow5"));
    let mut direct = SignalReader::open(&direct_path)?;
    let mut streamed = SignalReader::open(&streamed_path)?;

    let mut samples: i64 = 0;
    let mut latch_remaining: Option<u32> = None;

    loop {
        let tick_start = Instant::now();

        samples += drain(&mut direct, &state.c_direct, &state.c_bd, &direct_path)?;
        samples += drain(&mut streamed, &state.c_s, &state.c_bs, &streamed_path)?;

        let elapsed = tick_start.elapsed();
        if elapsed > ct {
            warn!("position {pos}: CONS-R tick lagged by {:?}", elapsed - ct);
        } else {
            std::thread::sleep(ct - elapsed);
        }

        trace!("position {pos}: CONS-R tick done, samples={samples}");

        let both_done =
            state.aq_done.load(Ordering::Acquire) && state.s_done.load(Ordering::Acquire);

        match latch_remaining {
            Some(0) => break,
            Some(n) => latch_remaining = Some(n - 1),
            None if both_done => latch_remaining = Some(TERMINATION_LATCH_TICKS - 1),
            None => {}
        }
    }

    if direct.next_record().is_some() {
        return Err(SlowionError::Invariant(format!(
            "position {pos}: direct container had unread records after drain"
        )));
    }
    if streamed.next_record().is_some() {
        return Err(SlowionError::Invariant(format!(
            "position {pos}: streamed container had unread records after drain"
        )));
    }

    let expected = state.total_samples.load(Ordering::Acquire);
    if samples != expected {
        return Err(SlowionError::Invariant(format!(
            "position {pos}: consumed sample count ({samples}) != total_samples ({expected})"
        )));
    }

    debug!("position {pos}: CONS-R done, samples={samples}");
    Ok(())
}

/// Read `s_n - b_n` new records from `reader` and return the sum of their
/// sample counts, advancing `b_n` to `s_n`.
fn drain(
    reader: &mut SignalReader,
    published: &std::sync::atomic::AtomicI64,
    consumed: &std::sync::atomic::AtomicI64,
    path: &Path,
) -> Result<i64> {
    let s_n = PositionState::observe(published);
    let b_n = consumed.load(Ordering::Relaxed);

    let mut samples = 0i64;
    for _ in b_n..s_n {
        match reader.next_record() {
            Some(Ok(record)) => samples += record.raw_signal.len() as i64,
            Some(Err(e)) => return Err(e),
            None => {
                return Err(SlowionError::Invariant(format!(
                    "{}: expected a record but hit end-of-file",
                    path.display()
                )))
            }
        }
    }
    consumed.store(s_n, Ordering::Relaxed);
    Ok(samples)
}
