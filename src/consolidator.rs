//! The consolidator worker (CONS), spec.md §4.2.
//!
//! One CONS thread per position. Sleeps `ct + 1` seconds to let ACQ get
//! ahead, then repeatedly drains newly published intermediate files per
//! channel into the "streamed" container, paces itself to `ct`, and runs
//! two extra ticks after observing `aq_done` before tearing down.

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};

use crate::constants::{ASIC_ID, RUN_ID, TERMINATION_LATCH_TICKS};
use crate::container::format::{SignalRecord, SignalWriter};
use crate::container::intermediate;
use crate::error::Result;
use crate::options::Config;
use crate::state::PositionState;

fn intermediate_path(pos_dir: &Path, chan: usize, k: u32) -> PathBuf {
    pos_dir.join(format!("chan{chan}_{k}.iblow5"))
}

/// Run the consolidator worker for one position to completion.
pub fn run(pos: i64, pos_dir: &Path, state: &PositionState, config: &Config) -> Result<()> {
    let ct = Duration::from_secs(config.derived.ct as u64);
    let freq = config.opt.freq as f64;

    info!("position {pos}: CONS starting");
    std::thread::sleep(ct + Duration::from_secs(1));

    let streamed_path = config.opt.dir.join(format!("pos{pos}_1.blow5"));
    let mut streamed = SignalWriter::create(&streamed_path, RUN_ID, ASIC_ID)?;
    let mut streamed_written: i64 = 0;

    let mut latch_remaining: Option<u32> = None;

    loop {
        let tick_start = Instant::now();

        for (chan, ch) in state.channels.iter().enumerate() {
            let aq_n = ch.c_islow5.load(Ordering::Acquire);
            let s_n = ch.c_s.load(Ordering::Relaxed);

            for k in s_n..aq_n {
                let path = intermediate_path(pos_dir, chan, k);
                let (read_number, samples) = intermediate::decode(&path)?;
                let record = SignalRecord::new(pos, chan, read_number, freq, samples);
                streamed.append(&record)?;
                streamed_written += 1;

                if let Err(e) = intermediate::remove(&path) {
                    warn!(
                        "position {pos}: failed to remove consumed intermediate {}: {e}",
                        path.display()
                    );
                }
            }

            if aq_n > s_n {
                ch.c_s.store(aq_n, Ordering::Relaxed);
            }
        }

        streamed.flush()?;
        PositionState::publish(&state.c_s, streamed_written);

        let elapsed = tick_start.elapsed();
        if elapsed > ct {
            warn!("position {pos}: CONS tick lagged by {:?}", elapsed - ct);
        } else {
            std::thread::sleep(ct - elapsed);
        }

        trace!("position {pos}: CONS tick done, c_s={streamed_written}");

        match latch_remaining {
            Some(0) => break,
            Some(n) => latch_remaining = Some(n - 1),
            None if state.aq_done.load(Ordering::Acquire) => {
                latch_remaining = Some(TERMINATION_LATCH_TICKS - 1)
            }
            None => {}
        }
    }

    streamed.flush()?;
    streamed.close()?;

    if let Err(e) = std::fs::remove_dir(pos_dir) {
        warn!(
            "position {pos}: could not remove intermediate directory {} (best effort): {e}",
            pos_dir.display()
        );
    }

    debug!("position {pos}: CONS done, streamed_written={streamed_written}");
    state.s_done.store(true, Ordering::Release);
    Ok(())
}
