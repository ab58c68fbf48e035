//! The acquisition worker (ACQ), spec.md §4.1.
//!
//! One ACQ thread per position. Ticks `derived.iterations` times; each
//! tick advances every channel's per-channel state machine, flushes the
//! "direct" container, paces itself to `ct` wall-clock seconds, and
//! publishes `pos.c_direct`. Tick loop: record tick start, do work, check
//! elapsed, sleep the remainder, loop.

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};

use crate::constants::{ASIC_ID, RUN_ID};
use crate::container::format::{SignalRecord, SignalWriter};
use crate::container::intermediate::{self, IntermediateWriter};
use crate::error::{Result, SlowionError};
use crate::options::{Config, Derived};
use crate::rng::{noisy_sample, LengthSource, UniformSource};
use crate::state::PositionState;

fn intermediate_path(pos_dir: &Path, chan: usize, k: u32) -> PathBuf {
    pos_dir.join(format!("chan{chan}_{k}.iblow5"))
}

/// Run the acquisition worker for one position to completion.
pub fn run(pos: i64, pos_dir: &Path, state: &PositionState, config: &Config) -> Result<()> {
    let derived: Derived = config.derived;
    let opt = &config.opt;

    let mut uniform = UniformSource::new(opt.seed);
    let mut lengths = LengthSource::new(opt.seed + 1, derived.mean_slen);

    let direct_path = opt.dir.join(format!("pos{pos}_0.blow5"));
    let mut direct = SignalWriter::create(&direct_path, RUN_ID, ASIC_ID)?;

    let mut direct_written: i64 = 0;

    info!("position {pos}: ACQ starting, {} iterations", derived.iterations);

    for tick in 0..derived.iterations {
        let tick_start = Instant::now();

        for (chan, ch) in state.channels.iter().enumerate() {
            if ch.len_raw_signal.get() == 0 {
                let len = lengths.next();
                ch.len_raw_signal.set(len);
                ch.aq.set(0);
                ch.chunk_number.set(0);
            }

            let len_raw_signal = ch.len_raw_signal.get();
            let aq = ch.aq.get();

            if aq < len_raw_signal {
                let remaining = len_raw_signal - aq;
                let j = remaining.min(derived.cz as u64);

                let mut buf = ch.raw_signal.take();
                buf.clear();
                for _ in 0..j {
                    buf.push(noisy_sample(uniform.next()));
                }

                let chunk_number = ch.chunk_number.get() + 1;
                ch.chunk_number.set(chunk_number);

                let read_number = ch.read_number.get();
                let complete = aq + j == len_raw_signal;

                if chunk_number == 1 && complete {
                    let record =
                        SignalRecord::new(pos, chan, read_number, opt.freq as f64, buf.clone());
                    direct.append(&record)?;
                    direct_written += 1;
                } else if chunk_number == 1 {
                    let k = ch.c_islow5.load(Ordering::Relaxed);
                    let path = intermediate_path(pos_dir, chan, k);
                    let mut writer = IntermediateWriter::create(&path, read_number)?;
                    writer.append_chunk(&buf)?;
                    ch.open_intermediate.set(Some(writer));
                } else {
                    let mut writer = ch
                        .open_intermediate
                        .take()
                        .expect("chunk_number > 1 implies an open intermediate writer");
                    writer.append_chunk(&buf)?;
                    ch.open_intermediate.set(Some(writer));
                }

                ch.raw_signal.set(buf);
                ch.aq.set(aq + j);
            }

            if ch.aq.get() == ch.len_raw_signal.get() {
                if ch.chunk_number.get() > 1 {
                    let writer = ch
                        .open_intermediate
                        .take()
                        .expect("multi-chunk read must have an open intermediate writer");
                    writer.close()?;
                    ch.c_islow5.fetch_add(1, Ordering::Release);
                }
                state
                    .total_samples
                    .fetch_add(ch.len_raw_signal.get() as i64, Ordering::Relaxed);
                ch.read_number.set(ch.read_number.get() + 1);
                ch.len_raw_signal.set(0);
            }
        }

        direct.flush()?;

        let elapsed = tick_start.elapsed();
        let ct = Duration::from_secs(derived.ct as u64);
        if elapsed > ct {
            warn!(
                "position {pos}: ACQ tick {tick} lagged by {:?}",
                elapsed - ct
            );
        } else {
            std::thread::sleep(ct - elapsed);
        }

        PositionState::publish(&state.c_direct, direct_written);
        trace!("position {pos}: ACQ tick {tick} done, c_direct={direct_written}");
    }

    finalize(pos, state, &mut direct, direct_written)
}

/// Drain any channels left mid-read: delete their partial intermediate
/// files (never published to CONS), close the direct container, and
/// assert conservation of reads before announcing completion.
fn finalize(
    pos: i64,
    state: &PositionState,
    direct: &mut SignalWriter,
    direct_written: i64,
) -> Result<()> {
    let mut intermediate_published: i64 = 0;
    let mut total_reads: i64 = 0;

    for ch in &state.channels {
        total_reads += ch.read_number.get() as i64;
        intermediate_published += ch.c_islow5.load(Ordering::Acquire) as i64;

        if ch.aq.get() > 0 && ch.aq.get() < ch.len_raw_signal.get() {
            if let Some(writer) = ch.open_intermediate.take() {
                match writer.close() {
                    Ok(path) => {
                        if let Err(e) = intermediate::remove(&path) {
                            warn!(
                                "position {pos}: failed to remove partial intermediate {}: {e}",
                                path.display()
                            );
                        }
                    }
                    Err(e) => warn!("position {pos}: failed to close partial intermediate: {e}"),
                }
            }
        }
    }

    if direct_written + intermediate_published != total_reads {
        return Err(SlowionError::Invariant(format!(
            "position {pos}: direct_written ({direct_written}) + intermediate_published \
             ({intermediate_published}) != total reads ({total_reads})"
        )));
    }

    direct.flush()?;
    debug!("position {pos}: ACQ done, direct_written={direct_written}");
    state.aq_done.store(true, Ordering::Release);
    Ok(())
}
