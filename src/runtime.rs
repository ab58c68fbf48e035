//! Process orchestration: resource limits, output directory layout, and
//! spawning/joining the `3 * npos` worker threads (spec.md §5).
//!
//! Keeps `main.rs` a thin CLI/bootstrap dispatcher: this module owns
//! everything after options are validated.

use std::fs;
use std::sync::Arc;
use std::thread::JoinHandle;

use log::{error, info};

use crate::acquisition;
use crate::consolidator;
use crate::consumer;
use crate::error::{Result, SlowionError};
use crate::options::Config;
use crate::state::PositionState;

/// Raise the open-file soft limit to the hard limit.
///
/// Long reads keep one intermediate file open per active long-read
/// channel, plus two final containers per position; for large fleets this
/// exceeds the default `RLIMIT_NOFILE` soft limit (spec.md §5 "Resource
/// limits").
fn raise_open_file_limit() -> Result<()> {
    unsafe {
        let mut limit = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        if libc::getrlimit(libc::RLIMIT_NOFILE, &mut limit) != 0 {
            return Err(SlowionError::io(
                "RLIMIT_NOFILE",
                std::io::Error::last_os_error(),
            ));
        }
        let previous = limit.rlim_cur;
        limit.rlim_cur = limit.rlim_max;
        if libc::setrlimit(libc::RLIMIT_NOFILE, &limit) != 0 {
            return Err(SlowionError::io(
                "RLIMIT_NOFILE".to_string(),
                std::io::Error::last_os_error(),
            ));
        }
        info!(
            "raised RLIMIT_NOFILE soft limit {previous} -> {}",
            limit.rlim_cur
        );
    }
    Ok(())
}

/// Create the top-level output directory and one transient `pos<p>/`
/// subdirectory per position. Fails fatally if the top-level directory
/// already exists (checked earlier in `Options::from_cli`, re-checked
/// here against a race) or if any `mkdir` fails.
fn create_directories(config: &Config) -> Result<Vec<std::path::PathBuf>> {
    fs::create_dir_all(&config.opt.dir).map_err(|e| SlowionError::io(config.opt.dir.clone(), e))?;

    let mut pos_dirs = Vec::with_capacity(config.opt.npos as usize);
    for p in 0..config.opt.npos {
        let pos_dir = config.opt.dir.join(format!("pos{p}"));
        fs::create_dir(&pos_dir).map_err(|e| SlowionError::io(pos_dir.clone(), e))?;
        pos_dirs.push(pos_dir);
    }
    Ok(pos_dirs)
}

/// Run the full fleet simulation to completion. Spawns ACQ, then CONS,
/// then CONS-R threads for every position (in that order, matching
/// `original_source/src/main.c`), and joins CONS-R first, then CONS, then
/// ACQ, so a fatal error in any worker surfaces as soon as its thread is
/// joined.
pub fn run(config: Config) -> Result<()> {
    raise_open_file_limit()?;
    let pos_dirs = create_directories(&config)?;

    info!(
        "estimated scratch memory: {:.3} GiB across {} position(s)",
        config.estimated_memory_gib(),
        config.opt.npos
    );

    let config = Arc::new(config);
    let states: Vec<Arc<PositionState>> = (0..config.opt.npos)
        .map(|_| {
            Arc::new(PositionState::new(
                config.opt.nchan as usize,
                config.derived.cz as usize,
            ))
        })
        .collect();

    let mut acq_handles: Vec<JoinHandle<Result<()>>> = Vec::new();
    let mut cons_handles: Vec<JoinHandle<Result<()>>> = Vec::new();
    let mut consr_handles: Vec<JoinHandle<Result<()>>> = Vec::new();

    for p in 0..config.opt.npos {
        let idx = p as usize;
        let state = Arc::clone(&states[idx]);
        let config = Arc::clone(&config);
        let pos_dir = pos_dirs[idx].clone();
        acq_handles.push(
            std::thread::Builder::new()
                .name(format!("acq-{p}"))
                .spawn(move || acquisition::run(p, &pos_dir, &state, &config))
                .expect("failed to spawn ACQ thread"),
        );
    }

    for p in 0..config.opt.npos {
        let idx = p as usize;
        let state = Arc::clone(&states[idx]);
        let config = Arc::clone(&config);
        let pos_dir = pos_dirs[idx].clone();
        cons_handles.push(
            std::thread::Builder::new()
                .name(format!("cons-{p}"))
                .spawn(move || consolidator::run(p, &pos_dir, &state, &config))
                .expect("failed to spawn CONS thread"),
        );
    }

    for p in 0..config.opt.npos {
        let idx = p as usize;
        let state = Arc::clone(&states[idx]);
        let config = Arc::clone(&config);
        consr_handles.push(
            std::thread::Builder::new()
                .name(format!("consr-{p}"))
                .spawn(move || consumer::run(p, &state, &config))
                .expect("failed to spawn CONS-R thread"),
        );
    }

    join_all("CONS-R", consr_handles)?;
    join_all("CONS", cons_handles)?;
    join_all("ACQ", acq_handles)?;

    Ok(())
}

fn join_all(label: &str, handles: Vec<JoinHandle<Result<()>>>) -> Result<()> {
    for handle in handles {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("{label} worker failed: {e}");
                return Err(e);
            }
            Err(_) => {
                let msg = format!("{label} worker panicked");
                error!("{msg}");
                return Err(SlowionError::WorkerPanic(msg));
            }
        }
    }
    Ok(())
}
