//! Slow(er) end-to-end tests exercising the full three-worker pipeline
//! per position against tiny derived parameters, so each completes in a
//! few seconds of real time. Included from `lib.rs`'s
//! `#[cfg(test)] mod tests`.

use std::path::PathBuf;

use tempfile::tempdir;

use crate::cli::Cli;
use crate::options::Config;
use crate::runtime;

fn tiny_cli(dir: PathBuf, npos: i64, nchan: i64, sim_time: i64) -> Cli {
    Cli {
        positions: npos,
        channels: nchan,
        sim_time,
        mean_rlen: 3000,
        freq: 3000,
        bps: 5000,
        dir,
        verbose: 0,
        seed: 5,
    }
}

#[test]
fn single_position_small_fleet_runs_to_completion() {
    let base = tempdir().unwrap();
    let out_dir = base.path().join("out");

    // mean_slen = 3000*3000/5000 = 1800, cz = 3600, ct = 1, iterations = sim_time.
    let cli = tiny_cli(out_dir.clone(), 1, 2, 5);
    let config = Config::from_cli(&cli).unwrap();
    assert_eq!(config.derived.ct, 1);

    runtime::run(config).unwrap();

    assert!(out_dir.join("pos0_0.blow5").exists());
    assert!(out_dir.join("pos0_1.blow5").exists());
    assert!(!out_dir.join("pos0").exists());
}

#[test]
fn multi_position_fleet_produces_independent_containers() {
    let base = tempdir().unwrap();
    let out_dir = base.path().join("out");

    let cli = tiny_cli(out_dir.clone(), 3, 2, 4);
    let config = Config::from_cli(&cli).unwrap();

    runtime::run(config).unwrap();

    for p in 0..3 {
        assert!(out_dir.join(format!("pos{p}_0.blow5")).exists());
        assert!(out_dir.join(format!("pos{p}_1.blow5")).exists());
    }
}

#[test]
fn rerunning_against_an_existing_directory_is_rejected() {
    let base = tempdir().unwrap();
    let out_dir = base.path().join("out");

    let cli = tiny_cli(out_dir.clone(), 1, 1, 4);
    let config = Config::from_cli(&cli).unwrap();
    runtime::run(config).unwrap();

    let second_cli = tiny_cli(out_dir, 1, 1, 4);
    assert!(Config::from_cli(&second_cli).is_err());
}
