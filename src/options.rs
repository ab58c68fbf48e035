//! Process-wide options and their derived quantities.
//!
//! spec.md §3 "Options" / "Derived". The source program (`original_source/`)
//! exposes these via a global `opt_t *opt` pointer; per spec.md §9 Design
//! Notes we instead build one immutable `Options` value at startup and pass
//! clones of it (all fields here are cheap to copy or clone) into each
//! worker closure — workers never mutate derived fields after startup.

use std::path::PathBuf;

use log::warn;

use crate::cli::Cli;
use crate::constants::{
    MAX_NCHAN, MAX_NPOS, MIN_NCHAN, MIN_NPOS, MIN_RLEN, SOFT_MAX_BPS, SOFT_MAX_FREQ, SOFT_MIN_BPS,
    SOFT_MIN_FREQ, WARN_MAX_RLEN,
};
use crate::error::{Result, SlowionError};

/// Raw, user-facing options (spec.md §3 "Options").
#[derive(Debug, Clone)]
pub struct Options {
    pub bps: i64,
    pub mean_rlen: i64,
    pub sim_time: i64,
    pub npos: i64,
    pub nchan: i64,
    pub freq: i64,
    pub dir: PathBuf,
    pub seed: i64,
}

/// Quantities derived once from `Options` (spec.md §3 "Derived").
///
/// All fields are integral seconds/samples per the source design
/// (`cal_opt()` in `original_source/src/slowion.c` uses truncating integer
/// division throughout, not floating point).
#[derive(Debug, Clone, Copy)]
pub struct Derived {
    pub mean_slen: i64,
    pub cz: i64,
    pub ct: i64,
    pub iterations: i64,
}

/// The fully resolved, immutable configuration passed to every worker.
#[derive(Debug, Clone)]
pub struct Config {
    pub opt: Options,
    pub derived: Derived,
}

impl Options {
    /// Validate and construct options from parsed CLI arguments.
    ///
    /// Mirrors the policy in spec.md §7: some violations are fatal
    /// (rejected outright), others are warned and accepted. This matches
    /// `original_source/src/main.c`'s per-flag handling exactly.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        if cli.positions < MIN_NPOS || cli.positions > MAX_NPOS {
            return Err(SlowionError::InvalidOption(format!(
                "number of positions must be between {MIN_NPOS} and {MAX_NPOS}, got {}",
                cli.positions
            )));
        }

        if cli.channels < MIN_NCHAN || cli.channels > MAX_NCHAN {
            return Err(SlowionError::InvalidOption(format!(
                "number of channels must be between {MIN_NCHAN} and {MAX_NCHAN}, got {}",
                cli.channels
            )));
        }

        if cli.mean_rlen < MIN_RLEN {
            return Err(SlowionError::InvalidOption(format!(
                "mean read length must be >= {MIN_RLEN}; for shorter libraries the whole read \
                 fits in memory and chunked acquisition isn't meaningful to benchmark"
            )));
        }
        if cli.mean_rlen > WARN_MAX_RLEN {
            warn!(
                "mean read length {} exceeds {WARN_MAX_RLEN}; no known library has reads this \
                 long, continuing anyway",
                cli.mean_rlen
            );
        }

        if cli.freq < SOFT_MIN_FREQ || cli.freq > SOFT_MAX_FREQ {
            warn!(
                "sample rate {} is outside the expected [{SOFT_MIN_FREQ}, {SOFT_MAX_FREQ}] Hz \
                 range, continuing anyway",
                cli.freq
            );
        }

        if cli.bps < SOFT_MIN_BPS || cli.bps > SOFT_MAX_BPS {
            warn!(
                "translocation speed {} is outside the expected [{SOFT_MIN_BPS}, {SOFT_MAX_BPS}] \
                 bases/sec range, continuing anyway",
                cli.bps
            );
        }

        if cli.dir.exists() {
            return Err(SlowionError::OutputDirExists(cli.dir.clone()));
        }

        Ok(Options {
            bps: cli.bps,
            mean_rlen: cli.mean_rlen,
            sim_time: cli.sim_time,
            npos: cli.positions,
            nchan: cli.channels,
            freq: cli.freq,
            dir: cli.dir.clone(),
            seed: cli.seed,
        })
    }

    /// Compute derived quantities, failing if any invariant in spec.md §3
    /// is violated. Mirrors `cal_opt()`'s assertions.
    pub fn derive(&self) -> Result<Derived> {
        let mean_slen = self.mean_rlen * self.freq / self.bps;
        if 2 * mean_slen <= self.freq {
            return Err(SlowionError::Invariant(format!(
                "2 * mean_slen ({}) must exceed freq ({}); increase -r or -f, or decrease -b",
                2 * mean_slen,
                self.freq
            )));
        }

        let cz = 2 * mean_slen;
        let ct = cz / self.freq;
        if ct < 1 {
            return Err(SlowionError::Invariant(format!(
                "derived chunk duration ct ({ct}) must be at least 1 second"
            )));
        }
        if self.sim_time <= ct {
            return Err(SlowionError::Invariant(format!(
                "simulation time ({}) must exceed the derived chunk duration ct ({ct})",
                self.sim_time
            )));
        }

        let iterations = self.sim_time / ct;
        if iterations < 1 {
            return Err(SlowionError::Invariant(
                "derived iteration count must be at least 1".to_string(),
            ));
        }

        Ok(Derived {
            mean_slen,
            cz,
            ct,
            iterations,
        })
    }
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let opt = Options::from_cli(cli)?;
        let derived = opt.derive()?;
        Ok(Config { opt, derived })
    }

    /// Approximate resident memory required for per-channel scratch buffers,
    /// in GiB — used only for a startup log line (mirrors the source's
    /// `VERBOSE` memory estimate in `main.c`).
    pub fn estimated_memory_gib(&self) -> f64 {
        (self.derived.cz * self.opt.npos * self.opt.nchan * 2) as f64 / (1024.0 * 1024.0 * 1024.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with(mean_rlen: i64, freq: i64, bps: i64, sim_time: i64) -> Cli {
        Cli {
            positions: 1,
            channels: 4,
            sim_time,
            mean_rlen,
            freq,
            bps,
            dir: PathBuf::from("/nonexistent/should/not/exist/slowion-test"),
            verbose: 2,
            seed: 5,
        }
    }

    #[test]
    fn rejects_short_mean_rlen() {
        let cli = cli_with(2999, 4000, 400, 300);
        assert!(Options::from_cli(&cli).is_err());
    }

    #[test]
    fn accepts_default_like_options() {
        let cli = cli_with(10_000, 4_000, 400, 300);
        let opt = Options::from_cli(&cli).unwrap();
        let derived = opt.derive().unwrap();
        assert_eq!(derived.mean_slen, 100_000);
        assert_eq!(derived.cz, 200_000);
        assert_eq!(derived.ct, 50);
        assert_eq!(derived.iterations, 6);
    }

    #[test]
    fn smoke_scenario_s1_rejects_small_sim_time() {
        // spec.md §8 S1: -T 12 -r 3000 -f 4000 -b 400 derives ct=15 >= sim_time.
        let cli = cli_with(3000, 4000, 400, 12);
        let opt = Options::from_cli(&cli).unwrap();
        assert!(opt.derive().is_err());
    }

    #[test]
    fn minimal_happy_path_s2_derives_expected_constants() {
        let cli = cli_with(3000, 4000, 400, 60);
        let opt = Options::from_cli(&cli).unwrap();
        let derived = opt.derive().unwrap();
        assert_eq!(derived.mean_slen, 30_000);
        assert_eq!(derived.cz, 60_000);
        assert_eq!(derived.ct, 15);
        assert_eq!(derived.iterations, 4);
    }

    #[test]
    fn long_read_dominated_s3_derives_expected_constants() {
        let cli = cli_with(30_000, 4_000, 400, 600);
        let opt = Options::from_cli(&cli).unwrap();
        let derived = opt.derive().unwrap();
        assert_eq!(derived.mean_slen, 300_000);
        assert_eq!(derived.cz, 600_000);
        assert_eq!(derived.ct, 150);
        assert_eq!(derived.iterations, 4);
    }

    #[test]
    fn rejects_out_of_range_positions() {
        let mut cli = cli_with(10_000, 4_000, 400, 300);
        cli.positions = 101;
        assert!(Options::from_cli(&cli).is_err());
    }

    #[test]
    fn rejects_out_of_range_channels() {
        let mut cli = cli_with(10_000, 4_000, 400, 300);
        cli.channels = 3001;
        assert!(Options::from_cli(&cli).is_err());
    }
}
