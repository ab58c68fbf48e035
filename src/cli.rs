//! Command-line surface for the fleet simulator.
//!
//! Parsing itself is an external collaborator (spec.md §1): we lean on
//! `clap`'s derive API rather than hand-rolling flag parsing, the way
//! `archebase-robocodec`'s `src/bin/robocodec.rs` and
//! `easternanemone-rust-daq` do. `-h`/`--help` and `-V`/`--version` fall
//! out of clap for free.

use std::path::PathBuf;

use clap::Parser;

use crate::constants::{
    DEFAULT_BPS, DEFAULT_FREQ, DEFAULT_MEAN_RLEN, DEFAULT_NCHAN, DEFAULT_NPOS, DEFAULT_OUTPUT_DIR,
    DEFAULT_SEED, DEFAULT_SIM_TIME,
};

/// Simulates a fleet of nanopore sequencing positions for I/O pipeline benchmarking.
#[derive(Parser, Debug, Clone)]
#[command(name = "slowion")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Real-time nanopore sequencing fleet simulator", long_about = None)]
pub struct Cli {
    /// Number of positions [0, 100]
    #[arg(short = 'p', long = "positions", default_value_t = DEFAULT_NPOS)]
    pub positions: i64,

    /// Channels per position [0, 3000]
    #[arg(short = 'c', long = "channels", default_value_t = DEFAULT_NCHAN)]
    pub channels: i64,

    /// Simulation time in seconds
    #[arg(short = 'T', long = "time", default_value_t = DEFAULT_SIM_TIME)]
    pub sim_time: i64,

    /// Mean read length in bases (must be >= 3000)
    #[arg(short = 'r', long = "rlen", default_value_t = DEFAULT_MEAN_RLEN)]
    pub mean_rlen: i64,

    /// Sample rate in Hz (soft range [3000, 10000])
    #[arg(short = 'f', long = "sample-rate", default_value_t = DEFAULT_FREQ)]
    pub freq: i64,

    /// Average translocation speed in bases per second (soft range [50, 500])
    #[arg(short = 'b', default_value_t = DEFAULT_BPS)]
    pub bps: i64,

    /// Output directory (must not already exist)
    #[arg(short = 'd', long = "output", default_value = DEFAULT_OUTPUT_DIR)]
    pub dir: PathBuf,

    /// Verbosity: 0=error, 1=warn, 2=info, 3=debug, 4=trace
    #[arg(long = "verbose", default_value_t = 2)]
    pub verbose: u8,

    /// Base seed for the random number generators
    #[arg(long = "seed", default_value_t = DEFAULT_SEED)]
    pub seed: i64,
}

impl Cli {
    pub fn log_filter(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Warn,
            2 => log::LevelFilter::Info,
            3 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
