pub const DEFAULT_BPS: i64 = 400;
pub const DEFAULT_MEAN_RLEN: i64 = 10_000;
pub const DEFAULT_SIM_TIME: i64 = 300;
pub const DEFAULT_NPOS: i64 = 1;
pub const DEFAULT_NCHAN: i64 = 512;
pub const DEFAULT_FREQ: i64 = 4_000;
pub const DEFAULT_OUTPUT_DIR: &str = "./output/";
pub const DEFAULT_SEED: i64 = 5;

pub const MIN_RLEN: i64 = 3_000;
pub const WARN_MAX_RLEN: i64 = 50_000;

pub const MIN_NPOS: i64 = 0;
pub const MAX_NPOS: i64 = 100;

pub const MIN_NCHAN: i64 = 0;
pub const MAX_NCHAN: i64 = 3_000;

pub const SOFT_MIN_FREQ: i64 = 3_000;
pub const SOFT_MAX_FREQ: i64 = 10_000;

pub const SOFT_MIN_BPS: i64 = 50;
pub const SOFT_MAX_BPS: i64 = 500;

/// Gamma shape parameter for the read-length generator (fixed by the source design).
pub const LENGTH_GAMMA_SHAPE: f64 = 2.0;

/// Number of extra ticks CONS and CONS-R each run after observing their
/// upstream's completion flag, so counters published in the upstream's
/// final tick are guaranteed to be drained.
pub const TERMINATION_LATCH_TICKS: u32 = 2;

/// Uniform sample base level (spec.md §4.1: base 500 with noise in [-500, +500]).
pub const SAMPLE_BASE_LEVEL: f64 = 500.0;

pub const ISLOW5_MAGIC: &[u8; 7] = b"ISLOW5\x01";

pub const RUN_ID: &str = "run_0";
pub const ASIC_ID: &str = "asic_id_0";

pub const RECORD_DIGITISATION: f64 = 2048.0;
pub const RECORD_OFFSET: f64 = 3.0;
pub const RECORD_RANGE: f64 = 10.0;
pub const RECORD_MEDIAN_BEFORE: f64 = 0.1;
pub const RECORD_START_TIME: u64 = 100;
