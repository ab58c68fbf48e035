//! Binary container formats.
//!
//! Two distinct formats live here: the transient, uncompressed per-read
//! spill format ACQ uses to stream a long read across ticks
//! ([`intermediate`], spec.md §4.4), and the compressed, self-describing
//! "blow5" final container both CONS and ACQ write into and CONS-R reads
//! from ([`format`], spec.md §6).

pub mod format;
pub mod intermediate;
