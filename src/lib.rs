// slowion: A real-time nanopore sequencing fleet simulator in Rust
// Copyright (C) 2026, slowION contributors
//
// Permission is hereby granted, free of charge, to any person obtaining a
// copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be included
// in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS
// OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT.

#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cognitive_complexity)]
#![allow(clippy::too_many_lines)]

//! A real-time nanopore sequencing fleet simulator for benchmarking
//! storage and analysis pipelines: chunked acquisition, consolidation
//! into compressed signal containers, and streaming consumption, paced to
//! real-time deadlines.

pub mod acquisition;
pub mod cli;
pub mod consolidator;
pub mod consumer;
pub mod constants;
pub mod container;
pub mod error;
pub mod options;
pub mod rng;
pub mod runtime;
pub mod state;

pub use cli::Cli;
pub use error::{Result, SlowionError};
pub use options::{Config, Derived, Options};

#[cfg(test)]
mod tests {
    mod end_to_end;
}
