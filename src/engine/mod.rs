//! Engine module housing the pipeline composition root.
//!
//! `clock` provides the injectable time sources; `core` wires the store,
//! ingestion, classifier, stabilizer, delta trigger and dispatcher together
//! behind `GesturePipeline`.

pub mod clock;
pub mod core;

pub use clock::{ManualTimeSource, SystemTimeSource, TimeSource};
pub use core::{GesturePipeline, PollReport, SampleView};
