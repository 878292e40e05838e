//! Tuner state module
//!
//! - `catalog`: ordered stations with cyclic navigation
//! - `pairing`: the paired ship id and the power switch
//! - `machine`: event application and the per-tick playback decision

mod catalog;
mod machine;
mod pairing;

pub use machine::{TunerCommand, TunerState};
