//! # Engine Module
//!
//! The stateful layer that turns a population of elite ligands into the next generation.
//!
//! ## Overview
//!
//! One generation is a fixed set of slots, each owned by a [`task::GenerationTask`]. A task
//! repeatedly draws parents, applies its genetic operator and asks the oracle for a verdict
//! until it fills its slot or runs out of retries. All tasks of a generation run on a
//! [`pool::TaskPool`] and the generation ends at the pool's barrier.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Run parameters and the operator mix of a generation
//! - **Fragment Cache** ([`cache`]) - Fragments parsed once and shared between tasks
//! - **Task Pool** ([`pool`]) - Fixed worker threads with a counting barrier
//! - **Tasks** ([`task`]) - The bounded retry loop that fills one slot
//! - **Generations** ([`generation`]) - Runs every task of one generation and collects the slots
//! - **State** ([`state`]) - Slot arrays and elite selection
//! - **Progress Monitoring** ([`progress`]) - Progress reporting callbacks
//! - **Error Handling** ([`error`]) - Engine-level errors that abort a run

pub mod cache;
pub mod config;
pub mod error;
pub mod generation;
pub mod pool;
pub mod progress;
pub mod state;
pub mod task;
pub(crate) mod utils;
