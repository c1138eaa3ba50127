//! # ligrow Core Library
//!
//! A fragment-based ligand growing engine. Starting from a seed ligand, ligrow evolves
//! candidate molecules with a genetic algorithm whose operators graft, prune and swap
//! rigid molecular fragments, and scores every offspring with an external docking oracle.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Atom`, `Frame`, `Ligand`), the
//!   genetic operators that build new ligands from existing ones, the PDBQT codec, and the
//!   oracle interfaces used to validate and score candidates.
//!
//! - **[`engine`]: The Logic Core.** The stateful, concurrent layer: the shared fragment
//!   cache, the worker pool, and the per-slot generation tasks with their bounded retry loop.
//!
//! - **[`workflows`]: The Public API.** Ties `engine` and `core` together into a complete
//!   multi-generation growth run with elitist selection and result persistence.

pub mod core;
pub mod engine;
pub mod workflows;
