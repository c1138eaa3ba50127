//! # Core Module
//!
//! Fundamental building blocks of ligrow: the ligand structural model, the genetic
//! operators, file I/O and the oracle interfaces.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Atoms, frames, mutation points and ligands
//! - **Genetic Operators** ([`operators`]) - Addition, subtraction and crossover
//! - **File I/O** ([`io`]) - Reading and writing ligands in PDBQT format
//! - **Validation & Scoring** ([`oracle`]) - Feasibility filters and docking oracles
//! - **Utilities** ([`utils`]) - Rigid-body geometry helpers
//!
//! Everything in this module is free of shared mutable state; ligands are built once by a
//! parser or an operator and never changed afterwards.

pub mod io;
pub mod models;
pub mod operators;
pub mod oracle;
pub mod utils;
