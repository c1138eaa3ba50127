//! # Workflows Module
//!
//! High-level entry points that run a complete growth process on top of [`crate::engine`].
//!
//! ## Overview
//!
//! A workflow owns everything a run needs: the worker pool, the fragment cache, the elite
//! population carried from one generation to the next, and the files written along the
//! way. Callers provide a seed ligand, a [`crate::engine::config::GrowthConfig`], an
//! [`crate::core::oracle::Oracle`] and a progress reporter.
//!
//! ## Architecture
//!
//! - **Growth Workflow** ([`grow`]) - Scores the seed, runs every generation, writes each
//!   accepted child and a CSV log, and keeps the best ligands by efficacy.

pub mod grow;
