//! # Core Models Module
//!
//! Data structures representing ligands as trees of rigid frames.
//!
//! ## Key Components
//!
//! - [`atom`] - AutoDock4 atom types and the immutable `Atom` value
//! - [`frame`] - Rigid frames and mutation points
//! - [`ligand`] - The frame arena, derived mutation points and summary properties
//!
//! ## Usage
//!
//! ```ignore
//! use ligrow::core::models::ligand::LigandBuilder;
//!
//! let mut builder = LigandBuilder::new("seed.pdbqt");
//! builder.add_atom(0, atom);
//! let ligand = builder.build()?;
//! assert!(ligand.addition_feasible());
//! ```

pub mod atom;
pub mod frame;
pub mod ligand;
