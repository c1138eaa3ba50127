//! Provides input/output functionality for ligand file formats.
//!
//! Ligands and fragments are exchanged as AutoDock PDBQT files. The [`traits::LigandFile`]
//! trait gives every format the same read/write surface, and [`pdbqt::PdbqtSource`] plugs
//! the PDBQT reader into the engine's fragment cache.

pub mod pdbqt;
pub mod traits;
