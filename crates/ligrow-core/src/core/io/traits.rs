use crate::core::models::ligand::{Ligand, LigandError};
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading and writing ligand file formats.
///
/// Implementors handle format-specific parsing and serialization; the path-based
/// methods are provided on top of the reader/writer ones.
pub trait LigandFile {
    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads a ligand from a buffered reader.
    ///
    /// # Arguments
    ///
    /// * `reader` - The buffered reader to read from.
    /// * `id` - The identifier given to the parsed ligand, usually its file path.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or I/O operations encounter issues.
    fn read_from(reader: &mut impl BufRead, id: &Path) -> Result<Ligand, Self::Error>;

    /// Writes a ligand to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_to(ligand: &Ligand, writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Reads a ligand from a file path; the path becomes the ligand's identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Ligand, Self::Error> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader, path)
    }

    /// Writes a ligand to a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    fn write_to_path<P: AsRef<Path>>(ligand: &Ligand, path: P) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(ligand, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

/// Something that can turn a fragment identifier into a parsed ligand.
///
/// The engine's fragment cache calls this at most once per identifier and shares the
/// result between threads, so implementations must be thread-safe.
pub trait LigandSource: Send + Sync {
    /// Parses the ligand identified by `id`.
    ///
    /// # Errors
    ///
    /// Returns [`LigandError::MalformedFragment`] if the ligand cannot be read.
    fn parse(&self, id: &Path) -> Result<Ligand, LigandError>;
}
