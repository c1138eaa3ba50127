use super::{Evaluation, Oracle, OracleError};
use crate::core::io::pdbqt::PdbqtFile;
use crate::core::io::traits::LigandFile;
use crate::core::models::ligand::Ligand;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tempfile::NamedTempFile;

/// The argument placeholder replaced by the path of the ligand being scored.
pub const LIGAND_PLACEHOLDER: &str = "{ligand}";

/// The quantity an external program prints on its last stdout line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reported {
    /// Binding free energy in kcal/mol, as printed by a docking program.
    #[default]
    FreeEnergy,
    /// Predicted logP, as printed by a partition coefficient predictor.
    Logp,
}

/// Scores ligands with an external program.
///
/// The ligand is written to a temporary PDBQT file whose path replaces every
/// `{ligand}` in the arguments. A zero exit status whose last non-empty stdout line is a
/// number is an accepted evaluation carrying that number as the [`Reported`] quantity;
/// anything else the program reports is a rejection. Failing to start the program makes
/// the oracle unavailable.
///
/// A logP predictor keeps the ligand's current free energy, so it can sit in front of a
/// [`PropertyFilter`](super::PropertyFilter) in an [`OracleChain`](super::OracleChain).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOracle {
    program: String,
    args: Vec<String>,
    reported: Reported,
}

impl CommandOracle {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            reported: Reported::FreeEnergy,
        }
    }

    pub fn reporting(mut self, reported: Reported) -> Self {
        self.reported = reported;
        self
    }

    pub fn reported(&self) -> Reported {
        self.reported
    }

    /// Splits a whitespace-separated command line into program and arguments.
    ///
    /// Returns `None` for a blank command line.
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn args_for(&self, ligand_path: &Path) -> Vec<String> {
        let path = ligand_path.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace(LIGAND_PLACEHOLDER, &path))
            .collect()
    }
}

fn parse_last_value(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .and_then(|line| line.parse().ok())
        .filter(|value: &f64| value.is_finite())
}

impl Oracle for CommandOracle {
    fn evaluate(&self, ligand: &Ligand) -> Result<Evaluation, OracleError> {
        let unavailable = |what: &str, e: std::io::Error| {
            OracleError::Unavailable(format!("{} for '{}': {}", what, self.program, e))
        };

        let mut file = tempfile::Builder::new()
            .prefix("ligrow-")
            .suffix(".pdbqt")
            .tempfile()
            .map_err(|e| unavailable("Could not create temporary ligand file", e))?;
        write_ligand(ligand, &mut file)
            .map_err(|e| unavailable("Could not write temporary ligand file", e))?;

        let output = Command::new(&self.program)
            .args(self.args_for(file.path()))
            .output()
            .map_err(|e| unavailable("Could not execute external program", e))?;

        if !output.status.success() {
            tracing::debug!(
                id = %ligand.id().display(),
                program = %self.program,
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "External program failed; ligand rejected."
            );
            return Ok(Evaluation::rejected());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match (parse_last_value(&stdout), self.reported) {
            (Some(free_energy), Reported::FreeEnergy) => Ok(Evaluation::accepted(free_energy)),
            (Some(logp), Reported::Logp) => {
                Ok(Evaluation::accepted(ligand.free_energy()).with_logp(logp))
            }
            (None, reported) => {
                tracing::debug!(
                    id = %ligand.id().display(),
                    program = %self.program,
                    expected = ?reported,
                    "External program printed no value; ligand rejected."
                );
                Ok(Evaluation::rejected())
            }
        }
    }
}

fn write_ligand(ligand: &Ligand, file: &mut NamedTempFile) -> std::io::Result<()> {
    PdbqtFile::write_to(ligand, file).map_err(std::io::Error::other)?;
    file.flush()
}
