use nalgebra::Point3;
use phf::{Map, phf_map};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Two atoms are covalently bonded when closer than this multiple of their radius sum.
pub const BOND_TOLERANCE: f64 = 1.1;

/// Width of the verbatim span covering PDBQT columns 13-30 (name through residue number).
pub const PREFIX_WIDTH: usize = 18;
/// Width of the verbatim span covering PDBQT columns 55-79 (occupancy through atom type).
pub const SUFFIX_WIDTH: usize = 25;

/// The AutoDock4 atom types understood by ligrow.
///
/// The declaration order matters: hydrogens come first and halogens last, so the
/// chemical predicates below reduce to range checks on the discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AtomType {
    /// Polar hydrogen, i.e. bonded to a hetero atom.
    HD,
    /// Non-polar hydrogen, i.e. bonded to carbon.
    H,
    /// Carbon, not in a ring.
    C,
    /// Carbon, in a ring.
    A,
    /// Nitrogen, not a hydrogen bond acceptor.
    N,
    /// Nitrogen, a hydrogen bond acceptor.
    NA,
    /// Oxygen, a hydrogen bond acceptor.
    OA,
    /// Sulfur, a hydrogen bond acceptor.
    SA,
    /// Sulfur, not a hydrogen bond acceptor.
    S,
    /// Selenium.
    Se,
    /// Phosphorus.
    P,
    /// Fluorine.
    F,
    /// Chlorine.
    Cl,
    /// Bromine.
    Br,
    /// Iodine.
    I,
}

static AD_TYPE_LABELS: Map<&'static str, AtomType> = phf_map! {
    "HD" => AtomType::HD,
    "H" => AtomType::H,
    "C" => AtomType::C,
    "A" => AtomType::A,
    "N" => AtomType::N,
    "NA" => AtomType::NA,
    "OA" => AtomType::OA,
    "SA" => AtomType::SA,
    "S" => AtomType::S,
    "Se" => AtomType::Se,
    "P" => AtomType::P,
    "F" => AtomType::F,
    "Cl" => AtomType::Cl,
    "Br" => AtomType::Br,
    "I" => AtomType::I,
};

// Indexed by `AtomType as usize`.
const COVALENT_RADII: [f64; 15] = [
    0.37, 0.37, 0.77, 0.77, 0.75, 0.75, 0.73, 1.02, 1.02, 1.16, 1.06, 0.71, 0.99, 1.14, 1.33,
];

const ATOMIC_WEIGHTS: [f64; 15] = [
    1.008, 1.008, 12.01, 12.01, 14.01, 14.01, 16.00, 32.07, 32.07, 78.96, 30.97, 19.00, 35.45,
    79.90, 126.90,
];

const VALENCES: [u8; 15] = [1, 1, 4, 4, 3, 3, 2, 2, 2, 2, 5, 1, 1, 1, 1];

const LABELS: [&str; 15] = [
    "HD", "H", "C", "A", "N", "NA", "OA", "SA", "S", "Se", "P", "F", "Cl", "Br", "I",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AtomError {
    #[error("Unknown AutoDock4 atom type '{0}'")]
    UnknownType(String),
}

impl AtomType {
    /// Classifies an AutoDock4 type label such as `"OA"` or `"Cl"`.
    ///
    /// Labels are matched exactly after trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`AtomError::UnknownType`] if the label is not one of the fifteen supported types.
    pub fn parse(label: &str) -> Result<Self, AtomError> {
        AD_TYPE_LABELS
            .get(label.trim())
            .copied()
            .ok_or_else(|| AtomError::UnknownType(label.trim().to_string()))
    }

    pub fn label(self) -> &'static str {
        LABELS[self as usize]
    }

    /// Covalent radius in Angstroms.
    pub fn covalent_radius(self) -> f64 {
        COVALENT_RADII[self as usize]
    }

    /// Atomic weight in Daltons.
    pub fn atomic_weight(self) -> f64 {
        ATOMIC_WEIGHTS[self as usize]
    }

    /// Maximum number of covalent bonds an atom of this type forms.
    pub fn valence(self) -> u8 {
        VALENCES[self as usize]
    }

    pub fn is_hydrogen(self) -> bool {
        self <= AtomType::H
    }

    pub fn is_halogen(self) -> bool {
        self >= AtomType::F
    }

    /// Hydrogens and halogens are terminal atoms that a fragment may replace.
    pub fn is_mutable(self) -> bool {
        self.is_hydrogen() || self.is_halogen()
    }

    pub fn is_hb_donor(self) -> bool {
        self == AtomType::HD
    }

    pub fn is_hb_acceptor(self) -> bool {
        matches!(self, AtomType::NA | AtomType::OA | AtomType::SA)
    }

    /// Nitrogen, oxygen and sulfur carry polar hydrogens.
    pub fn is_hetero(self) -> bool {
        matches!(
            self,
            AtomType::N | AtomType::NA | AtomType::OA | AtomType::SA | AtomType::S
        )
    }
}

impl FromStr for AtomType {
    type Err = AtomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for AtomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An immutable atom of a ligand.
///
/// Besides its chemistry and position, an atom carries the two column spans of its
/// source record that ligrow does not interpret, so a ligand written back to disk keeps
/// residue names, charges and any other annotations untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    name: String,
    atom_type: AtomType,
    position: Point3<f64>,
    prefix: String,
    suffix: String,
}

impl Atom {
    /// Creates an atom from already separated record spans.
    ///
    /// # Arguments
    ///
    /// * `name` - The atom name (e.g. "C1", "HN").
    /// * `atom_type` - The AutoDock4 classification.
    /// * `position` - Cartesian coordinates in Angstroms.
    /// * `prefix` - Verbatim PDBQT columns 13-30.
    /// * `suffix` - Verbatim PDBQT columns 55-79.
    pub fn new(
        name: &str,
        atom_type: AtomType,
        position: Point3<f64>,
        prefix: &str,
        suffix: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            atom_type,
            position,
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        }
    }

    /// Creates an atom with synthesized record spans for a generic `LIG` residue.
    pub fn synthesized(name: &str, atom_type: AtomType, position: Point3<f64>) -> Self {
        let prefix = format!("{:<4}{}", format_atom_name(name), " LIG A   1    ");
        let suffix = format!(
            "{:>6.2}{:>6.2}    {:>6.3} {:<2}",
            1.0,
            0.0,
            0.0,
            atom_type.label()
        );
        Self::new(name, atom_type, position, &prefix, &suffix)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn atom_type(&self) -> AtomType {
        self.atom_type
    }

    pub fn position(&self) -> &Point3<f64> {
        &self.position
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn covalent_radius(&self) -> f64 {
        self.atom_type.covalent_radius()
    }

    pub fn atomic_weight(&self) -> f64 {
        self.atom_type.atomic_weight()
    }

    pub fn is_hydrogen(&self) -> bool {
        self.atom_type.is_hydrogen()
    }

    pub fn is_halogen(&self) -> bool {
        self.atom_type.is_halogen()
    }

    pub fn is_mutable(&self) -> bool {
        self.atom_type.is_mutable()
    }

    pub fn is_hb_donor(&self) -> bool {
        self.atom_type.is_hb_donor()
    }

    pub fn is_hb_acceptor(&self) -> bool {
        self.atom_type.is_hb_acceptor()
    }

    /// Returns true if this atom is covalently bonded to `other`.
    ///
    /// The test is symmetric. It must not be called with the atom itself.
    pub fn is_neighbor(&self, other: &Atom) -> bool {
        debug_assert!(!std::ptr::eq(self, other));
        let cutoff = BOND_TOLERANCE * (self.covalent_radius() + other.covalent_radius());
        (self.position - other.position).norm_squared() < cutoff * cutoff
    }

    /// Returns a copy of this atom at a new position; spans and chemistry are kept.
    pub fn moved_to(&self, position: Point3<f64>) -> Self {
        Self {
            position,
            ..self.clone()
        }
    }

    /// Returns a new atom that takes over this atom's residue annotations but has its own
    /// name, type and position. The partial charge is reset to zero.
    pub fn derive(&self, name: &str, atom_type: AtomType, position: Point3<f64>) -> Self {
        let residue_part = self.prefix.get(4..).unwrap_or(" LIG A   1    ");
        let prefix = format!("{:<4}{}", format_atom_name(name), residue_part);
        let occupancy_part = self.suffix.get(..16).unwrap_or("  1.00  0.00    ");
        let suffix = format!("{}{:>6.3} {:<2}", occupancy_part, 0.0, atom_type.label());
        Self::new(name, atom_type, position, &prefix, &suffix)
    }
}

// Names shorter than four characters start in column 14, as in the PDB convention.
fn format_atom_name(name: &str) -> String {
    if name.chars().count() >= 4 {
        name.chars().take(4).collect()
    } else {
        format!(" {:<3}", name)
    }
}
