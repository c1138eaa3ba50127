use crate::core::io::traits::{LigandFile, LigandSource};
use crate::core::models::atom::{Atom, AtomError, AtomType, PREFIX_WIDTH, SUFFIX_WIDTH};
use crate::core::models::ligand::{Ligand, LigandBuilder, LigandError};
use nalgebra::Point3;
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::Path;
use thiserror::Error;

// 0-based column ranges of an ATOM/HETATM record.
const SERIAL_COLUMNS: (usize, usize) = (6, 11);
const PREFIX_START: usize = 12;
const X_COLUMNS: (usize, usize) = (30, 38);
const Y_COLUMNS: (usize, usize) = (38, 46);
const Z_COLUMNS: (usize, usize) = (46, 54);
const SUFFIX_START: usize = 54;
const TYPE_COLUMNS: (usize, usize) = (77, 79);
const RECORD_WIDTH: usize = SUFFIX_START + SUFFIX_WIDTH;

#[derive(Debug, Error)]
pub enum PdbqtError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: PdbqtParseErrorKind,
    },
    #[error("Unbalanced {record} on line {line}")]
    UnbalancedBranch { line: usize, record: &'static str },
    #[error("BRANCH on line {line} refers to atom serial {serial}, which is not in its parent frame")]
    UnknownRotorAtom { line: usize, serial: usize },
    #[error("BRANCH opened on line {line} never contains its rotor atom {serial}")]
    MissingRotorAtom { line: usize, serial: usize },
    #[error("Missing required record: {0}")]
    MissingRecord(String),
    #[error("Invalid structure: {0}")]
    Structure(#[from] LigandError),
}

#[derive(Debug, Error)]
pub enum PdbqtParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Line is too short for ATOM/HETATM record (must be at least 78 chars)")]
    LineTooShort,
    #[error("{0}")]
    UnknownType(#[from] AtomError),
    #[error("{record} record requires two atom serials")]
    InvalidBranchFormat { record: &'static str },
    #[error("ATOM record outside ROOT/BRANCH")]
    AtomOutsideFrame,
    #[error("Duplicate atom serial {0}")]
    DuplicateSerial(usize),
}

fn slice_and_trim(line: &str, (start, end): (usize, usize)) -> &str {
    line.get(start..end).unwrap_or("").trim()
}

fn parse_float(line: &str, columns: (usize, usize), line_num: usize) -> Result<f64, PdbqtError> {
    let value = slice_and_trim(line, columns);
    value.parse().map_err(|_| PdbqtError::Parse {
        line: line_num,
        kind: PdbqtParseErrorKind::InvalidFloat {
            columns: format!("{}-{}", columns.0 + 1, columns.1),
            value: value.to_string(),
        },
    })
}

fn parse_serial(value: &str, columns: &str, line_num: usize) -> Result<usize, PdbqtError> {
    value.parse().map_err(|_| PdbqtError::Parse {
        line: line_num,
        kind: PdbqtParseErrorKind::InvalidInt {
            columns: columns.to_string(),
            value: value.to_string(),
        },
    })
}

fn parse_branch_serials(
    line: &str,
    record: &'static str,
    line_num: usize,
) -> Result<(usize, usize), PdbqtError> {
    let fields: Vec<&str> = line.split_whitespace().skip(1).collect();
    let [x, y] = fields.as_slice() else {
        return Err(PdbqtError::Parse {
            line: line_num,
            kind: PdbqtParseErrorKind::InvalidBranchFormat { record },
        });
    };
    Ok((
        parse_serial(x, record, line_num)?,
        parse_serial(y, record, line_num)?,
    ))
}

/// An open BRANCH whose rotor-Y atom may not have been read yet.
struct OpenBranch {
    frame: usize,
    line: usize,
    rotor_y_serial: usize,
    rotor_y_seen: bool,
}

/// Reader and writer for AutoDock PDBQT ligands.
///
/// Each atom record keeps columns 13-30 and 55-79 verbatim; only the serial number and
/// the coordinates are interpreted and regenerated.
pub struct PdbqtFile;

impl LigandFile for PdbqtFile {
    type Error = PdbqtError;

    fn read_from(reader: &mut impl BufRead, id: &Path) -> Result<Ligand, Self::Error> {
        let mut builder = LigandBuilder::new(id);
        let mut serials: HashMap<usize, (usize, usize)> = HashMap::new();
        let mut root_seen = false;
        let mut root_open = false;
        let mut stack: Vec<OpenBranch> = Vec::new();
        let mut torsdof: Option<usize> = None;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;
            let record = line.split_whitespace().next().unwrap_or("");

            match record {
                "ROOT" => {
                    if root_seen {
                        return Err(PdbqtError::UnbalancedBranch {
                            line: line_num,
                            record: "ROOT",
                        });
                    }
                    root_seen = true;
                    root_open = true;
                }
                "ENDROOT" => {
                    if !root_open {
                        return Err(PdbqtError::UnbalancedBranch {
                            line: line_num,
                            record: "ENDROOT",
                        });
                    }
                    root_open = false;
                }
                "BRANCH" => {
                    if !root_seen || root_open {
                        return Err(PdbqtError::UnbalancedBranch {
                            line: line_num,
                            record: "BRANCH",
                        });
                    }
                    let (x, y) = parse_branch_serials(&line, "BRANCH", line_num)?;
                    let parent = stack.last().map_or(0, |b| b.frame);
                    let rotor_x = match serials.get(&x) {
                        Some(&(frame, index)) if frame == parent => index,
                        _ => {
                            return Err(PdbqtError::UnknownRotorAtom {
                                line: line_num,
                                serial: x,
                            });
                        }
                    };
                    let frame = builder.begin_branch(parent, rotor_x);
                    stack.push(OpenBranch {
                        frame,
                        line: line_num,
                        rotor_y_serial: y,
                        rotor_y_seen: false,
                    });
                }
                "ENDBRANCH" => {
                    parse_branch_serials(&line, "ENDBRANCH", line_num)?;
                    let Some(branch) = stack.pop() else {
                        return Err(PdbqtError::UnbalancedBranch {
                            line: line_num,
                            record: "ENDBRANCH",
                        });
                    };
                    if !branch.rotor_y_seen {
                        return Err(PdbqtError::MissingRotorAtom {
                            line: branch.line,
                            serial: branch.rotor_y_serial,
                        });
                    }
                }
                "ATOM" | "HETATM" => {
                    let frame = match stack.last() {
                        Some(branch) => branch.frame,
                        None if root_open => 0,
                        None => {
                            return Err(PdbqtError::Parse {
                                line: line_num,
                                kind: PdbqtParseErrorKind::AtomOutsideFrame,
                            });
                        }
                    };
                    let (serial, atom) = parse_atom_line(&line, line_num)?;
                    let index = builder.add_atom(frame, atom);
                    if serials.insert(serial, (frame, index)).is_some() {
                        return Err(PdbqtError::Parse {
                            line: line_num,
                            kind: PdbqtParseErrorKind::DuplicateSerial(serial),
                        });
                    }
                    if let Some(branch) = stack.last_mut() {
                        if branch.rotor_y_serial == serial {
                            builder.set_rotor_y(frame, index);
                            branch.rotor_y_seen = true;
                        }
                    }
                }
                "TORSDOF" => {
                    let value = line.split_whitespace().nth(1).unwrap_or("");
                    torsdof = Some(parse_serial(value, "TORSDOF", line_num)?);
                }
                _ => {}
            }
        }

        if !root_seen {
            return Err(PdbqtError::MissingRecord("ROOT".to_string()));
        }
        if root_open {
            return Err(PdbqtError::MissingRecord("ENDROOT".to_string()));
        }
        if let Some(branch) = stack.last() {
            return Err(PdbqtError::UnbalancedBranch {
                line: branch.line,
                record: "BRANCH",
            });
        }

        let ligand = builder.build()?;
        if let Some(n) = torsdof {
            if n != ligand.num_rotatable_bonds() {
                tracing::debug!(
                    id = %ligand.id().display(),
                    torsdof = n,
                    branches = ligand.num_rotatable_bonds(),
                    "TORSDOF differs from the number of BRANCH records."
                );
            }
        }
        Ok(ligand)
    }

    fn write_to(ligand: &Ligand, writer: &mut impl Write) -> Result<(), Self::Error> {
        let frames = ligand.frames();
        let mut serials: Vec<Vec<usize>> = frames.iter().map(|f| vec![0; f.atoms.len()]).collect();
        let mut next_serial = 1;

        writeln!(writer, "ROOT")?;
        write_frame_atoms(ligand, 0, &mut serials, &mut next_serial, writer)?;
        writeln!(writer, "ENDROOT")?;

        // Depth-first; a child's BRANCH line is written after all of its parent's atoms.
        enum Step {
            Open(usize),
            Close(usize, usize),
        }
        let mut stack: Vec<Step> = frames[0].branches.iter().rev().map(|&c| Step::Open(c)).collect();
        while let Some(step) = stack.pop() {
            match step {
                Step::Open(k) => {
                    let frame = &frames[k];
                    let parent = frame.parent.unwrap_or(0);
                    let x = serials[parent][frame.rotor_x];
                    let y = next_serial;
                    writeln!(writer, "BRANCH {:>3} {:>3}", x, y)?;
                    write_frame_atoms(ligand, k, &mut serials, &mut next_serial, writer)?;
                    stack.push(Step::Close(x, y));
                    stack.extend(frame.branches.iter().rev().map(|&c| Step::Open(c)));
                }
                Step::Close(x, y) => writeln!(writer, "ENDBRANCH {:>3} {:>3}", x, y)?,
            }
        }
        writeln!(writer, "TORSDOF {}", ligand.num_rotatable_bonds())?;
        Ok(())
    }
}

fn write_frame_atoms(
    ligand: &Ligand,
    k: usize,
    serials: &mut [Vec<usize>],
    next_serial: &mut usize,
    writer: &mut impl Write,
) -> io::Result<()> {
    let frame = &ligand.frames()[k];
    let order = (0..frame.atoms.len()).filter(|&i| frame.is_root() || i != frame.rotor_y);
    let order: Vec<usize> = if frame.is_root() {
        order.collect()
    } else {
        std::iter::once(frame.rotor_y).chain(order).collect()
    };
    for i in order {
        serials[k][i] = *next_serial;
        write_atom_line(*next_serial, &frame.atoms[i], writer)?;
        *next_serial += 1;
    }
    Ok(())
}

fn write_atom_line(serial: usize, atom: &Atom, writer: &mut impl Write) -> io::Result<()> {
    let p = atom.position();
    writeln!(
        writer,
        "ATOM  {:>5} {:<prefix$}{:>8.3}{:>8.3}{:>8.3}{:<suffix$}",
        serial,
        atom.prefix(),
        p.x,
        p.y,
        p.z,
        atom.suffix(),
        prefix = PREFIX_WIDTH,
        suffix = SUFFIX_WIDTH,
    )
}

fn parse_atom_line(line: &str, line_num: usize) -> Result<(usize, Atom), PdbqtError> {
    // Single-letter types may leave column 79 empty and trimmed away.
    if line.len() < RECORD_WIDTH - 1 {
        return Err(PdbqtError::Parse {
            line: line_num,
            kind: PdbqtParseErrorKind::LineTooShort,
        });
    }
    let padded = format!("{:<width$}", line, width = RECORD_WIDTH);

    let serial = parse_serial(slice_and_trim(&padded, SERIAL_COLUMNS), "7-11", line_num)?;
    let x = parse_float(&padded, X_COLUMNS, line_num)?;
    let y = parse_float(&padded, Y_COLUMNS, line_num)?;
    let z = parse_float(&padded, Z_COLUMNS, line_num)?;
    let atom_type = AtomType::parse(slice_and_trim(&padded, TYPE_COLUMNS)).map_err(|e| {
        PdbqtError::Parse {
            line: line_num,
            kind: e.into(),
        }
    })?;

    let prefix = padded.get(PREFIX_START..X_COLUMNS.0).unwrap_or("");
    let suffix = padded.get(SUFFIX_START..RECORD_WIDTH).unwrap_or("");
    let name = prefix.get(..4).unwrap_or(prefix).trim();

    Ok((
        serial,
        Atom::new(name, atom_type, Point3::new(x, y, z), prefix, suffix),
    ))
}

/// Loads fragments from PDBQT files for the fragment cache.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdbqtSource;

impl LigandSource for PdbqtSource {
    fn parse(&self, id: &Path) -> Result<Ligand, LigandError> {
        PdbqtFile::read_from_path(id).map_err(|e| LigandError::MalformedFragment {
            path: id.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ligand::fixtures;
    use std::io::Cursor;
    use tempfile::tempdir;

    const METHANOL: &str = "\
REMARK  2 active torsions:
ROOT
ATOM      1  C1  LIG A   1       0.000   0.000   0.000  1.00  0.00     0.042 C
ATOM      2  H1  LIG A   1      -0.363   1.028   0.000  1.00  0.00     0.029 H
ATOM      3  H2  LIG A   1      -0.363  -0.514   0.889  1.00  0.00     0.029 H
ENDROOT
BRANCH   1   4
ATOM      4  O1  LIG A   1       1.430   0.000   0.000  1.00  0.00    -0.393 OA
ATOM      5  HD1 LIG A   1       1.750   0.905   0.000  1.00  0.00     0.210 HD
ENDBRANCH   1   4
TORSDOF 1
";

    fn read(text: &str) -> Result<Ligand, PdbqtError> {
        PdbqtFile::read_from(&mut Cursor::new(text), Path::new("test.pdbqt"))
    }

    fn write(ligand: &Ligand) -> String {
        let mut out = Vec::new();
        PdbqtFile::write_to(ligand, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn read_builds_frames_and_rotor_indices() {
        let ligand = read(METHANOL).unwrap();
        assert_eq!(ligand.id(), Path::new("test.pdbqt"));
        assert_eq!(ligand.num_frames(), 2);
        assert_eq!(ligand.frames()[0].atoms.len(), 3);
        assert_eq!(ligand.frames()[1].parent, Some(0));
        assert_eq!(ligand.frames()[1].rotor_x, 0);
        assert_eq!(ligand.frames()[1].rotor_y, 0);
        assert_eq!(ligand.num_heavy_atoms(), 2);
        assert_eq!(ligand.num_hb_donors(), 1);
        assert_eq!(ligand.num_hb_acceptors(), 1);
    }

    #[test]
    fn read_keeps_verbatim_spans_and_types() {
        let ligand = read(METHANOL).unwrap();
        let o1 = &ligand.frames()[1].atoms[0];
        assert_eq!(o1.name(), "O1");
        assert_eq!(o1.atom_type(), AtomType::OA);
        assert_eq!(o1.prefix(), " O1  LIG A   1    ");
        assert_eq!(o1.suffix(), "  1.00  0.00    -0.393 OA");
        assert!((o1.position().x - 1.43).abs() < 1e-9);
    }

    #[test]
    fn write_reproduces_input_records() {
        let ligand = read(METHANOL).unwrap();
        let written = write(&ligand);
        let expected: Vec<&str> = METHANOL.lines().skip(1).map(str::trim_end).collect();
        let actual: Vec<&str> = written.lines().map(str::trim_end).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn written_fixture_parses_back_to_same_frames() {
        for ligand in [fixtures::seed(), fixtures::chain()] {
            let parsed = read(&write(&ligand)).unwrap();
            assert_eq!(parsed.frames(), ligand.frames());
            assert_eq!(parsed.mutation_points(), ligand.mutation_points());
        }
    }

    #[test]
    fn writer_emits_rotor_y_first_in_each_branch() {
        let mut b = LigandBuilder::new("x.pdbqt");
        b.add_atom(0, fixtures::atom("C1", AtomType::C, 0.0, 0.0, 0.0));
        let f1 = b.begin_branch(0, 0);
        b.add_atom(f1, fixtures::atom("H9", AtomType::H, 1.903, -0.514, 0.889));
        let y = b.add_atom(f1, fixtures::atom("C2", AtomType::C, 1.54, 0.0, 0.0));
        b.set_rotor_y(f1, y);
        let ligand = b.build().unwrap();

        let written = write(&ligand);
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[3], "BRANCH   1   2");
        assert!(lines[4].contains("C2"));
        assert!(lines[5].contains("H9"));

        let parsed = read(&written).unwrap();
        assert_eq!(parsed.frames()[1].rotor_y, 0);
        assert_eq!(parsed.frames()[1].atoms[0].name(), "C2");
    }

    #[test]
    fn read_reports_line_numbers_for_bad_records() {
        let bad_float = METHANOL.replace("  -0.363   1.028", "  -0.3x3   1.028");
        match read(&bad_float) {
            Err(PdbqtError::Parse {
                line: 4,
                kind: PdbqtParseErrorKind::InvalidFloat { .. },
            }) => {}
            other => panic!("unexpected result: {:?}", other),
        }

        let bad_type = METHANOL.replace("0.210 HD", "0.210 Zz");
        assert!(matches!(
            read(&bad_type),
            Err(PdbqtError::Parse {
                line: 9,
                kind: PdbqtParseErrorKind::UnknownType(_)
            })
        ));

        let short = "ROOT\nATOM      1  C1  LIG A   1       0.000\nENDROOT\n";
        assert!(matches!(
            read(short),
            Err(PdbqtError::Parse {
                line: 2,
                kind: PdbqtParseErrorKind::LineTooShort
            })
        ));
    }

    #[test]
    fn read_rejects_unbalanced_and_dangling_branches() {
        let unclosed = METHANOL.replace("ENDBRANCH   1   4\n", "");
        assert!(matches!(
            read(&unclosed),
            Err(PdbqtError::UnbalancedBranch { line: 7, .. })
        ));

        let unknown_rotor = METHANOL.replace("BRANCH   1   4", "BRANCH   9   4");
        assert!(matches!(
            read(&unknown_rotor),
            Err(PdbqtError::UnknownRotorAtom { serial: 9, .. })
        ));

        let missing_y = METHANOL.replace("BRANCH   1   4", "BRANCH   1   7");
        assert!(matches!(
            read(&missing_y),
            Err(PdbqtError::MissingRotorAtom { serial: 7, .. })
        ));

        assert!(matches!(
            read("TORSDOF 0\n"),
            Err(PdbqtError::MissingRecord(_))
        ));
    }

    #[test]
    fn path_roundtrip_and_source_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seed.pdbqt");
        PdbqtFile::write_to_path(&fixtures::seed(), &path).unwrap();

        let parsed = PdbqtSource.parse(&path).unwrap();
        assert_eq!(parsed.id(), path.as_path());
        assert_eq!(parsed.num_atoms(), 9);

        let missing = dir.path().join("absent.pdbqt");
        match PdbqtSource.parse(&missing) {
            Err(LigandError::MalformedFragment { path, .. }) => assert_eq!(path, missing),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
