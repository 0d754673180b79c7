// Released under MIT License.
// Copyright (c) 2023-2025 Ladislav Bartos

//! Implementation of functions for reading and writing gro files.
//! Multi-frame gro files can be used as random-access trajectories.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use crate::auxiliary::{coordinates_in_range, file_name, GRO_MAX_COORDINATE, GRO_MIN_COORDINATE};
use crate::errors::{ParseGroError, ReadTrajError, WriteGroError};
use crate::io::traj_io::{check_frame_index, TrajSource};
use crate::structures::{atom::Atom, model::Model, structure::Structure, vector3d::Vector3D};

/**************************/
/*   READING STRUCTURES   */
/**************************/

/// Read the first frame of a gro file.
///
/// ## Returns
/// Title of the frame, atoms and their coordinates. `ParseGroError` if the file could not be read.
pub fn read_gro(
    filename: impl AsRef<Path>,
) -> Result<(String, Vec<Atom>, Vec<Vector3D>), ParseGroError> {
    let file = File::open(filename.as_ref())
        .map_err(|_| ParseGroError::FileNotFound(Box::from(filename.as_ref())))?;

    let mut buffer = BufReader::new(file);

    let title = get_title(&mut buffer, filename.as_ref())?;
    let n_atoms = get_natoms(&mut buffer, filename.as_ref())?;

    let mut atoms = Vec::with_capacity(n_atoms);
    let mut coordinates = Vec::with_capacity(n_atoms);

    let mut line = String::new();
    for _ in 0..n_atoms {
        read_line(&mut buffer, &mut line, filename.as_ref())?;
        let (atom, position) = line_as_atom(line.trim_end())?;
        atoms.push(atom);
        coordinates.push(position);
    }

    // box line must be present even though it is not used
    read_line(&mut buffer, &mut line, filename.as_ref())?;
    check_box_line(line.trim())?;

    Ok((title, atoms, coordinates))
}

impl Model {
    /// Create a new model from the first frame of a gro file.
    /// The title of the gro file is used as the name of the model.
    ///
    /// ## Example
    /// ```no_run
    /// # use vtraj_rs::prelude::*;
    /// #
    /// let model = match Model::from_gro("system.gro") {
    ///     Ok(x) => x,
    ///     Err(e) => {
    ///         eprintln!("{}", e);
    ///         return;
    ///     }
    /// };
    /// ```
    pub fn from_gro(filename: impl AsRef<Path>) -> Result<Model, ParseGroError> {
        let (title, atoms, coordinates) = read_gro(filename)?;
        Ok(Model::new(&title, atoms, coordinates))
    }
}

/// ## Methods for reading and writing gro files.
impl Structure {
    /// Read the first frame of a gro file as a detached structure.
    pub fn from_gro(filename: impl AsRef<Path>) -> Result<Structure, ParseGroError> {
        let (title, atoms, coordinates) = read_gro(filename)?;
        Ok(Structure::new(&title, atoms, coordinates))
    }

    /// Write the structure into a gro file with the given name.
    ///
    /// ## Notes
    /// - Simulation box is not tracked by structures and is written as a sequence of zeros.
    /// - The file is not created if any coordinate does not fit the gro format.
    pub fn write_gro(&self, filename: impl AsRef<Path>) -> Result<(), WriteGroError> {
        if !coordinates_in_range(
            self.get_coordinates().iter(),
            GRO_MIN_COORDINATE,
            GRO_MAX_COORDINATE,
        ) {
            return Err(WriteGroError::CoordinateTooLarge);
        }

        let output = File::create(&filename)
            .map_err(|_| WriteGroError::CouldNotCreate(Box::from(filename.as_ref())))?;

        let mut writer = BufWriter::new(output);

        write_header(&mut writer, self.get_name(), self.get_n_atoms())?;

        for (atom, position) in self.get_atoms().iter().zip(self.get_coordinates()) {
            atom.write_gro(&mut writer, position)?;
        }

        let x = 0.0;
        writeln!(writer, " {x:9.5} {x:9.5} {x:9.5}").map_err(|_| WriteGroError::CouldNotWrite)?;

        writer.flush().map_err(|_| WriteGroError::CouldNotWrite)?;

        Ok(())
    }
}

/// Read the next line into `line`, failing at the end of the file.
fn read_line(
    buffer: &mut impl BufRead,
    line: &mut String,
    filename: &Path,
) -> Result<(), ParseGroError> {
    line.clear();
    match buffer.read_line(line) {
        Ok(0) | Err(_) => Err(ParseGroError::LineNotFound(Box::from(filename))),
        Ok(_) => Ok(()),
    }
}

/// Read the next line in the provided buffer and parse it as a title.
fn get_title(buffer: &mut impl BufRead, filename: &Path) -> Result<String, ParseGroError> {
    let mut title = String::new();
    read_line(buffer, &mut title, filename)?;
    Ok(title.trim().to_string())
}

/// Read the next line in the provided buffer and parse it as the number of atoms.
fn get_natoms(buffer: &mut impl BufRead, filename: &Path) -> Result<usize, ParseGroError> {
    let mut line = String::new();
    read_line(buffer, &mut line, filename)?;
    line.trim()
        .parse::<usize>()
        .map_err(|_| ParseGroError::ParseLineErr(line.trim().to_string()))
}

/// Parse the position of an atom from a line of a gro file.
fn line_as_position(line: &str) -> Option<Vector3D> {
    let mut position = [0.0f64; 3];
    for (i, item) in position.iter_mut().enumerate() {
        let curr = 20 + i * 8;
        *item = line.get(curr..curr + 8)?.trim().parse::<f64>().ok()?;
    }

    Some(position.into())
}

/// Parse a line as atom and its position. Velocities are ignored.
fn line_as_atom(line: &str) -> Result<(Atom, Vector3D), ParseGroError> {
    let error = || ParseGroError::ParseAtomLineErr(line.to_string());

    let field = |range: std::ops::Range<usize>| line.get(range).map(str::trim).ok_or_else(error);

    let resid = field(0..5)?.parse::<usize>().map_err(|_| error())?;

    let resname = field(5..10)?;
    if resname.is_empty() {
        return Err(error());
    }

    let atomname = field(10..15)?;
    if atomname.is_empty() {
        return Err(error());
    }

    let atomid = field(15..20)?.parse::<usize>().map_err(|_| error())?;

    let position = line_as_position(line).ok_or_else(error)?;

    Ok((Atom::new(resid, resname, atomid, atomname), position))
}

/// Check that a line contains simulation box dimensions (3 or 9 numbers).
fn check_box_line(line: &str) -> Result<(), ParseGroError> {
    let mut n_values = 0usize;
    for split in line.split_whitespace() {
        split
            .parse::<f64>()
            .map_err(|_| ParseGroError::ParseBoxLineErr(line.to_string()))?;
        n_values += 1;
    }

    if n_values != 3 && n_values != 9 {
        return Err(ParseGroError::ParseBoxLineErr(line.to_string()));
    }

    Ok(())
}

/// Write gro file header into an open gro file.
fn write_header(writer: &mut impl Write, title: &str, n_atoms: usize) -> Result<(), WriteGroError> {
    writeln!(writer, "{}", title).map_err(|_| WriteGroError::CouldNotWrite)?;
    writeln!(writer, "{:>5}", n_atoms).map_err(|_| WriteGroError::CouldNotWrite)?;

    Ok(())
}

/**************************/
/*  READING TRAJECTORIES  */
/**************************/

/// Multi-frame gro file providing random access to its frames.
///
/// Byte offsets of all frames are indexed when the file is opened,
/// so any frame can then be read by seeking directly to it.
#[derive(Debug)]
pub struct GroTrajectory {
    name: String,
    filename: Box<Path>,
    buffer: BufReader<File>,
    n_atoms: usize,
    offsets: Vec<u64>,
    line: String,
}

impl GroTrajectory {
    /// Open a gro file as a trajectory and index its frames.
    ///
    /// ## Returns
    /// `GroTrajectory` if the file exists and all its frames are complete
    /// and contain the same number of atoms. Otherwise `ReadTrajError`.
    ///
    /// ## Example
    /// ```no_run
    /// # use vtraj_rs::prelude::*;
    /// #
    /// let traj = GroTrajectory::open("trajectory.gro").unwrap();
    /// println!("{} frames of {} atoms", traj.n_frames(), traj.n_atoms());
    /// ```
    pub fn open(filename: impl AsRef<Path>) -> Result<Self, ReadTrajError> {
        let path = filename.as_ref();
        let file =
            File::open(path).map_err(|_| ReadTrajError::FileNotFound(Box::from(path)))?;

        let name = file_name(path);
        let mut buffer = BufReader::new(file);
        let (offsets, n_atoms) = index_frames(&mut buffer, &name)?;

        log::debug!(
            "Indexed {} frames of {} atoms in gro trajectory '{}'.",
            offsets.len(),
            n_atoms,
            path.display()
        );

        Ok(GroTrajectory {
            name,
            filename: Box::from(path),
            buffer,
            n_atoms,
            offsets,
            line: String::new(),
        })
    }

    /// Get the path to the trajectory file.
    pub fn get_filename(&self) -> &Path {
        &self.filename
    }

    /// Read the next line of the current frame.
    fn next_line(&mut self, frame: usize) -> Result<(), ReadTrajError> {
        self.line.clear();
        match self.buffer.read_line(&mut self.line) {
            Ok(0) | Err(_) => Err(ReadTrajError::CorruptedFrame(frame, self.name.clone())),
            Ok(_) => Ok(()),
        }
    }
}

/// Scan the whole file and collect byte offsets of the frames.
/// Returns the offsets and the number of atoms in each frame.
fn index_frames(
    buffer: &mut BufReader<File>,
    name: &str,
) -> Result<(Vec<u64>, usize), ReadTrajError> {
    let mut offsets = Vec::new();
    let mut n_atoms: Option<usize> = None;
    let mut position = 0u64;
    let mut line = String::new();

    let corrupted = |frame: usize| ReadTrajError::CorruptedFrame(frame, name.to_owned());

    loop {
        let frame = offsets.len();
        let frame_start = position;

        // title
        line.clear();
        let read = buffer.read_line(&mut line).map_err(|_| corrupted(frame))?;
        if read == 0 {
            break;
        }
        position += read as u64;
        let blank_title = line.trim().is_empty();

        // number of atoms
        line.clear();
        let read = buffer.read_line(&mut line).map_err(|_| corrupted(frame))?;
        if read == 0 {
            // trailing empty lines are not a frame
            if blank_title {
                break;
            }
            return Err(corrupted(frame));
        }
        position += read as u64;

        let frame_atoms = line.trim().parse::<usize>().map_err(|_| corrupted(frame))?;
        match n_atoms {
            None => n_atoms = Some(frame_atoms),
            Some(n) if n != frame_atoms => {
                return Err(ReadTrajError::InconsistentFrames(name.to_owned()))
            }
            Some(_) => (),
        }

        // atoms and box
        for _ in 0..=frame_atoms {
            line.clear();
            let read = buffer.read_line(&mut line).map_err(|_| corrupted(frame))?;
            if read == 0 {
                return Err(corrupted(frame));
            }
            position += read as u64;
        }

        offsets.push(frame_start);
    }

    Ok((offsets, n_atoms.unwrap_or(0)))
}

impl TrajSource for GroTrajectory {
    fn name(&self) -> &str {
        &self.name
    }

    fn n_frames(&self) -> usize {
        self.offsets.len()
    }

    fn n_atoms(&self) -> usize {
        self.n_atoms
    }

    fn read_frame(
        &mut self,
        index: usize,
        coordinates: &mut [Vector3D],
    ) -> Result<(), ReadTrajError> {
        check_frame_index(&*self, index)?;
        if coordinates.len() != self.n_atoms {
            return Err(ReadTrajError::AtomsNumberMismatch(
                self.name.clone(),
                self.n_atoms,
                coordinates.len(),
            ));
        }

        self.buffer
            .seek(SeekFrom::Start(self.offsets[index]))
            .map_err(|_| ReadTrajError::FrameNotFound(index, self.name.clone()))?;

        // title and number of atoms have been validated when indexing
        self.next_line(index)?;
        self.next_line(index)?;

        for position in coordinates.iter_mut() {
            self.next_line(index)?;
            *position = line_as_position(&self.line)
                .ok_or_else(|| ReadTrajError::CorruptedFrame(index, self.name.clone()))?;
        }

        Ok(())
    }
}

/******************************/
/*         UNIT TESTS         */
/******************************/
