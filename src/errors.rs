// Released under MIT License.
// Copyright (c) 2023-2025 Ladislav Bartos

//! Implementation of errors that can be returned by the `vtraj_rs` library.

use std::path::Path;

use colored::{ColoredString, Colorize};
use thiserror::Error;

fn path_to_yellow(path: &Path) -> ColoredString {
    path.to_str().unwrap_or("<non-utf8 path>").yellow()
}

/// Errors that can occur when reading and parsing gro file.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseGroError {
    #[error("{} file '{}' was not found or could not be read", "error:".red().bold(), path_to_yellow(.0))]
    FileNotFound(Box<Path>),
    #[error("{} file '{}' ended unexpectedly", "error:".red().bold(), path_to_yellow(.0))]
    LineNotFound(Box<Path>),
    #[error("{} could not parse line '{}'", "error:".red().bold(), .0.yellow())]
    ParseLineErr(String),
    #[error("{} could not parse line '{}' as atom", "error:".red().bold(), .0.yellow())]
    ParseAtomLineErr(String),
    #[error("{} could not parse line '{}' as box dimensions", "error:".red().bold(), .0.yellow())]
    ParseBoxLineErr(String),
}

/// Errors that can occur when writing a gro file.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum WriteGroError {
    #[error("{} file '{}' could not be created", "error:".red().bold(), path_to_yellow(.0))]
    CouldNotCreate(Box<Path>),
    #[error("{} could not write line into file", "error:".red().bold())]
    CouldNotWrite,
    #[error("{} coordinates of some atoms are too large to fit the gro format", "error:".red().bold())]
    CoordinateTooLarge,
}

/// Errors that can occur when reading frames from a trajectory source.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReadTrajError {
    #[error("{} trajectory file '{}' was not found or could not be read", "error:".red().bold(), path_to_yellow(.0))]
    FileNotFound(Box<Path>),
    #[error("{} frame '{}' does not exist in trajectory '{}'", "error:".red().bold(), .0.to_string().yellow(), .1.yellow())]
    FrameNotFound(usize, String),
    #[error("{} frame '{}' of trajectory '{}' could not be parsed", "error:".red().bold(), .0.to_string().yellow(), .1.yellow())]
    CorruptedFrame(usize, String),
    #[error("{} number of atoms in trajectory '{}' ('{}') does not match the number of atoms in the model ('{}')", "error:".red().bold(), .0.yellow(), .1.to_string().yellow(), .2.to_string().yellow())]
    AtomsNumberMismatch(String, usize, usize),
    #[error("{} frames of in-memory trajectory '{}' do not have a consistent number of atoms", "error:".red().bold(), .0.yellow())]
    InconsistentFrames(String),
}

/// Errors that can occur when parsing or applying a selection query.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SelectError {
    #[error("{} query is empty", "error:".red().bold())]
    EmptyQuery,
    #[error("{} unbalanced parentheses in query '{}'", "error:".red().bold(), .0.yellow())]
    InvalidParentheses(String),
    #[error("{} unbalanced quotes in query '{}'", "error:".red().bold(), .0.yellow())]
    InvalidQuotes(String),
    #[error("{} invalid operator in query '{}'", "error:".red().bold(), .0.yellow())]
    InvalidOperator(String),
    #[error("{} missing argument for a binary operator in query '{}'", "error:".red().bold(), .0.yellow())]
    MissingArgument(String),
    #[error("{} missing argument for a keyword in query '{}'", "error:".red().bold(), .0.yellow())]
    EmptyArgument(String),
    #[error("{} could not parse numbers in query '{}'", "error:".red().bold(), .0.yellow())]
    InvalidNumber(String),
    #[error("{} invalid regular expression '{}'", "error:".red().bold(), .0.yellow())]
    InvalidRegex(String),
    #[error("{} parentheses or tokens are misplaced in query '{}'", "error:".red().bold(), .0.yellow())]
    InvalidTokenParentheses(String),
    #[error("{} unknown keyword '{}' in query '{}'", "error:".red().bold(), .0.yellow(), .1.yellow())]
    UnknownKeyword(String, String),
}

/// Errors that can occur when constructing, indexing or iterating trajectories.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TrajError {
    #[error("{} stride must be positive, not '{}'", "error:".red().bold(), .0.to_string().yellow())]
    InvalidStride(usize),
    #[error("{} slice step must not be zero", "error:".red().bold())]
    InvalidSliceStep,
    #[error("{} skipping '{}' frames with stride '{}' selects no frames from '{}' available frames", "error:".red().bold(), .skip.to_string().yellow(), .stride.to_string().yellow(), .n_frames.to_string().yellow())]
    InvalidRange {
        skip: usize,
        stride: usize,
        n_frames: usize,
    },
    #[error("{} explicit frame indices must be strictly increasing (index '{}' follows index '{}')", "error:".red().bold(), .1.to_string().yellow(), .0.to_string().yellow())]
    UnorderedIndices(usize, usize),
    #[error("{} explicit frame index list is empty", "error:".red().bold())]
    EmptyIndices,
    #[error("{} index '{}' is out of range for a trajectory with '{}' frames", "error:".red().bold(), .0.to_string().yellow(), .1.to_string().yellow())]
    IndexOutOfRange(isize, usize),
    #[error("{} trajectory index '{}' is out of range for a virtual trajectory with '{}' trajectories", "error:".red().bold(), .0.to_string().yellow(), .1.to_string().yellow())]
    TrajectoryOutOfRange(usize, usize),
    #[error("{} frame generated at load '{}' is stale (model is at load '{}')", "error:".red().bold(), .0.to_string().yellow(), .1.to_string().yellow())]
    StaleFrame(u64, u64),
    #[error("{}", .0)]
    ReadTraj(#[from] ReadTrajError),
    #[error("{}", .0)]
    Select(#[from] SelectError),
}

/// Errors that can occur when superposing structures or aligning trajectories.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AlignmentError {
    #[error("{} alignment selection '{}' has '{}' atoms in trajectory '{}' but '{}' atoms are expected", "error:".red().bold(), .selection.yellow(), .found.to_string().yellow(), .trajectory.yellow(), .expected.to_string().yellow())]
    InconsistentSelection {
        selection: String,
        trajectory: String,
        expected: usize,
        found: usize,
    },
    #[error("{} alignment selection '{}' matches no atoms in trajectory '{}'", "error:".red().bold(), .0.yellow(), .1.yellow())]
    EmptySelection(String, String),
    #[error("{} cannot superpose '{}' points onto '{}' points", "error:".red().bold(), .0.to_string().yellow(), .1.to_string().yellow())]
    InconsistentPoints(usize, usize),
    #[error("{} cannot superpose empty sets of points", "error:".red().bold())]
    NoPoints,
    #[error("{} ensemble to align contains no structures", "error:".red().bold())]
    EmptyEnsemble,
    #[error("{}", .0)]
    Traj(#[from] TrajError),
}

impl From<SelectError> for AlignmentError {
    fn from(e: SelectError) -> Self {
        AlignmentError::Traj(TrajError::Select(e))
    }
}

impl From<ReadTrajError> for AlignmentError {
    fn from(e: ReadTrajError) -> Self {
        AlignmentError::Traj(TrajError::ReadTraj(e))
    }
}

/// Errors that can occur when calculating ensemble properties.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EnsembleError {
    #[error("{} ensemble contains no frames", "error:".red().bold())]
    EmptyEnsemble,
    #[error("{} frame '{}' has '{}' atoms but '{}' atoms are expected", "error:".red().bold(), .0.to_string().yellow(), .1.to_string().yellow(), .2.to_string().yellow())]
    InconsistentAtoms(usize, usize, usize),
    #[error("{} matrices have incompatible dimensions ('{}' rows vs '{}' rows)", "error:".red().bold(), .0.to_string().yellow(), .1.to_string().yellow())]
    DimensionMismatch(usize, usize),
    #[error("{} requested number of modes ('{}') exceeds the number of available modes ('{}')", "error:".red().bold(), .0.to_string().yellow(), .1.to_string().yellow())]
    TooManyModes(usize, usize),
    #[error("{} singular value decomposition did not produce the singular vectors", "error:".red().bold())]
    SvdFailed,
    #[error("{}", .0)]
    Traj(#[from] TrajError),
    #[error("{}", .0)]
    Alignment(#[from] AlignmentError),
}

/// Errors that can occur when reading an ensemble configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{} could not open the configuration file '{}'", "error:".red().bold(), .0.yellow())]
    CouldNotOpenConfig(String),
    #[error("{} could not understand the contents of the configuration file '{}' ({})", "error:".red().bold(), .0.yellow(), .1)]
    CouldNotParseConfig(String, serde_yaml::Error),
    #[error("{} configuration contains no trajectories", "error:".red().bold())]
    NoTrajectories,
    #[error("{}", .0)]
    ParseGro(#[from] ParseGroError),
    #[error("{}", .0)]
    Traj(#[from] TrajError),
    #[error("{}", .0)]
    Select(#[from] SelectError),
}
