// Released under MIT License.
// Copyright (c) 2023-2025 Ladislav Bartos

//! Implementation of ensemble configuration files.

use std::fs::read_to_string;
use std::path::Path;

use serde::Deserialize;

use crate::auxiliary::{
    DEFAULT_ALIGNMENT_SELECTION, DEFAULT_ALIGNMENT_THRESHOLD, DEFAULT_MAX_ITERATIONS,
};
use crate::errors::ConfigError;
use crate::structures::{model::Model, structure::Structure};
use crate::trajectory::aligned::{AlignOptions, AlignedVirtualTrajectory};
use crate::trajectory::selection::FrameSelection;
use crate::trajectory::single::{SingleTrajectory, TrajectoryOptions};
use crate::trajectory::virtual_traj::VirtualTrajectory;

/// Description of an ensemble of trajectories read from a YAML file.
///
/// ## Example of a configuration file
/// ```yaml
/// structure: system.gro
/// trajectories:
///   - path: run1.gro
///     subset: "@protein"
///     frames:
///       skip: 10
///   - path: run2.gro
///     frames:
///       indices: [0, 5, 12]
/// frames:
///   stride: 2
/// alignment:
///   selection: "@backbone"
///   reference:
///     path: crystal.gro
///   threshold: 0.000001
///   max_iterations: 500
/// ```
///
/// Only `structure` and `trajectories` are required.
/// Paths are used exactly as written, i.e. relative paths are relative to the working directory.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnsembleConfig {
    /// Gro file defining the atoms of all trajectories.
    structure: String,
    /// Trajectories forming the ensemble, in order.
    trajectories: Vec<TrajectoryEntry>,
    /// Frame selection applied to the concatenated trajectories.
    #[serde(default)]
    frames: FrameSelection,
    /// Alignment of the frames. If not provided, default alignment is used by `build_aligned`.
    #[serde(default)]
    alignment: Option<AlignmentConfig>,
}

/// Single trajectory of an ensemble.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrajectoryEntry {
    path: String,
    #[serde(default)]
    subset: Option<String>,
    #[serde(default)]
    frames: FrameSelection,
}

/// Alignment settings of an ensemble.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlignmentConfig {
    #[serde(default = "default_selection")]
    selection: String,
    #[serde(default)]
    reference: Option<ReferenceConfig>,
    #[serde(default = "default_threshold")]
    threshold: f64,
    #[serde(default = "default_max_iterations")]
    max_iterations: usize,
}

/// Reference structure for the alignment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceConfig {
    /// Gro file containing the reference structure.
    path: String,
    /// Atoms of the reference structure to superpose onto.
    /// If not provided, the alignment selection is used.
    #[serde(default)]
    selection: Option<String>,
}

fn default_selection() -> String {
    DEFAULT_ALIGNMENT_SELECTION.to_owned()
}

fn default_threshold() -> f64 {
    DEFAULT_ALIGNMENT_THRESHOLD
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        AlignmentConfig {
            selection: default_selection(),
            reference: None,
            threshold: default_threshold(),
            max_iterations: default_max_iterations(),
        }
    }
}

impl TrajectoryEntry {
    pub fn get_path(&self) -> &str {
        &self.path
    }

    pub fn get_subset(&self) -> Option<&str> {
        self.subset.as_deref()
    }

    pub fn get_frames(&self) -> &FrameSelection {
        &self.frames
    }

    fn options(&self) -> TrajectoryOptions {
        let options = TrajectoryOptions::default().with_frames(self.frames.clone());
        match &self.subset {
            Some(query) => options.with_subset(query),
            None => options,
        }
    }
}

impl AlignmentConfig {
    pub fn get_selection(&self) -> &str {
        &self.selection
    }

    pub fn get_reference(&self) -> Option<&ReferenceConfig> {
        self.reference.as_ref()
    }

    pub fn get_threshold(&self) -> f64 {
        self.threshold
    }

    pub fn get_max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Convert the settings into alignment options, reading the reference structure if requested.
    fn to_options(&self) -> Result<AlignOptions, ConfigError> {
        let options = AlignOptions::default()
            .with_selection(&self.selection)
            .with_threshold(self.threshold)
            .with_max_iterations(self.max_iterations);

        match &self.reference {
            Some(reference) => {
                let query = reference.selection.as_deref().unwrap_or(&self.selection);
                let structure = Structure::from_gro(&reference.path)?.select(query)?;
                Ok(options.with_reference(structure))
            }
            None => Ok(options),
        }
    }
}

impl ReferenceConfig {
    pub fn get_path(&self) -> &str {
        &self.path
    }

    pub fn get_selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }
}

impl EnsembleConfig {
    /// Read the configuration from a YAML file.
    ///
    /// ## Returns
    /// - `EnsembleConfig` if successful.
    /// - `ConfigError::CouldNotOpenConfig` if the file could not be read.
    /// - `ConfigError::CouldNotParseConfig` if the file is not a valid configuration.
    /// - `ConfigError::NoTrajectories` if the configuration lists no trajectories.
    ///
    /// ## Notes
    /// - Files referenced by the configuration are not opened until the ensemble is built.
    pub fn from_file(path: impl AsRef<Path>) -> Result<EnsembleConfig, ConfigError> {
        let printable = path.as_ref().to_string_lossy().into_owned();

        let string =
            read_to_string(&path).map_err(|_| ConfigError::CouldNotOpenConfig(printable.clone()))?;
        let config: EnsembleConfig = serde_yaml::from_str(&string)
            .map_err(|e| ConfigError::CouldNotParseConfig(printable.clone(), e))?;

        config.validate()?;

        log::info!(
            "Read ensemble configuration '{}' with {} trajectories.",
            printable,
            config.trajectories.len()
        );

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.trajectories.is_empty() {
            return Err(ConfigError::NoTrajectories);
        }

        Ok(())
    }

    pub fn get_structure(&self) -> &str {
        &self.structure
    }

    pub fn get_trajectories(&self) -> &[TrajectoryEntry] {
        &self.trajectories
    }

    pub fn get_frames(&self) -> &FrameSelection {
        &self.frames
    }

    pub fn get_alignment(&self) -> Option<&AlignmentConfig> {
        self.alignment.as_ref()
    }

    /// Open all trajectories of the ensemble and concatenate them into a virtual trajectory.
    /// All trajectories share a single model created from the structure file.
    ///
    /// ## Returns
    /// - `VirtualTrajectory` if successful.
    /// - `ConfigError::ParseGro` if the structure file could not be read.
    /// - `ConfigError::Traj` if any of the trajectories could not be opened.
    pub fn build_virtual(&self) -> Result<VirtualTrajectory, ConfigError> {
        let model = Model::from_gro(&self.structure)?.into_shared();

        let trajectories = self
            .trajectories
            .iter()
            .map(|entry| SingleTrajectory::open_gro(&entry.path, model.clone(), entry.options()))
            .collect::<Result<Vec<SingleTrajectory>, _>>()?;

        Ok(VirtualTrajectory::new(trajectories, self.frames.clone()))
    }

    /// Open all trajectories of the ensemble and construct an aligned virtual trajectory.
    /// The alignment itself is not calculated until the frames are accessed.
    ///
    /// ## Returns
    /// - `AlignedVirtualTrajectory` if successful.
    /// - `ConfigError` if any of the files could not be read or a selection query is invalid.
    pub fn build_aligned(&self) -> Result<AlignedVirtualTrajectory, ConfigError> {
        let options = match &self.alignment {
            Some(alignment) => alignment.to_options()?,
            None => AlignmentConfig::default().to_options()?,
        };

        Ok(AlignedVirtualTrajectory::from_virtual(
            self.build_virtual()?,
            options,
        ))
    }
}

/******************************/
/*         UNIT TESTS         */
/******************************/
