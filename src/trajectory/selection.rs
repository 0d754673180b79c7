// Released under MIT License.
// Copyright (c) 2023-2025 Ladislav Bartos

//! Frame selection policies and Python-like slices of trajectories.

use serde::Deserialize;

use crate::errors::TrajError;

/// Policy selecting frames of a trajectory.
///
/// Frames are selected either by skipping the first `skip` frames and then taking
/// every `stride`th frame, or by an explicit list of frame indices.
/// If explicit indices are provided, `skip` and `stride` are ignored.
///
/// ## Example
/// ```
/// # use vtraj_rs::prelude::*;
/// #
/// let selection = FrameSelection::default().with_skip(2).with_stride(3);
/// assert_eq!(selection.resolve(10, false).unwrap(), vec![2, 5, 8]);
///
/// let selection = FrameSelection::default().with_indices(vec![0, 4, 7]);
/// assert_eq!(selection.resolve(10, false).unwrap(), vec![0, 4, 7]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FrameSelection {
    skip: usize,
    stride: usize,
    indices: Option<Vec<usize>>,
}

impl Default for FrameSelection {
    fn default() -> Self {
        FrameSelection {
            skip: 0,
            stride: 1,
            indices: None,
        }
    }
}

impl FrameSelection {
    /// Skip the first `skip` frames.
    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    /// Select every `stride`th frame. Stride of 0 is rejected when the selection is resolved.
    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    /// Select exactly the frames with the given indices.
    pub fn with_indices(mut self, indices: Vec<usize>) -> Self {
        self.indices = Some(indices);
        self
    }

    pub fn get_skip(&self) -> usize {
        self.skip
    }

    pub fn get_stride(&self) -> usize {
        self.stride
    }

    pub fn get_indices(&self) -> Option<&[usize]> {
        self.indices.as_deref()
    }

    /// Calculate the indices of frames selected out of `n_frames` available frames.
    ///
    /// ## Returns
    /// - Strictly increasing list of selected frame indices.
    /// - `TrajError::InvalidStride` if the stride is 0 (and no explicit indices are given).
    /// - `TrajError::IndexOutOfRange` if an explicit index is not lower than `n_frames`.
    /// - `TrajError::UnorderedIndices` if the explicit indices are not strictly increasing.
    /// - `TrajError::EmptyIndices` or `TrajError::InvalidRange` if no frame is selected
    ///   and `allow_empty` is false.
    pub fn resolve(&self, n_frames: usize, allow_empty: bool) -> Result<Vec<usize>, TrajError> {
        if let Some(indices) = &self.indices {
            if indices.is_empty() && !allow_empty {
                return Err(TrajError::EmptyIndices);
            }

            for (i, &index) in indices.iter().enumerate() {
                if index >= n_frames {
                    return Err(TrajError::IndexOutOfRange(index as isize, n_frames));
                }

                if i > 0 && indices[i - 1] >= index {
                    return Err(TrajError::UnorderedIndices(indices[i - 1], index));
                }
            }

            return Ok(indices.clone());
        }

        if self.stride == 0 {
            return Err(TrajError::InvalidStride(self.stride));
        }

        let selected: Vec<usize> = (self.skip..n_frames).step_by(self.stride).collect();
        if selected.is_empty() && !allow_empty {
            return Err(TrajError::InvalidRange {
                skip: self.skip,
                stride: self.stride,
                n_frames,
            });
        }

        Ok(selected)
    }
}

/// Slice of a trajectory following the semantics of Python slices.
///
/// Negative `start` and `stop` are counted from the end of the trajectory,
/// out-of-range values are clamped and a negative `step` iterates backwards.
///
/// ## Example
/// ```
/// # use vtraj_rs::prelude::*;
/// #
/// // equivalent of `[::-2]`
/// let slice = FrameSlice::default().with_step(-2);
/// assert_eq!(slice.indices(5).unwrap(), vec![4, 2, 0]);
///
/// // equivalent of `[-3:]`
/// let slice = FrameSlice::new(Some(-3), None, None);
/// assert_eq!(slice.indices(5).unwrap(), vec![2, 3, 4]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameSlice {
    start: Option<isize>,
    stop: Option<isize>,
    step: Option<isize>,
}

impl FrameSlice {
    pub fn new(start: Option<isize>, stop: Option<isize>, step: Option<isize>) -> Self {
        FrameSlice { start, stop, step }
    }

    pub fn with_start(mut self, start: isize) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_stop(mut self, stop: isize) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn with_step(mut self, step: isize) -> Self {
        self.step = Some(step);
        self
    }

    /// Calculate the indices covered by the slice of a sequence of length `len`.
    ///
    /// ## Returns
    /// - Indices in the order in which they are visited by the slice.
    /// - `TrajError::InvalidSliceStep` if the step is 0.
    pub fn indices(&self, len: usize) -> Result<Vec<usize>, TrajError> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(TrajError::InvalidSliceStep);
        }

        let len = len as isize;
        let (lower, upper) = if step < 0 { (-1, len - 1) } else { (0, len) };

        let clamp = |value: Option<isize>, default: isize| match value {
            None => default,
            Some(v) if v < 0 => (v + len).max(lower),
            Some(v) => v.min(upper),
        };

        let (start, stop) = if step < 0 {
            (clamp(self.start, upper), clamp(self.stop, lower))
        } else {
            (clamp(self.start, lower), clamp(self.stop, upper))
        };

        let mut indices = Vec::new();
        let mut i = start;
        while (step > 0 && i < stop) || (step < 0 && i > stop) {
            indices.push(i as usize);
            i = match i.checked_add(step) {
                Some(next) => next,
                None => break,
            };
        }

        Ok(indices)
    }
}

/******************************/
/*         UNIT TESTS         */
/******************************/
