//! Resolution pyramid generation.
//!
//! Level `k + 1` is always derived from level `k`, so levels are produced
//! strictly in order by a single accumulator. Only the most recent level is
//! retained between steps.

use ndarray::{s, ArcArray, Array5, ArrayView5, Ix5};

use crate::error::{Error, Result};
use crate::rescale::rescale;
use crate::voxel::Voxel;

/// Per-axis factors for one pyramid step: T and C untouched, Z-Y-X halved.
pub const HALF_ZYX: [f64; 5] = [1.0, 1.0, 0.5, 0.5, 0.5];

/// How level `k + 1` is derived from level `k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Downsample {
    /// Keep every other voxel along Z, Y and X starting at index 0.
    #[default]
    Stride,
    /// Gaussian anti-aliasing followed by linear interpolation at half size.
    Rescale,
}

impl Downsample {
    pub fn from_proper_flag(proper_downsample: bool) -> Self {
        if proper_downsample {
            Self::Rescale
        } else {
            Self::Stride
        }
    }

    /// One pyramid step. T and C lengths are never changed.
    ///
    /// Striding maps a length `n` to `ceil(n / 2)`, rescaling to
    /// `round_half_even(n / 2)`; both keep a length of 1 at 1.
    pub fn apply<T: Voxel>(self, level: ArrayView5<'_, T>) -> Array5<T> {
        match self {
            Self::Stride => level.slice(s![.., .., ..;2, ..;2, ..;2]).to_owned(),
            Self::Rescale => rescale(level, &HALF_ZYX, true),
        }
    }
}

/// A single resolution level in T-C-Z-Y-X order.
#[derive(Debug, Clone)]
pub struct Level<T> {
    pub index: usize,
    pub data: ArcArray<T, Ix5>,
}

impl<T> Level<T> {
    /// Store name of the level within the dataset.
    pub fn name(&self) -> String {
        self.index.to_string()
    }
}

/// Lazily yields levels `0..levels` from a canonical T-C-Z-Y-X stack.
///
/// Level 0 shares the canonical buffer. The iterator is consumed by a single
/// pass; build a new one to regenerate.
#[derive(Debug)]
pub struct Pyramid<T> {
    current: ArcArray<T, Ix5>,
    next: usize,
    levels: usize,
    method: Downsample,
}

impl<T: Voxel> Pyramid<T> {
    pub fn new(canonical: ArcArray<T, Ix5>, levels: usize, method: Downsample) -> Result<Self> {
        if levels < 1 {
            return Err(Error::invalid_argument(format!(
                "levels must be at least 1, got {levels}"
            )));
        }
        Ok(Self {
            current: canonical,
            next: 0,
            levels,
            method,
        })
    }

    pub fn method(&self) -> Downsample {
        self.method
    }
}

impl<T: Voxel> Iterator for Pyramid<T> {
    type Item = Level<T>;

    fn next(&mut self) -> Option<Level<T>> {
        if self.next >= self.levels {
            return None;
        }
        if self.next > 0 {
            self.current = self.method.apply(self.current.view()).into_shared();
        }
        let level = Level {
            index: self.next,
            data: self.current.clone(),
        };
        self.next += 1;
        Some(level)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.levels - self.next;
        (remaining, Some(remaining))
    }
}

impl<T: Voxel> ExactSizeIterator for Pyramid<T> {}
