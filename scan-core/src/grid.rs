//! Boustrophedon target grids for planar scans.
//!
//! Targets are integer millimetre positions in the arm base frame: rows run
//! along x at fixed height z, from `top` down to `bottom`, at constant
//! stand-off `y`. Consecutive rows alternate direction so the arm never
//! travels back across the scene.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridPattern {
    /// Stop at every grid node
    #[default]
    Stepped,
    /// Only the two ends of each row; the arm sweeps between them
    Sweep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridScan {
    pub width: i64,
    pub bottom: i64,
    pub top: i64,
    pub x_step: i64,
    pub z_step: i64,
    pub y: i64,
    pub pattern: GridPattern,
}

impl Default for GridScan {
    fn default() -> Self {
        Self {
            width: 1000,
            bottom: 200,
            top: 700,
            x_step: 10,
            z_step: 10,
            y: 400,
            pattern: GridPattern::Stepped,
        }
    }
}

impl GridScan {
    pub fn new(
        width: i64,
        bottom: i64,
        top: i64,
        x_step: i64,
        z_step: i64,
        y: i64,
        pattern: GridPattern,
    ) -> Result<Self> {
        let grid = Self {
            width,
            bottom,
            top,
            x_step,
            z_step,
            y,
            pattern,
        };
        grid.validate()?;
        Ok(grid)
    }

    pub fn validate(&self) -> Result<()> {
        if self.x_step <= 0 || self.z_step <= 0 {
            return Err(ScanError::InvalidInput(format!(
                "grid steps must be positive, got x={} z={}",
                self.x_step, self.z_step
            )));
        }
        if self.width < 0 {
            return Err(ScanError::InvalidInput(format!(
                "grid width must not be negative, got {}",
                self.width
            )));
        }
        if self.bottom > self.top {
            return Err(ScanError::InvalidInput(format!(
                "grid bottom {} is above top {}",
                self.bottom, self.top
            )));
        }
        Ok(())
    }

    /// Left edge, rounded toward negative infinity
    fn left(&self) -> i64 {
        (-self.width).div_euclid(2)
    }

    fn right(&self) -> i64 {
        self.width.div_euclid(2)
    }

    /// Row heights from top to bottom, both inclusive when on-step
    fn rows(&self) -> impl Iterator<Item = i64> {
        let (top, stop, step) = (self.top, self.bottom - self.z_step, self.z_step);
        (0..)
            .map(move |k| top - k * step)
            .take_while(move |z| *z > stop)
    }

    fn columns(&self, left_to_right: bool) -> Vec<i64> {
        let (left, right, step) = (self.left(), self.right(), self.x_step);
        match (self.pattern, left_to_right) {
            (GridPattern::Sweep, true) => vec![left, right],
            (GridPattern::Sweep, false) => vec![right, left],
            (GridPattern::Stepped, true) => (0..)
                .map(|k| left + k * step)
                .take_while(|x| *x < right + step)
                .collect(),
            (GridPattern::Stepped, false) => (0..)
                .map(|k| right - k * step)
                .take_while(|x| *x > left - step)
                .collect(),
        }
    }

    /// Target positions in millimetres, in visiting order.
    ///
    /// Fields are public and may be filled in directly or by a config file,
    /// so the grid is checked again before any target is produced.
    pub fn targets(&self) -> Result<Vec<Vector3<f64>>> {
        self.validate()?;
        let y = self.y as f64;
        Ok(self
            .rows()
            .enumerate()
            .flat_map(|(row, z)| {
                self.columns(row % 2 == 0)
                    .into_iter()
                    .map(move |x| Vector3::new(x as f64, y, z as f64))
            })
            .collect())
    }

    /// Number of targets [`GridScan::targets`] yields
    pub fn target_count(&self) -> Result<usize> {
        Ok(self.targets()?.len())
    }
}
