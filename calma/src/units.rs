//!
//! # Length Units & Database-Grid Scaling
//!
//! Spatial data in a GDSII stream is denominated in integer counts of the
//! library's *database unit* - a physical length, typically one nanometer.
//! [Len] is the crate's physical-length quantity, and [DbUnit] performs the
//! conversions between [Len]s and the on-disk 32-bit integer grid.
//!

// Std-Lib Imports
use std::ops::{Div, Mul};

// Crates.io
use derive_more::{Add, AddAssign, Neg, Sub, SubAssign};
use serde::{Deserialize, Serialize};

// Local Imports
use crate::data::{GdsError, GdsResult};

/// Relative tolerance for snapping a measured database scale to a canonical unit.
const UNIT_SNAP_RTOL: f64 = 1e-9;

///
/// # Physical Length Quantity
///
/// Stored as an `f64` number of micrometers, the format's customary display
/// unit. Consumers which reject units altogether read the raw number via
/// [`Len::microns`]; everything else converts through the constructors.
///
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    PartialOrd,
    Serialize,
    Deserialize,
    Add,
    AddAssign,
    Sub,
    SubAssign,
    Neg,
)]
pub struct Len(f64);
impl Len {
    /// The zero-valued length
    pub const ZERO: Len = Len(0.0);
    /// Create a [Len] of `v` micrometers
    pub fn um(v: f64) -> Len {
        Len(v)
    }
    /// Create a [Len] of `v` nanometers
    pub fn nm(v: f64) -> Len {
        Len(v * 1e-3)
    }
    /// Create a [Len] of `v` picometers
    pub fn pm(v: f64) -> Len {
        Len(v * 1e-6)
    }
    /// Create a [Len] of `v` meters
    pub fn meters(v: f64) -> Len {
        Len(v * 1e6)
    }
    /// This length as a plain number of micrometers
    pub fn microns(self) -> f64 {
        self.0
    }
    /// This length as a number of meters
    pub fn in_meters(self) -> f64 {
        self.0 * 1e-6
    }
}
impl Mul<f64> for Len {
    type Output = Len;
    fn mul(self, rhs: f64) -> Len {
        Len(self.0 * rhs)
    }
}
impl Mul<Len> for f64 {
    type Output = Len;
    fn mul(self, rhs: Len) -> Len {
        Len(self * rhs.0)
    }
}
impl Div<f64> for Len {
    type Output = Len;
    fn div(self, rhs: f64) -> Len {
        Len(self.0 / rhs)
    }
}
/// The ratio between two lengths is a plain number.
impl Div<Len> for Len {
    type Output = f64;
    fn div(self, rhs: Len) -> f64 {
        self.0 / rhs.0
    }
}

///
/// # Database Unit
///
/// The physical length of one step of the on-disk integer grid.
/// Defaults to one nanometer.
///
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DbUnit(Len);
impl DbUnit {
    /// Create a [DbUnit] with grid step `quantum`
    pub fn new(quantum: Len) -> DbUnit {
        DbUnit(quantum)
    }
    /// The physical length of one grid step
    pub fn quantum(&self) -> Len {
        self.0
    }
    /// Interpret a database scale measured from a `UNITS` record, in meters.
    /// Snaps to 1 um, 1 nm, or 1 pm when within floating-point tolerance;
    /// any other measurement becomes an anonymous grid of exactly that step.
    pub fn from_meters(m: f64) -> DbUnit {
        for (canonical, quantum) in [
            (1e-6, Len::um(1.0)),
            (1e-9, Len::nm(1.0)),
            (1e-12, Len::pm(1.0)),
        ] {
            if (m - canonical).abs() <= canonical * UNIT_SNAP_RTOL {
                return DbUnit(quantum);
            }
        }
        DbUnit(Len::meters(m))
    }
    /// Convert length `x` onto the integer grid: `round(x / quantum)`,
    /// checked to fit a 32-bit signed coordinate.
    pub fn encode(&self, x: Len) -> GdsResult<i32> {
        let n = (x / self.0).round();
        if n < i32::MIN as f64 || n > i32::MAX as f64 {
            return Err(GdsError::Encode(format!(
                "coordinate {} um exceeds the 32-bit database grid of {} um steps",
                x.microns(),
                self.0.microns()
            )));
        }
        Ok(n as i32)
    }
    /// The physical length of `n` grid steps.
    pub fn decode(&self, n: i32) -> Len {
        self.0 * n as f64
    }
}
impl Default for DbUnit {
    /// Default database grid: one nanometer
    fn default() -> DbUnit {
        DbUnit(Len::nm(1.0))
    }
}
