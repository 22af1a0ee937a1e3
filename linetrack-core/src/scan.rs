//! Scan line buffers.
//!
//! Both buffers are plain `[u16; 128]` wrappers. A raw line is produced by the
//! sensor once per tick and consumed by the conditioner; the conditioned line
//! is the single buffer the locator and diagnostics read from.

use core::ops::{Deref, DerefMut};

/// Number of photosites on the sensor.
pub const SCAN_LEN: usize = 128;

/// Index of the optical center of the sensor.
pub const SCAN_CENTER: u8 = (SCAN_LEN / 2) as u8;

/// One unprocessed line of photosite samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawScanLine(pub [u16; SCAN_LEN]);

/// A smoothed scan line, ready for the locator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConditionedScanLine(pub [u16; SCAN_LEN]);

impl RawScanLine {
    /// A line with every sample at `value`.
    pub const fn filled(value: u16) -> Self {
        Self([value; SCAN_LEN])
    }
}

impl ConditionedScanLine {
    /// A line with every sample at `value`.
    pub const fn filled(value: u16) -> Self {
        Self([value; SCAN_LEN])
    }
}

impl Default for RawScanLine {
    fn default() -> Self {
        Self::filled(0)
    }
}

impl Default for ConditionedScanLine {
    fn default() -> Self {
        Self::filled(0)
    }
}

impl Deref for RawScanLine {
    type Target = [u16; SCAN_LEN];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for RawScanLine {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Deref for ConditionedScanLine {
    type Target = [u16; SCAN_LEN];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for ConditionedScanLine {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
