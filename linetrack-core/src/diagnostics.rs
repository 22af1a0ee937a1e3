//! Observational renderers for the display and the serial console.
//!
//! Nothing here feeds back into the control loop.

use core::fmt;

use crate::exposure::ExposureState;
use crate::locator::LineLocation;
use crate::scan::{ConditionedScanLine, SCAN_LEN};

/// Rows on the 128x32 display.
pub const IMAGE_ROWS: u8 = 32;

/// Characters per waveform row.
const WAVEFORM_COLUMNS: usize = 32;

/// Samples per row in the report's data dump.
const DATA_COLUMNS: usize = 8;

/// One row index per column, for plotting the line on a 32-row display.
pub fn column_image(line: &ConditionedScanLine) -> [u8; SCAN_LEN] {
    let mut image = [0u8; SCAN_LEN];
    for (px, &value) in image.iter_mut().zip(line.iter()) {
        *px = if value > 255 { IMAGE_ROWS - 1 } else { (value >> 3) as u8 };
    }
    image
}

/// Text plot of the thresholded line with the detection marked.
///
/// `M` is the median, `|` an edge, `_` a dark pixel and `*` a bright one.
pub struct Waveform<'a> {
    pub line: &'a ConditionedScanLine,
    pub location: &'a LineLocation,
}

impl Waveform<'_> {
    fn glyph(&self, i: usize) -> char {
        let loc = self.location;
        if i == usize::from(loc.median) {
            'M'
        } else if i == usize::from(loc.left_edge) || i == usize::from(loc.right_edge) {
            '|'
        } else if self.line[i] < loc.threshold {
            '_'
        } else {
            '*'
        }
    }
}

impl fmt::Display for Waveform<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..SCAN_LEN {
            write!(f, "{}", self.glyph(i))?;
            if (i + 1) % WAVEFORM_COLUMNS == 0 {
                write!(f, "\r\n")?;
            }
        }
        Ok(())
    }
}

/// Full text report of one frame.
pub struct Report<'a> {
    pub line: &'a ConditionedScanLine,
    pub location: &'a LineLocation,
    pub exposure: &'a ExposureState,
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let loc = self.location;
        write!(f, "\r\nDetailed CCD Analysis\r\n")?;
        write!(f, "********************************\r\n")?;
        write!(f, "Basic Info:\r\n")?;
        write!(f, "Median: {}  Width: {}\r\n", loc.median, loc.width)?;
        write!(
            f,
            "Threshold: {}  Max: {}  Min: {}\r\n",
            loc.threshold, loc.max_value, loc.min_value
        )?;
        write!(
            f,
            "Exposure: {}  Stable: {}\r\n",
            self.exposure.exposure_time, self.exposure.stable_count
        )?;

        write!(f, "\r\nSignal Waveform:\r\n")?;
        write!(f, "{}", Waveform { line: self.line, location: loc })?;

        write!(f, "\r\nProcessed Data:\r\n")?;
        for (i, value) in self.line.iter().enumerate() {
            if i % DATA_COLUMNS == 0 {
                write!(f, "\r\n")?;
            }
            write!(f, "[{}]  ", value)?;
        }
        write!(f, "\r\n")
    }
}
