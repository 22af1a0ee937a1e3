//! 5-tap weighted smoothing of a raw scan line.

use crate::scan::{ConditionedScanLine, RawScanLine, SCAN_LEN};

/// Center-heaviest kernel over `i-2..=i+2`.
const WEIGHTS: [u32; 5] = [1, 2, 3, 2, 1];

/// Smooth `raw` into `out`.
///
/// Near the ends of the line the taps that would fall outside `0..128` are
/// dropped and the sum is divided by the weights actually used.
pub fn smooth_into(raw: &RawScanLine, out: &mut ConditionedScanLine) {
    for (i, slot) in out.iter_mut().enumerate() {
        let mut sum = 0u32;
        let mut weight_sum = 0u32;

        for (tap, &weight) in WEIGHTS.iter().enumerate() {
            let Some(j) = (i + tap).checked_sub(2) else {
                continue;
            };
            if j >= SCAN_LEN {
                continue;
            }
            sum += u32::from(raw[j]) * weight;
            weight_sum += weight;
        }

        *slot = (sum / weight_sum) as u16;
    }
}

/// Smooth `raw` into a fresh buffer.
pub fn smooth(raw: &RawScanLine) -> ConditionedScanLine {
    let mut out = ConditionedScanLine::default();
    smooth_into(raw, &mut out);
    out
}
