//! Outcome quality formulas.

use chrono::Duration;

use crate::selection::SelectionRange;

/// Maximum penalty subtracted for selecting past the target.
const MAX_OVERSHOOT_PENALTY: f64 = 0.3;
/// Penalty per target-length of overshoot.
const OVERSHOOT_PENALTY_RATE: f64 = 0.1;

/// Overlap-based score in `[0, 1]` for a final selection against the target span.
///
/// An exact hit scores 1.0 and a selection sharing no characters scores 0.0.
/// Otherwise the covered share of the target is reduced by a capped penalty
/// proportional to how far the selection runs past the target length.
pub fn accuracy_score(selected: SelectionRange, target: SelectionRange) -> f64 {
    if selected == target {
        return 1.0;
    }
    let overlap = selected.overlap(&target);
    if overlap == 0 || target.length == 0 {
        return 0.0;
    }
    let expected_len = target.length as f64;
    let coverage = overlap as f64 / expected_len;
    let extra = selected.length.saturating_sub(target.length) as f64;
    let penalty = (extra / expected_len * OVERSHOOT_PENALTY_RATE).min(MAX_OVERSHOOT_PENALTY);
    (coverage - penalty).clamp(0.0, 1.0)
}

/// Anchor travel beyond what the final selection itself needed.
pub fn excess_travel(adjustments: u32, net_travel: usize, final_length: usize) -> usize {
    if adjustments == 0 {
        return 0;
    }
    net_travel.saturating_sub(final_length)
}

/// Selected characters per second of attempt time.
pub fn selection_speed(final_length: usize, elapsed: Duration) -> f64 {
    let millis = elapsed.num_milliseconds();
    if millis <= 0 {
        return 0.0;
    }
    final_length as f64 / (millis as f64 / 1000.0)
}
