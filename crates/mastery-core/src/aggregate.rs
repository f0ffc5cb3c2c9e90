//! Reduction of a unit's task scores into a session total.

use mastery_store::ScoreSheet;

use crate::domain::TaskDescriptor;

/// Sum the recorded scores of `descriptors`, counting absent records as 0.
///
/// Only tasks named by `descriptors` contribute; extra entries in the sheet
/// are ignored. Pure and side-effect free.
pub fn aggregate(sheet: &ScoreSheet, descriptors: &[TaskDescriptor]) -> u32 {
    descriptors
        .iter()
        .map(|d| sheet.get(&d.id).unwrap_or(0))
        .fold(0u32, u32::saturating_add)
}
