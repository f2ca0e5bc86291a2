use crate::error::MilestoneError;

/// Core of a verdict: where the value sits relative to the next round number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Milestone {
    pub current_value: i64,
    pub target_milestone: i64,
    pub needed: i64,
    pub actionable: bool,
}

/// Evaluate `current` against the next multiple of `step`.
///
/// The target is always strictly above `current`: an exact multiple is
/// measured against the following milestone, so `needed` lies in `1..=step`.
pub fn evaluate(current: i64, step: i64, within: i64) -> Result<Milestone, MilestoneError> {
    if current < 0 || step <= 0 {
        return Err(MilestoneError::InvalidInput { current, step });
    }

    let target_milestone = (current / step)
        .checked_add(1)
        .and_then(|n| n.checked_mul(step))
        .ok_or(MilestoneError::Overflow { current, step })?;
    let needed = target_milestone - current;

    Ok(Milestone {
        current_value: current,
        target_milestone,
        needed,
        actionable: needed <= within,
    })
}
