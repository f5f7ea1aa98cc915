use chrono::{DateTime, Duration, Utc};

/// Computes the effective session cutoff from the three time sources.
///
/// The deadline enforces both constraints at once: a student never gets more
/// than `duration_minutes` from their own start, and nobody answers past the
/// teacher's `hard_end`, regardless of when they started.
#[must_use]
pub fn compute_deadline(
    start: DateTime<Utc>,
    duration_minutes: u32,
    hard_end: DateTime<Utc>,
) -> DateTime<Utc> {
    let allotted_end = start + Duration::minutes(i64::from(duration_minutes));
    allotted_end.min(hard_end)
}

/// Time left until `deadline`, clamped at zero.
#[must_use]
pub fn remaining(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (deadline - now).max(Duration::zero())
}

/// Returns true once `now` has reached or passed `deadline`.
#[must_use]
pub fn is_expired(deadline: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= deadline
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
