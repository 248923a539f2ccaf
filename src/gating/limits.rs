use crate::store::DailyLimitStatus;
use super::status::GapInfo;

/// How many cards the user can get through right now.
///
/// Starts at the queue length and is clamped by whichever gate leaves less
/// room past `current_index`. Never exceeds `total`.
pub fn effective_total(
    total: usize,
    gap: Option<&GapInfo>,
    daily: Option<&DailyLimitStatus>,
    current_index: usize,
) -> usize {
    let mut effective = total;

    if let Some(gap) = gap.filter(|g| g.threshold > 0) {
        let room = gap.threshold.saturating_sub(gap.unanswered) as usize;
        effective = effective.min(current_index + room);
    }

    if let Some(daily) = daily.filter(|d| d.limit_value > 0 && !d.is_blocked) {
        effective = effective.min(current_index + daily.remaining as usize);
    }

    effective
}

impl DailyLimitStatus {
    /// Local bookkeeping for one accepted response, applied before the
    /// server's numbers come back. No-op when the limit is off.
    pub fn record_response(&mut self) {
        if self.limit_value == 0 {
            return;
        }
        self.responses_today += 1;
        self.remaining = self.remaining.saturating_sub(1);
        self.is_blocked = self.responses_today >= self.limit_value;
    }
}
