//! Daily check-in streak.

use chrono::NaiveDate;

use crate::budget::AppState;

/// Streak after checking in on `today`.
pub fn next_streak(last: Option<NaiveDate>, streak: u32, today: NaiveDate) -> u32 {
    match last {
        Some(d) if d == today => streak,
        Some(d) if d.succ_opt() == Some(today) => streak.saturating_add(1),
        _ => 1,
    }
}

impl AppState {
    /// Record a check-in. Returns false when today was already recorded.
    pub fn check_in(&mut self, today: NaiveDate) -> bool {
        if self.last_check_in == Some(today) {
            return false;
        }
        self.streak = next_streak(self.last_check_in, self.streak, today);
        self.last_check_in = Some(today);
        true
    }
}
