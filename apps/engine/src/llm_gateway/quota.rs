use chrono::NaiveDate;

/// Rolling daily request budget for the free-tier provider.
///
/// The counter resets lazily: every check compares the stored last-reset date
/// to "today" and zeroes the counter on change — no background timer. The
/// ledger is in-process only; it does not survive restarts and is not shared
/// across worker processes.
#[derive(Debug, Clone)]
pub struct QuotaLedger {
    limit: u32,
    used: u32,
    last_reset: NaiveDate,
}

impl QuotaLedger {
    pub fn new(limit: u32, today: NaiveDate) -> Self {
        Self {
            limit,
            used: 0,
            last_reset: today,
        }
    }

    fn roll(&mut self, today: NaiveDate) {
        if today != self.last_reset {
            self.used = 0;
            self.last_reset = today;
        }
    }

    /// True when at least one request remains in today's budget.
    pub fn has_budget(&mut self, today: NaiveDate) -> bool {
        self.roll(today);
        self.used < self.limit
    }

    /// Records one consumed request against today's budget.
    pub fn record(&mut self, today: NaiveDate) {
        self.roll(today);
        self.used += 1;
    }

    pub fn used(&self) -> u32 {
        self.used
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    #[test]
    fn test_budget_exhausts_at_limit() {
        let mut ledger = QuotaLedger::new(3, day(1));
        for _ in 0..3 {
            assert!(ledger.has_budget(day(1)));
            ledger.record(day(1));
        }
        assert!(!ledger.has_budget(day(1)));
        assert_eq!(ledger.used(), 3);
    }

    #[test]
    fn test_date_rollover_resets_counter() {
        let mut ledger = QuotaLedger::new(2, day(1));
        ledger.record(day(1));
        ledger.record(day(1));
        assert!(!ledger.has_budget(day(1)));

        // Next local day: the counter lazily resets to zero.
        assert!(ledger.has_budget(day(2)));
        assert_eq!(ledger.used(), 0);
    }

    #[test]
    fn test_zero_limit_never_has_budget() {
        let mut ledger = QuotaLedger::new(0, day(1));
        assert!(!ledger.has_budget(day(1)));
    }
}
