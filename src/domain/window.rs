//! Shared time-window and money utilities
//!
//! All timestamps are normalized to UTC before comparison or bucketing. A
//! month bucket is the half-open interval [first-of-month 00:00 UTC,
//! first-of-next-month 00:00 UTC); a day bucket is the UTC calendar date.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::DomainError;

/// Fractional digits carried by every monetary amount.
pub const MONEY_SCALE: u32 = 6;

/// Round a monetary amount to 6 fractional digits, half-up.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Normalize any fixed-offset timestamp to UTC.
pub fn to_utc<Tz: TimeZone>(value: DateTime<Tz>) -> DateTime<Utc> {
    value.with_timezone(&Utc)
}

/// Naive timestamps are treated as UTC.
pub fn naive_as_utc(value: NaiveDateTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&value)
}

/// A validated half-open time window [from, to).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    /// Build a window, rejecting `to <= from`.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, DomainError> {
        if to <= from {
            return Err(DomainError::validation("'to' must be after 'from'"));
        }
        Ok(Self { from, to })
    }

    /// Build a window from timestamps in arbitrary offsets.
    pub fn normalize<Tz: TimeZone>(
        from: DateTime<Tz>,
        to: DateTime<Tz>,
    ) -> Result<Self, DomainError> {
        Self::new(to_utc(from), to_utc(to))
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.from && instant < self.to
    }
}

/// 00:00 UTC on the given calendar date.
pub fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN))
}

/// Half-open bounds of the UTC calendar day containing nothing but `day`.
pub fn day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    (start_of_day(day), start_of_day(day + Duration::days(1)))
}

/// Half-open bounds of the UTC month containing `reference`.
pub fn month_bounds(reference: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let date = reference.date_naive();
    // Day 1 of an existing month always exists.
    let start = NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date);
    let end = if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    }
    .unwrap_or(date);
    (start_of_day(start), start_of_day(end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_money_half_up() {
        assert_eq!(round_money(dec!(0.0000015)), dec!(0.000002));
        assert_eq!(round_money(dec!(0.0000014)), dec!(0.000001));
        assert_eq!(round_money(dec!(1.2345675)), dec!(1.234568));
        assert_eq!(round_money(dec!(0.00075)), dec!(0.00075));
    }

    #[test]
    fn test_window_rejects_empty_and_inverted() {
        let at = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        assert!(matches!(
            TimeWindow::new(at, at),
            Err(DomainError::Validation { .. })
        ));
        assert!(matches!(
            TimeWindow::new(at, at - Duration::hours(1)),
            Err(DomainError::Validation { .. })
        ));
        assert!(TimeWindow::new(at, at + Duration::hours(1)).is_ok());
    }

    #[test]
    fn test_window_normalizes_offsets() {
        // 14:00+02:00 == 12:00Z, so this window is empty after normalization.
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let from = offset.with_ymd_and_hms(2024, 3, 10, 14, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        assert!(TimeWindow::normalize(from, to.with_timezone(&offset)).is_err());
    }

    #[test]
    fn test_naive_treated_as_utc() {
        let naive = NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let utc = naive_as_utc(naive);
        assert_eq!(utc, Utc.with_ymd_and_hms(2024, 3, 10, 9, 30, 0).unwrap());
    }

    #[test]
    fn test_month_bounds_mid_year() {
        let reference = Utc.with_ymd_and_hms(2024, 3, 15, 18, 45, 0).unwrap();
        let (start, end) = month_bounds(reference);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_month_bounds_december_rolls_year() {
        let reference = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        let (start, end) = month_bounds(reference);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_day_bounds() {
        let day = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let (start, end) = day_bounds(day);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }
}
