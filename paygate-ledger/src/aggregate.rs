use chrono::{DateTime, Datelike, Utc};

use paygate_common::requests::{StatsBucket, StatsGrain};

/// Number of years covered by a yearly series, ending at the requested year.
pub const YEAR_WINDOW: i32 = 5;

/// Pre-filled zero series for the grain: 12 months of `year`, or the
/// five-year window ending at `year`.
pub fn zero_series(grain: StatsGrain, year: i32) -> Vec<StatsBucket> {
    match grain {
        StatsGrain::Month => (1..=12)
            .map(|month| StatsBucket::zero(format!("{year}-{month:02}")))
            .collect(),
        StatsGrain::Year => (year - (YEAR_WINDOW - 1)..=year)
            .map(|y| StatsBucket::zero(y.to_string()))
            .collect(),
    }
}

/// Index of `at` inside the series for (`grain`, `year`), if covered.
pub fn bucket_index(grain: StatsGrain, year: i32, at: DateTime<Utc>) -> Option<usize> {
    match grain {
        StatsGrain::Month => {
            (at.year() == year).then(|| (at.month() as usize) - 1)
        }
        StatsGrain::Year => {
            let first = year - (YEAR_WINDOW - 1);
            (at.year() >= first && at.year() <= year).then(|| (at.year() - first) as usize)
        }
    }
}

/// Folds `(occurred_at, amount)` pairs into a dense series.
pub fn dense_series<I>(grain: StatsGrain, year: i32, rows: I) -> Vec<StatsBucket>
where
    I: IntoIterator<Item = (DateTime<Utc>, i64)>,
{
    let mut series = zero_series(grain, year);
    for (at, amount) in rows {
        if let Some(idx) = bucket_index(grain, year, at) {
            series[idx].total_amount += amount;
            series[idx].count += 1;
        }
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(year: i32, month: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_month_series_is_always_twelve_entries() {
        let series = dense_series(StatsGrain::Month, 2024, vec![(at(2024, 3), 100)]);
        assert_eq!(series.len(), 12);
        assert_eq!(series[0].period, "2024-01");
        assert_eq!(series[2].total_amount, 100);
        assert_eq!(series[2].count, 1);
        assert_eq!(series[11].total_amount, 0);
    }

    #[test]
    fn test_rows_outside_the_year_are_ignored() {
        let series = dense_series(StatsGrain::Month, 2024, vec![(at(2023, 3), 100)]);
        assert!(series.iter().all(|b| b.total_amount == 0 && b.count == 0));
    }

    #[test]
    fn test_year_series_covers_five_year_window() {
        let series = dense_series(
            StatsGrain::Year,
            2024,
            vec![(at(2020, 1), 50), (at(2024, 6), 70), (at(2019, 1), 999)],
        );
        assert_eq!(series.len(), 5);
        assert_eq!(series[0].period, "2020");
        assert_eq!(series[0].total_amount, 50);
        assert_eq!(series[4].total_amount, 70);
    }
}
