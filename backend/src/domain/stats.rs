//! Dashboard aggregation primitives.
//!
//! Growth figures compare a current 7-day window against the previous
//! 7-day window. All counts are derived from the source relations; nothing
//! here reads a stored counter.

use chrono::{DateTime, Utc};

use super::newsletter::Newsletter;

/// Number of daily buckets in the engagement series.
pub const ENGAGEMENT_DAYS: usize = 7;

/// Percentage change between two window counts, rounded to one decimal.
///
/// An empty previous window yields 0.0 when the current window is also
/// empty and 100.0 otherwise, so the figure is always defined.
///
/// # Examples
/// ```
/// use newsecho_backend::domain::growth_percent;
///
/// assert_eq!(growth_percent(0, 0), 0.0);
/// assert_eq!(growth_percent(0, 5), 100.0);
/// assert_eq!(growth_percent(8, 12), 50.0);
/// ```
pub fn growth_percent(previous: u64, current: u64) -> f64 {
    if previous == 0 {
        return if current == 0 { 0.0 } else { 100.0 };
    }
    #[expect(
        clippy::cast_precision_loss,
        reason = "window counts are far below f64's integer range"
    )]
    let ratio = (current as f64 - previous as f64) / previous as f64;
    round_one_decimal(ratio * 100.0)
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Reply counts bucketed per day over the trailing week, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngagementSeries {
    buckets: [u64; ENGAGEMENT_DAYS],
}

impl EngagementSeries {
    /// Bucket reply timestamps by calendar day relative to `now`.
    ///
    /// Timestamps older than the window or in the future are ignored.
    pub fn from_timestamps(now: DateTime<Utc>, timestamps: &[DateTime<Utc>]) -> Self {
        let mut buckets = [0u64; ENGAGEMENT_DAYS];
        let today = now.date_naive();
        for ts in timestamps {
            let days_ago = (today - ts.date_naive()).num_days();
            if !(0..ENGAGEMENT_DAYS as i64).contains(&days_ago) {
                continue;
            }
            #[expect(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                reason = "days_ago is checked to lie within 0..7"
            )]
            let index = ENGAGEMENT_DAYS - 1 - days_ago as usize;
            if let Some(bucket) = buckets.get_mut(index) {
                *bucket += 1;
            }
        }
        Self { buckets }
    }

    /// Daily counts, oldest first.
    pub const fn buckets(&self) -> &[u64; ENGAGEMENT_DAYS] {
        &self.buckets
    }

    /// Growth comparing the first three days of the window against the
    /// last three.
    pub fn growth(&self) -> f64 {
        let early: u64 = self.buckets.iter().take(3).sum();
        let recent: u64 = self.buckets.iter().skip(4).sum();
        growth_percent(early, recent)
    }
}

/// Everything the admin dashboard renders in one fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSnapshot {
    /// Total newsletters, drafts included.
    pub total_newsletters: u64,
    /// Newsletter creations: current vs previous 7-day window.
    pub newsletter_growth: f64,
    /// Accounts with the subscriber role that are not disabled.
    pub active_subscribers: u64,
    /// Subscriber sign-ups: current vs previous 7-day window.
    pub subscriber_growth: f64,
    /// Total replies across all newsletters.
    pub total_replies: u64,
    /// Replies: current vs previous 7-day window.
    pub reply_growth: f64,
    /// Most recently published newsletter, if any.
    pub last_published: Option<Newsletter>,
    /// The three most recently created newsletters.
    pub recent: Vec<Newsletter>,
    /// Reply counts per day over the trailing week.
    pub engagement: EngagementSeries,
    /// Engagement growth over the series.
    pub engagement_growth: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    #[rstest]
    #[case(0, 0, 0.0)]
    #[case(0, 7, 100.0)]
    #[case(4, 6, 50.0)]
    #[case(6, 4, -33.3)]
    #[case(3, 3, 0.0)]
    #[case(8, 0, -100.0)]
    fn growth_percent_cases(#[case] previous: u64, #[case] current: u64, #[case] expected: f64) {
        assert_eq!(growth_percent(previous, current), expected);
    }

    fn noon(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn series_buckets_by_calendar_day() {
        let now = noon(10);
        let timestamps = vec![
            noon(10),               // today -> last bucket
            noon(10),               // today again
            noon(4),                // six days ago -> first bucket
            noon(7),                // three days ago
            noon(3),                // outside the window, dropped
            now + Duration::days(1), // future, dropped
        ];
        let series = EngagementSeries::from_timestamps(now, &timestamps);
        assert_eq!(series.buckets(), &[1, 0, 0, 1, 0, 0, 2]);
    }

    #[test]
    fn series_growth_compares_early_and_recent_days() {
        let now = noon(10);
        // Two replies in the earliest three days, four in the latest three.
        let timestamps = vec![
            noon(4),
            noon(5),
            noon(8),
            noon(9),
            noon(10),
            noon(10),
        ];
        let series = EngagementSeries::from_timestamps(now, &timestamps);
        assert_eq!(series.growth(), 100.0);
    }

    #[test]
    fn empty_series_reports_zero_growth() {
        let series = EngagementSeries::from_timestamps(noon(10), &[]);
        assert_eq!(series.growth(), 0.0);
    }
}
