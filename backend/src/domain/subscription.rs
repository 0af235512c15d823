//! Subscription relation and the unsubscribe cooldown rule.

use chrono::{DateTime, Duration, Utc};

use super::newsletter::NewsletterId;
use super::user::UserId;

/// Hours a subscriber must wait after subscribing before they may
/// unsubscribe again.
pub const UNSUBSCRIBE_COOLDOWN_HOURS: i64 = 24;

/// A user's opt-in to a newsletter.
///
/// ## Invariants
/// - At most one subscription exists per `(user_id, newsletter_id)` pair.
/// - Re-subscribing while already subscribed does not reset
///   `subscribed_at` (the store treats the insert as a no-op), so the
///   cooldown cannot be restarted by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    /// Subscribing account.
    pub user_id: UserId,
    /// Newsletter opted into.
    pub newsletter_id: NewsletterId,
    /// Opt-in timestamp, the anchor for the cooldown.
    pub subscribed_at: DateTime<Utc>,
}

impl Subscription {
    /// Time remaining before the subscriber may unsubscribe, or `None`
    /// once the cooldown has elapsed.
    pub fn cooldown_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        let elapsed = now - self.subscribed_at;
        let cooldown = Duration::hours(UNSUBSCRIBE_COOLDOWN_HOURS);
        if elapsed < cooldown {
            Some(cooldown - elapsed)
        } else {
            None
        }
    }
}

/// Whole hours remaining in a cooldown window, rounded up so the caller
/// never under-reports the wait.
pub fn remaining_whole_hours(remaining: Duration) -> i64 {
    let hours = remaining.num_hours();
    if remaining - Duration::hours(hours) > Duration::zero() {
        hours + 1
    } else {
        hours
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn subscription(subscribed_at: DateTime<Utc>) -> Subscription {
        Subscription {
            user_id: UserId::random(),
            newsletter_id: NewsletterId::random(),
            subscribed_at,
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).single().expect("valid timestamp")
    }

    #[test]
    fn cooldown_blocks_before_24_hours() {
        let sub = subscription(at(9));
        let now = at(9) + Duration::hours(23) + Duration::minutes(59);
        let remaining = sub.cooldown_remaining(now).expect("cooldown active");
        assert_eq!(remaining, Duration::minutes(1));
    }

    #[test]
    fn cooldown_clears_at_exactly_24_hours() {
        let sub = subscription(at(9));
        let now = at(9) + Duration::hours(24);
        assert_eq!(sub.cooldown_remaining(now), None);
    }

    #[test]
    fn cooldown_clears_after_24_hours() {
        let sub = subscription(at(9));
        let now = at(9) + Duration::days(3);
        assert_eq!(sub.cooldown_remaining(now), None);
    }

    #[rstest]
    #[case(Duration::minutes(1), 1)]
    #[case(Duration::hours(3), 3)]
    #[case(Duration::hours(3) + Duration::seconds(1), 4)]
    #[case(Duration::hours(23) + Duration::minutes(59), 24)]
    fn remaining_hours_round_up(#[case] remaining: Duration, #[case] expected: i64) {
        assert_eq!(remaining_whole_hours(remaining), expected);
    }
}
