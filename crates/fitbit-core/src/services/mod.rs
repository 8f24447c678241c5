//! Endpoint catalog: thin services that map Fitbit resources onto client calls.

pub mod account;
pub mod activities;
pub mod body;
pub mod foods;
pub mod friends;
pub mod profile;
pub mod sleep;
pub mod subscriptions;
pub mod time_series;

pub use account::{AccountService, RateLimitStatus};
pub use activities::{ActivityKind, ActivityLog, ActivityService, DailyGoals, DistanceUnit, WeeklyGoals};
pub use body::BodyService;
pub use foods::{FoodLog, FoodRef, FoodService, NewFood, WaterUnit};
pub use friends::{FriendService, Invitee, LeaderboardPeriod};
pub use profile::{FitbitUser, Gender, ProfileService, ProfileUpdate};
pub use sleep::SleepService;
pub use subscriptions::{Collection, SubscriptionRequest, SubscriptionService, SUBSCRIBER_ID_HEADER};
pub use time_series::{
    IntradayResource, InvalidPeriod, InvalidResource, Period, TimeSeriesRange, TimeSeriesResource, TimeSeriesService,
};

use chrono::{NaiveDate, NaiveTime};

pub(crate) fn fmt_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn fmt_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Percent-encode a caller-supplied id so it stays a single path segment.
pub(crate) fn path_segment(id: &str) -> String {
    let mut encoded = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}
