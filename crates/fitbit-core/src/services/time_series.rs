use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;

use super::{fmt_date, fmt_time};
use crate::error::FitbitResult;
use crate::FitbitClient;

/// Resources available as daily time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSeriesResource {
    CaloriesIn,
    Water,
    CaloriesOut,
    Steps,
    Distance,
    Floors,
    Elevation,
    Heart,
    MinutesSedentary,
    MinutesLightlyActive,
    MinutesFairlyActive,
    MinutesVeryActive,
    ActiveScore,
    ActivityCalories,
    TrackerCaloriesOut,
    TrackerSteps,
    TrackerDistance,
    TrackerFloors,
    TrackerElevation,
    TrackerActiveScore,
    SleepStartTime,
    TimeInBed,
    MinutesAsleep,
    AwakeningsCount,
    MinutesAwake,
    MinutesToFallAsleep,
    MinutesAfterWakeup,
    SleepEfficiency,
    Weight,
    Bmi,
    Fat,
}

impl TimeSeriesResource {
    pub fn path(self) -> &'static str {
        match self {
            TimeSeriesResource::CaloriesIn => "foods/caloriesIn",
            TimeSeriesResource::Water => "foods/water",
            TimeSeriesResource::CaloriesOut => "activities/calories",
            TimeSeriesResource::Steps => "activities/steps",
            TimeSeriesResource::Distance => "activities/distance",
            TimeSeriesResource::Floors => "activities/floors",
            TimeSeriesResource::Elevation => "activities/elevation",
            TimeSeriesResource::Heart => "activities/heart",
            TimeSeriesResource::MinutesSedentary => "activities/minutesSedentary",
            TimeSeriesResource::MinutesLightlyActive => "activities/minutesLightlyActive",
            TimeSeriesResource::MinutesFairlyActive => "activities/minutesFairlyActive",
            TimeSeriesResource::MinutesVeryActive => "activities/minutesVeryActive",
            TimeSeriesResource::ActiveScore => "activities/activeScore",
            TimeSeriesResource::ActivityCalories => "activities/activityCalories",
            TimeSeriesResource::TrackerCaloriesOut => "activities/tracker/calories",
            TimeSeriesResource::TrackerSteps => "activities/tracker/steps",
            TimeSeriesResource::TrackerDistance => "activities/tracker/distance",
            TimeSeriesResource::TrackerFloors => "activities/tracker/floors",
            TimeSeriesResource::TrackerElevation => "activities/tracker/elevation",
            TimeSeriesResource::TrackerActiveScore => "activities/tracker/activeScore",
            TimeSeriesResource::SleepStartTime => "sleep/startTime",
            TimeSeriesResource::TimeInBed => "sleep/timeInBed",
            TimeSeriesResource::MinutesAsleep => "sleep/minutesAsleep",
            TimeSeriesResource::AwakeningsCount => "sleep/awakeningsCount",
            TimeSeriesResource::MinutesAwake => "sleep/minutesAwake",
            TimeSeriesResource::MinutesToFallAsleep => "sleep/minutesToFallAsleep",
            TimeSeriesResource::MinutesAfterWakeup => "sleep/minutesAfterWakeup",
            TimeSeriesResource::SleepEfficiency => "sleep/efficiency",
            TimeSeriesResource::Weight => "body/weight",
            TimeSeriesResource::Bmi => "body/bmi",
            TimeSeriesResource::Fat => "body/fat",
        }
    }
}

impl std::str::FromStr for TimeSeriesResource {
    type Err = InvalidResource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let resource = match s {
            "caloriesIn" => TimeSeriesResource::CaloriesIn,
            "water" => TimeSeriesResource::Water,
            "caloriesOut" => TimeSeriesResource::CaloriesOut,
            "steps" => TimeSeriesResource::Steps,
            "distance" => TimeSeriesResource::Distance,
            "floors" => TimeSeriesResource::Floors,
            "elevation" => TimeSeriesResource::Elevation,
            "heart" => TimeSeriesResource::Heart,
            "minutesSedentary" => TimeSeriesResource::MinutesSedentary,
            "minutesLightlyActive" => TimeSeriesResource::MinutesLightlyActive,
            "minutesFairlyActive" => TimeSeriesResource::MinutesFairlyActive,
            "minutesVeryActive" => TimeSeriesResource::MinutesVeryActive,
            "activeScore" => TimeSeriesResource::ActiveScore,
            "activityCalories" => TimeSeriesResource::ActivityCalories,
            "tracker_caloriesOut" => TimeSeriesResource::TrackerCaloriesOut,
            "tracker_steps" => TimeSeriesResource::TrackerSteps,
            "tracker_distance" => TimeSeriesResource::TrackerDistance,
            "tracker_floors" => TimeSeriesResource::TrackerFloors,
            "tracker_elevation" => TimeSeriesResource::TrackerElevation,
            "tracker_activeScore" => TimeSeriesResource::TrackerActiveScore,
            "startTime" => TimeSeriesResource::SleepStartTime,
            "timeInBed" => TimeSeriesResource::TimeInBed,
            "minutesAsleep" => TimeSeriesResource::MinutesAsleep,
            "awakeningsCount" => TimeSeriesResource::AwakeningsCount,
            "minutesAwake" => TimeSeriesResource::MinutesAwake,
            "minutesToFallAsleep" => TimeSeriesResource::MinutesToFallAsleep,
            "minutesAfterWakeup" => TimeSeriesResource::MinutesAfterWakeup,
            "efficiency" => TimeSeriesResource::SleepEfficiency,
            "weight" => TimeSeriesResource::Weight,
            "bmi" => TimeSeriesResource::Bmi,
            "fat" => TimeSeriesResource::Fat,
            other => return Err(InvalidResource(other.to_owned())),
        };
        Ok(resource)
    }
}

/// Resources with minute-level intraday data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntradayResource {
    Calories,
    Steps,
    Floors,
    Elevation,
    Distance,
    Heart,
}

impl IntradayResource {
    pub fn path(self) -> &'static str {
        match self {
            IntradayResource::Calories => "activities/calories",
            IntradayResource::Steps => "activities/steps",
            IntradayResource::Floors => "activities/floors",
            IntradayResource::Elevation => "activities/elevation",
            IntradayResource::Distance => "activities/distance",
            IntradayResource::Heart => "activities/heart",
        }
    }
}

/// Error reported when parsing an unknown time series name.
#[derive(Debug, thiserror::Error)]
#[error("unknown time series resource '{0}'")]
pub struct InvalidResource(pub String);

/// Error reported when parsing an unknown period such as `2w`.
#[derive(Debug, thiserror::Error)]
#[error("unknown period '{0}' (expected 1d, 7d, 30d, 1w, 1m, 3m, 6m, 1y or max)")]
pub struct InvalidPeriod(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    OneDay,
    SevenDays,
    ThirtyDays,
    OneWeek,
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    Max,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Period::OneDay => "1d",
            Period::SevenDays => "7d",
            Period::ThirtyDays => "30d",
            Period::OneWeek => "1w",
            Period::OneMonth => "1m",
            Period::ThreeMonths => "3m",
            Period::SixMonths => "6m",
            Period::OneYear => "1y",
            Period::Max => "max",
        };
        write!(f, "{value}")
    }
}

impl std::str::FromStr for Period {
    type Err = InvalidPeriod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1d" => Ok(Period::OneDay),
            "7d" => Ok(Period::SevenDays),
            "30d" => Ok(Period::ThirtyDays),
            "1w" => Ok(Period::OneWeek),
            "1m" => Ok(Period::OneMonth),
            "3m" => Ok(Period::ThreeMonths),
            "6m" => Ok(Period::SixMonths),
            "1y" => Ok(Period::OneYear),
            "max" => Ok(Period::Max),
            other => Err(InvalidPeriod(other.to_owned())),
        }
    }
}

/// Span of a time series request, counted back from or forward to the base date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSeriesRange {
    Period(Period),
    EndDate(NaiveDate),
}

impl fmt::Display for TimeSeriesRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeSeriesRange::Period(period) => write!(f, "{period}"),
            TimeSeriesRange::EndDate(date) => write!(f, "{}", fmt_date(*date)),
        }
    }
}

#[derive(Clone, Copy)]
pub struct TimeSeriesService<'a> {
    client: &'a FitbitClient,
}

impl<'a> TimeSeriesService<'a> {
    pub(crate) fn new(client: &'a FitbitClient) -> Self {
        Self { client }
    }

    pub async fn get(
        &self,
        resource: TimeSeriesResource,
        base_date: NaiveDate,
        range: TimeSeriesRange,
    ) -> FitbitResult<Value> {
        self.client
            .get(series_path(resource, base_date, range))
            .await
    }

    /// One day of intraday data, optionally narrowed to a time window.
    pub async fn intraday(
        &self,
        resource: IntradayResource,
        date: NaiveDate,
        window: Option<(NaiveTime, NaiveTime)>,
    ) -> FitbitResult<Value> {
        self.client
            .get(intraday_path(resource, date, window))
            .await
    }
}

fn series_path(resource: TimeSeriesResource, base_date: NaiveDate, range: TimeSeriesRange) -> String {
    format!(
        "user/-/{}/date/{}/{range}",
        resource.path(),
        fmt_date(base_date)
    )
}

fn intraday_path(
    resource: IntradayResource,
    date: NaiveDate,
    window: Option<(NaiveTime, NaiveTime)>,
) -> String {
    let times = match window {
        Some((start, end)) => format!("/time/{}/{}", fmt_time(start), fmt_time(end)),
        None => String::new(),
    };
    format!(
        "user/-/{}/date/{}/1d{times}",
        resource.path(),
        fmt_date(date)
    )
}
