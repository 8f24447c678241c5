use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;

use super::{fmt_date, fmt_time};
use crate::api::FormParams;
use crate::error::FitbitResult;
use crate::FitbitClient;

/// Units accepted by the activity log endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceUnit {
    Centimeter,
    Foot,
    Inch,
    Kilometer,
    Meter,
    Mile,
    Millimeter,
    Steps,
    Yards,
}

impl fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            DistanceUnit::Centimeter => "Centimeter",
            DistanceUnit::Foot => "Foot",
            DistanceUnit::Inch => "Inch",
            DistanceUnit::Kilometer => "Kilometer",
            DistanceUnit::Meter => "Meter",
            DistanceUnit::Mile => "Mile",
            DistanceUnit::Millimeter => "Millimeter",
            DistanceUnit::Steps => "Steps",
            DistanceUnit::Yards => "Yards",
        };
        write!(f, "{value}")
    }
}

#[derive(Debug, Clone, Default)]
pub struct DailyGoals {
    pub steps: Option<u32>,
    pub floors: Option<u32>,
    pub distance: Option<f64>,
    pub active_minutes: Option<u32>,
    pub calories_out: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct WeeklyGoals {
    pub steps: Option<u32>,
    pub floors: Option<u32>,
    pub distance: Option<f64>,
}

/// Which activity an entry refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityKind {
    /// An activity (or intensity level) from Fitbit's activity database.
    Catalog {
        activity_id: u64,
        manual_calories: Option<u32>,
    },
    /// A free-form activity; Fitbit needs the calories since it cannot estimate them.
    Custom { name: String, manual_calories: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityLog {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub activity: ActivityKind,
    pub duration_millis: u64,
    pub distance: Option<f64>,
    pub distance_unit: Option<DistanceUnit>,
}

impl ActivityLog {
    fn into_params(self) -> FormParams {
        let mut params = FormParams::new();
        params
            .push("date", fmt_date(self.date))
            .push("startTime", fmt_time(self.start_time));
        match self.activity {
            ActivityKind::Custom {
                name,
                manual_calories,
            } => {
                params
                    .push("activityName", name)
                    .push("manualCalories", manual_calories);
            }
            ActivityKind::Catalog {
                activity_id,
                manual_calories,
            } => {
                params
                    .push("activityId", activity_id)
                    .push_opt("manualCalories", manual_calories);
            }
        }
        params
            .push("durationMillis", self.duration_millis)
            .push_opt("distance", self.distance)
            .push_opt("distanceUnit", self.distance_unit);
        params
    }
}

#[derive(Clone, Copy)]
pub struct ActivityService<'a> {
    client: &'a FitbitClient,
}

impl<'a> ActivityService<'a> {
    pub(crate) fn new(client: &'a FitbitClient) -> Self {
        Self { client }
    }

    pub async fn daily_goals(&self) -> FitbitResult<Value> {
        self.client.get("user/-/activities/goals/daily").await
    }

    pub async fn update_daily_goals(&self, goals: DailyGoals) -> FitbitResult<Value> {
        let params = FormParams::new()
            .with_opt("steps", goals.steps)
            .with_opt("floors", goals.floors)
            .with_opt("distance", goals.distance)
            .with_opt("activeMinutes", goals.active_minutes)
            .with_opt("caloriesOut", goals.calories_out);
        self.client
            .post("user/-/activities/goals/daily", params)
            .await
    }

    pub async fn weekly_goals(&self) -> FitbitResult<Value> {
        self.client.get("user/-/activities/goals/weekly").await
    }

    pub async fn update_weekly_goals(&self, goals: WeeklyGoals) -> FitbitResult<Value> {
        let params = FormParams::new()
            .with_opt("steps", goals.steps)
            .with_opt("floors", goals.floors)
            .with_opt("distance", goals.distance);
        self.client
            .post("user/-/activities/goals/weekly", params)
            .await
    }

    /// Activity summary and logged activities for one day.
    pub async fn on_date(&self, date: NaiveDate) -> FitbitResult<Value> {
        self.client
            .get(format!("user/-/activities/date/{}", fmt_date(date)))
            .await
    }

    pub async fn recent(&self) -> FitbitResult<Value> {
        self.client.get("user/-/activities/recent").await
    }

    pub async fn frequent(&self) -> FitbitResult<Value> {
        self.client.get("user/-/activities/frequent").await
    }

    pub async fn favorite(&self) -> FitbitResult<Value> {
        self.client.get("user/-/activities/favorite").await
    }

    pub async fn log(&self, entry: ActivityLog) -> FitbitResult<Value> {
        self.client
            .post("user/-/activities", entry.into_params())
            .await
    }

    pub async fn delete(&self, log_id: u64) -> FitbitResult<Value> {
        self.client
            .delete(format!("user/-/activities/{log_id}"))
            .await
    }

    pub async fn add_favorite(&self, activity_id: u64) -> FitbitResult<Value> {
        self.client
            .post(
                format!("user/-/activities/favorite/{activity_id}"),
                FormParams::new(),
            )
            .await
    }

    pub async fn delete_favorite(&self, activity_id: u64) -> FitbitResult<Value> {
        self.client
            .delete(format!("user/-/activities/favorite/{activity_id}"))
            .await
    }

    /// Details of an entry in the activity database.
    pub async fn detail(&self, activity_id: u64) -> FitbitResult<Value> {
        self.client.get(format!("activities/{activity_id}")).await
    }

    /// Browse the whole activity database.
    pub async fn browse(&self) -> FitbitResult<Value> {
        self.client.get("activities").await
    }

    /// Lifetime totals and best days.
    pub async fn lifetime_stats(&self) -> FitbitResult<Value> {
        self.client.get("user/-/activities").await
    }
}
