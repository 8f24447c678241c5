use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;

use super::{fmt_date, fmt_time};
use crate::api::FormParams;
use crate::error::FitbitResult;
use crate::FitbitClient;

#[derive(Clone, Copy)]
pub struct SleepService<'a> {
    client: &'a FitbitClient,
}

impl<'a> SleepService<'a> {
    pub(crate) fn new(client: &'a FitbitClient) -> Self {
        Self { client }
    }

    pub async fn on_date(&self, date: NaiveDate) -> FitbitResult<Value> {
        self.client
            .get(format!("user/-/sleep/date/{}", fmt_date(date)))
            .await
    }

    pub async fn log(
        &self,
        date: NaiveDate,
        start_time: NaiveTime,
        duration_millis: u64,
    ) -> FitbitResult<Value> {
        let params = FormParams::new()
            .with("date", fmt_date(date))
            .with("startTime", fmt_time(start_time))
            .with("duration", duration_millis);
        self.client.post("user/-/sleep", params).await
    }

    pub async fn delete(&self, log_id: u64) -> FitbitResult<Value> {
        self.client.delete(format!("user/-/sleep/{log_id}")).await
    }
}
