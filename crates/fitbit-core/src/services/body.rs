use chrono::NaiveDate;
use serde_json::Value;

use super::fmt_date;
use crate::api::FormParams;
use crate::error::FitbitResult;
use crate::FitbitClient;

#[derive(Clone, Copy)]
pub struct BodyService<'a> {
    client: &'a FitbitClient,
}

impl<'a> BodyService<'a> {
    pub(crate) fn new(client: &'a FitbitClient) -> Self {
        Self { client }
    }

    pub async fn fat_goal(&self) -> FitbitResult<Value> {
        self.client.get("user/-/body/log/fat/goal").await
    }

    pub async fn on_date(&self, date: NaiveDate) -> FitbitResult<Value> {
        self.client
            .get(format!("user/-/body/date/{}", fmt_date(date)))
            .await
    }

    /// Log weight and/or body fat for a day. Units follow the account settings.
    pub async fn log_body(
        &self,
        date: NaiveDate,
        weight: Option<f64>,
        fat: Option<f64>,
    ) -> FitbitResult<Value> {
        let params = FormParams::new()
            .with("date", fmt_date(date))
            .with_opt("weight", weight)
            .with_opt("fat", fat);
        self.client.post("user/-/body", params).await
    }

    /// Log a weight measurement; Fitbit uses today when no date is given.
    pub async fn log_weight(&self, weight: f64, date: Option<NaiveDate>) -> FitbitResult<Value> {
        let params = FormParams::new()
            .with_opt("date", date.map(fmt_date))
            .with("weight", weight);
        self.client.post("user/-/body/log/weight", params).await
    }
}

#[cfg(test)]
mod tests {
    use crate::client::test_support::authorized_client;
    use chrono::NaiveDate;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn log_body_sends_only_given_measurements() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/1/user/-/body.json")
                    .body("date=2024-01-15&weight=71.3");
                then.status(201).json_body(serde_json::json!({"body": {}}));
            })
            .await;

        let client = authorized_client(&server).await;
        client
            .body()
            .log_body(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(), Some(71.3), None)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn log_weight_without_date() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/1/user/-/body/log/weight.json")
                    .body("weight=80");
                then.status(201).json_body(serde_json::json!({"weightLog": {}}));
            })
            .await;

        let client = authorized_client(&server).await;
        client.body().log_weight(80.0, None).await.unwrap();
        mock.assert_async().await;
    }
}
