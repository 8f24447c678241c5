use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FitbitResult;
use crate::FitbitClient;

/// Remaining request quota, for this user through this client and for the client overall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitStatus {
    pub viewer: u64,
    pub viewer_reset: String,
    pub viewer_quota: u64,
    pub client: u64,
    pub client_reset: String,
    pub client_quota: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RateLimitEnvelope {
    rate_limit_status: Quota,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Quota {
    remaining_hits: u64,
    reset_time: String,
    hourly_limit: u64,
}

#[derive(Clone, Copy)]
pub struct AccountService<'a> {
    client: &'a FitbitClient,
}

impl<'a> AccountService<'a> {
    pub(crate) fn new(client: &'a FitbitClient) -> Self {
        Self { client }
    }

    /// Paired trackers and scales with battery level and last sync time.
    pub async fn devices(&self) -> FitbitResult<Value> {
        self.client.get("user/-/devices").await
    }

    pub async fn rate_limit(&self) -> FitbitResult<RateLimitStatus> {
        let viewer: RateLimitEnvelope = serde_json::from_value(
            self.client
                .get("account/clientAndViewerRateLimitStatus")
                .await?,
        )?;
        let client: RateLimitEnvelope =
            serde_json::from_value(self.client.get("account/clientRateLimitStatus").await?)?;
        Ok(RateLimitStatus {
            viewer: viewer.rate_limit_status.remaining_hits,
            viewer_reset: viewer.rate_limit_status.reset_time,
            viewer_quota: viewer.rate_limit_status.hourly_limit,
            client: client.rate_limit_status.remaining_hits,
            client_reset: client.rate_limit_status.reset_time,
            client_quota: client.rate_limit_status.hourly_limit,
        })
    }
}
