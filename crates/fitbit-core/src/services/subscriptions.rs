use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::path_segment;
use crate::api::ApiRequest;
use crate::error::FitbitResult;
use crate::FitbitClient;

pub const SUBSCRIBER_ID_HEADER: &str = "X-Fitbit-Subscriber-Id";

/// Collections a subscription can be narrowed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Activities,
    Body,
    Foods,
    Sleep,
}

impl Collection {
    /// Parse the `collectionType` field Fitbit reports in listings and notifications.
    pub fn from_collection_type(value: &str) -> Option<Self> {
        match value {
            "activities" => Some(Collection::Activities),
            "body" => Some(Collection::Body),
            "foods" => Some(Collection::Foods),
            "sleep" => Some(Collection::Sleep),
            _ => None,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Collection::Activities => "activities",
            Collection::Body => "body",
            Collection::Foods => "foods",
            Collection::Sleep => "sleep",
        };
        write!(f, "{value}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRequest {
    pub subscription_id: String,
    /// `None` subscribes to every collection.
    pub collection: Option<Collection>,
    /// Echoed back by Fitbit in notifications; sent as a request header.
    pub subscriber_id: Option<String>,
    /// Delete the user's existing subscriptions before adding this one.
    pub replace_existing: bool,
}

impl SubscriptionRequest {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            collection: None,
            subscriber_id: None,
            replace_existing: false,
        }
    }

    pub fn collection(mut self, collection: Collection) -> Self {
        self.collection = Some(collection);
        self
    }

    pub fn subscriber_id(mut self, subscriber_id: impl Into<String>) -> Self {
        self.subscriber_id = Some(subscriber_id.into());
        self
    }

    pub fn replace_existing(mut self, replace: bool) -> Self {
        self.replace_existing = replace;
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionList {
    #[serde(default)]
    api_subscriptions: Vec<ListedSubscription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListedSubscription {
    subscription_id: String,
    #[serde(default)]
    collection_type: Option<String>,
}

#[derive(Clone, Copy)]
pub struct SubscriptionService<'a> {
    client: &'a FitbitClient,
}

impl<'a> SubscriptionService<'a> {
    pub(crate) fn new(client: &'a FitbitClient) -> Self {
        Self { client }
    }

    pub async fn add(&self, request: SubscriptionRequest) -> FitbitResult<Value> {
        if request.replace_existing {
            self.delete_existing().await?;
        }
        let mut api_request = ApiRequest::post(subscription_path(
            &request.subscription_id,
            request.collection,
        ));
        if let Some(subscriber_id) = request.subscriber_id {
            api_request = api_request.header(SUBSCRIBER_ID_HEADER, subscriber_id);
        }
        self.client.execute(api_request).await
    }

    pub async fn delete(
        &self,
        subscription_id: &str,
        collection: Option<Collection>,
    ) -> FitbitResult<Value> {
        self.client
            .delete(subscription_path(subscription_id, collection))
            .await
    }

    pub async fn list(&self) -> FitbitResult<Value> {
        self.client.get("user/-/apiSubscriptions").await
    }

    // Adding a subscription the user already has yields 409; clearing first avoids it.
    async fn delete_existing(&self) -> FitbitResult<()> {
        let listing: SubscriptionList = serde_json::from_value(self.list().await?)?;
        for existing in listing.api_subscriptions {
            let collection = existing
                .collection_type
                .as_deref()
                .and_then(Collection::from_collection_type);
            self.delete(&existing.subscription_id, collection).await?;
            debug!(subscription_id = %existing.subscription_id, "deleted subscription");
        }
        Ok(())
    }
}

fn subscription_path(subscription_id: &str, collection: Option<Collection>) -> String {
    let subscription_id = path_segment(subscription_id);
    match collection {
        Some(collection) => format!("user/-/{collection}/apiSubscriptions/{subscription_id}"),
        None => format!("user/-/apiSubscriptions/{subscription_id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::authorized_client;
    use httpmock::prelude::*;

    #[test]
    fn path_includes_collection_when_given() {
        assert_eq!(
            subscription_path("7", Some(Collection::Sleep)),
            "user/-/sleep/apiSubscriptions/7"
        );
        assert_eq!(subscription_path("7", None), "user/-/apiSubscriptions/7");
        assert_eq!(
            subscription_path("a?b#c", None),
            "user/-/apiSubscriptions/a%3Fb%23c"
        );
    }

    #[tokio::test]
    async fn delete_keeps_reserved_characters_in_the_path() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(DELETE)
                    .path("/1/user/-/apiSubscriptions/a%3Fb.json");
                then.status(204);
            })
            .await;

        let client = authorized_client(&server).await;
        client.subscriptions().delete("a?b", None).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn add_sends_subscriber_header() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/1/user/-/body/apiSubscriptions/user-42.json")
                    .header("x-fitbit-subscriber-id", "main");
                then.status(201)
                    .json_body(serde_json::json!({"subscriptionId": "user-42"}));
            })
            .await;

        let client = authorized_client(&server).await;
        let value = client
            .subscriptions()
            .add(
                SubscriptionRequest::new("user-42")
                    .collection(Collection::Body)
                    .subscriber_id("main"),
            )
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(value["subscriptionId"], "user-42");
    }

    #[tokio::test]
    async fn replace_existing_deletes_listed_subscriptions_first() {
        let server = MockServer::start_async().await;
        let listing = server
            .mock_async(|when, then| {
                when.method(GET).path("/1/user/-/apiSubscriptions.json");
                then.status(200).json_body(serde_json::json!({
                    "apiSubscriptions": [
                        {"subscriptionId": "old-1", "collectionType": "foods"},
                        {"subscriptionId": "old-2", "collectionType": "user"}
                    ]
                }));
            })
            .await;
        let delete_foods = server
            .mock_async(|when, then| {
                when.method(DELETE)
                    .path("/1/user/-/foods/apiSubscriptions/old-1.json");
                then.status(204);
            })
            .await;
        let delete_all = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/1/user/-/apiSubscriptions/old-2.json");
                then.status(204);
            })
            .await;
        let add = server
            .mock_async(|when, then| {
                when.method(POST).path("/1/user/-/apiSubscriptions/new.json");
                then.status(201).json_body(serde_json::json!({}));
            })
            .await;

        let client = authorized_client(&server).await;
        client
            .subscriptions()
            .add(SubscriptionRequest::new("new").replace_existing(true))
            .await
            .unwrap();
        listing.assert_async().await;
        delete_foods.assert_async().await;
        delete_all.assert_async().await;
        add.assert_async().await;
    }

    #[tokio::test]
    async fn conflict_surfaces_as_api_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/1/user/-/apiSubscriptions/dup.json");
                then.status(409).json_body(serde_json::json!({
                    "errors": [{"errorType": "conflict", "message": "already subscribed"}]
                }));
            })
            .await;

        let client = authorized_client(&server).await;
        let err = client
            .subscriptions()
            .add(SubscriptionRequest::new("dup"))
            .await
            .unwrap_err();
        assert_eq!(err.status().map(|s| s.as_u16()), Some(409));
    }
}
