use std::fmt;

use serde_json::Value;

use super::path_segment;
use crate::api::FormParams;
use crate::error::FitbitResult;
use crate::FitbitClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeaderboardPeriod {
    #[default]
    SevenDays,
    ThirtyDays,
}

impl fmt::Display for LeaderboardPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeaderboardPeriod::SevenDays => write!(f, "7d"),
            LeaderboardPeriod::ThirtyDays => write!(f, "30d"),
        }
    }
}

/// Someone to invite: an existing Fitbit user or an email address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invitee {
    UserId(String),
    Email(String),
}

impl Invitee {
    fn into_params(self) -> FormParams {
        match self {
            Invitee::UserId(id) => FormParams::new().with("invitedUserId", id),
            Invitee::Email(email) => FormParams::new().with("invitedUserEmail", email),
        }
    }
}

#[derive(Clone, Copy)]
pub struct FriendService<'a> {
    client: &'a FitbitClient,
}

impl<'a> FriendService<'a> {
    pub(crate) fn new(client: &'a FitbitClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> FitbitResult<Value> {
        self.client.get("user/-/friends").await
    }

    pub async fn leaderboard(&self, period: LeaderboardPeriod) -> FitbitResult<Value> {
        self.client
            .get(format!("user/-/friends/leaders/{period}"))
            .await
    }

    pub async fn invite(&self, invitee: Invitee) -> FitbitResult<Value> {
        self.client
            .post("user/-/friends/invitations", invitee.into_params())
            .await
    }

    pub async fn accept(&self, user_id: &str) -> FitbitResult<Value> {
        self.respond(user_id, true).await
    }

    pub async fn reject(&self, user_id: &str) -> FitbitResult<Value> {
        self.respond(user_id, false).await
    }

    async fn respond(&self, user_id: &str, accept: bool) -> FitbitResult<Value> {
        self.client
            .post(
                format!("user/-/friends/invitations/{}", path_segment(user_id)),
                FormParams::new().with("accept", accept),
            )
            .await
    }
}
