use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::fmt_date;
use crate::api::FormParams;
use crate::error::FitbitResult;
use crate::FitbitClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Female,
    Male,
    Na,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Gender::Female => "FEMALE",
            Gender::Male => "MALE",
            Gender::Na => "NA",
        };
        write!(f, "{value}")
    }
}

/// Profile fields to change; unset fields are left as they are.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub gender: Option<Gender>,
    pub birthday: Option<NaiveDate>,
    /// Centimeters or inches, per the account's unit system.
    pub height: Option<f64>,
    pub nickname: Option<String>,
    pub full_name: Option<String>,
    /// IANA zone such as `America/Los_Angeles`.
    pub timezone: Option<String>,
}

impl ProfileUpdate {
    fn into_params(self) -> FormParams {
        FormParams::new()
            .with_opt("gender", self.gender)
            .with_opt("birthday", self.birthday.map(fmt_date))
            .with_opt("height", self.height)
            .with_opt("nickname", self.nickname)
            .with_opt("fullName", self.full_name)
            .with_opt("timezone", self.timezone)
    }
}

/// The user who granted the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitbitUser {
    pub encoded_id: String,
    pub display_name: String,
}

#[derive(Deserialize)]
struct ProfileEnvelope {
    user: FitbitUser,
}

#[derive(Clone, Copy)]
pub struct ProfileService<'a> {
    client: &'a FitbitClient,
}

impl<'a> ProfileService<'a> {
    pub(crate) fn new(client: &'a FitbitClient) -> Self {
        Self { client }
    }

    pub async fn get(&self) -> FitbitResult<Value> {
        self.client.get("user/-/profile").await
    }

    pub async fn update(&self, update: ProfileUpdate) -> FitbitResult<Value> {
        self.client
            .post("user/-/profile", update.into_params())
            .await
    }

    pub async fn resource_owner(&self) -> FitbitResult<FitbitUser> {
        let envelope: ProfileEnvelope = serde_json::from_value(self.get().await?)?;
        Ok(envelope.user)
    }
}
