use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde_json::Value;

use super::fmt_date;
use crate::api::FormParams;
use crate::error::FitbitResult;
use crate::FitbitClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaterUnit {
    Milliliter,
    FluidOunce,
    Cup,
}

impl fmt::Display for WaterUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            WaterUnit::Milliliter => "ml",
            WaterUnit::FluidOunce => "fl oz",
            WaterUnit::Cup => "cup",
        };
        write!(f, "{value}")
    }
}

/// Food referenced by a log entry.
#[derive(Debug, Clone, PartialEq)]
pub enum FoodRef {
    Catalog {
        food_id: u64,
    },
    /// Quick-logged food; nutrition keys are Fitbit field names such as `totalFat`.
    Custom {
        name: String,
        calories: u32,
        brand_name: Option<String>,
        nutrition: BTreeMap<String, f64>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FoodLog {
    pub date: NaiveDate,
    pub food: FoodRef,
    pub meal_type_id: u32,
    pub unit_id: u32,
    pub amount: f64,
}

impl FoodLog {
    fn into_params(self) -> FormParams {
        let mut params = FormParams::new();
        params.push("date", fmt_date(self.date));
        match self.food {
            FoodRef::Custom {
                name,
                calories,
                brand_name,
                nutrition,
            } => {
                params
                    .push("foodName", name)
                    .push("calories", calories)
                    .push_opt("brandName", brand_name);
                params.extend(nutrition);
            }
            FoodRef::Catalog { food_id } => {
                params.push("foodId", food_id);
            }
        }
        params
            .push("mealTypeId", self.meal_type_id)
            .push("unitId", self.unit_id)
            .push("amount", self.amount);
        params
    }
}

/// A private food added to the user's food database.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFood {
    pub name: String,
    pub default_food_measurement_unit_id: u32,
    pub default_serving_size: f64,
    pub calories: u32,
    pub description: Option<String>,
    /// `LIQUID` or `DRY`.
    pub form_type: Option<String>,
    pub nutrition: BTreeMap<String, f64>,
}

impl NewFood {
    fn into_params(self) -> FormParams {
        let mut params = FormParams::new()
            .with("name", self.name)
            .with(
                "defaultFoodMeasurementUnitId",
                self.default_food_measurement_unit_id,
            )
            .with("defaultServingSize", self.default_serving_size)
            .with("calories", self.calories)
            .with_opt("description", self.description)
            .with_opt("formType", self.form_type);
        params.extend(self.nutrition);
        params
    }
}

#[derive(Clone, Copy)]
pub struct FoodService<'a> {
    client: &'a FitbitClient,
}

impl<'a> FoodService<'a> {
    pub(crate) fn new(client: &'a FitbitClient) -> Self {
        Self { client }
    }

    pub async fn on_date(&self, date: NaiveDate) -> FitbitResult<Value> {
        self.client
            .get(format!("user/-/foods/log/date/{}", fmt_date(date)))
            .await
    }

    pub async fn recent(&self) -> FitbitResult<Value> {
        self.client.get("user/-/foods/log/recent").await
    }

    pub async fn frequent(&self) -> FitbitResult<Value> {
        self.client.get("user/-/foods/log/frequent").await
    }

    pub async fn favorite(&self) -> FitbitResult<Value> {
        self.client.get("user/-/foods/log/favorite").await
    }

    pub async fn log(&self, entry: FoodLog) -> FitbitResult<Value> {
        self.client
            .post("user/-/foods/log", entry.into_params())
            .await
    }

    pub async fn delete(&self, log_id: u64) -> FitbitResult<Value> {
        self.client
            .delete(format!("user/-/foods/log/{log_id}"))
            .await
    }

    pub async fn add_favorite(&self, food_id: u64) -> FitbitResult<Value> {
        self.client
            .post(
                format!("user/-/foods/log/favorite/{food_id}"),
                FormParams::new(),
            )
            .await
    }

    pub async fn delete_favorite(&self, food_id: u64) -> FitbitResult<Value> {
        self.client
            .delete(format!("user/-/foods/log/favorite/{food_id}"))
            .await
    }

    pub async fn meals(&self) -> FitbitResult<Value> {
        self.client.get("user/-/meals").await
    }

    pub async fn units(&self) -> FitbitResult<Value> {
        self.client.get("foods/units").await
    }

    pub async fn search(&self, query: &str) -> FitbitResult<Value> {
        self.client
            .get_with_query("foods/search", FormParams::new().with("query", query))
            .await
    }

    pub async fn get(&self, food_id: u64) -> FitbitResult<Value> {
        self.client.get(format!("foods/{food_id}")).await
    }

    pub async fn create(&self, food: NewFood) -> FitbitResult<Value> {
        self.client.post("foods", food.into_params()).await
    }

    pub async fn water_on_date(&self, date: NaiveDate) -> FitbitResult<Value> {
        self.client
            .get(format!("user/-/foods/log/water/date/{}", fmt_date(date)))
            .await
    }

    pub async fn log_water(
        &self,
        date: NaiveDate,
        amount: f64,
        unit: Option<WaterUnit>,
    ) -> FitbitResult<Value> {
        let params = FormParams::new()
            .with("date", fmt_date(date))
            .with("amount", amount)
            .with_opt("unit", unit);
        self.client.post("user/-/foods/log/water", params).await
    }

    pub async fn delete_water(&self, log_id: u64) -> FitbitResult<Value> {
        self.client
            .delete(format!("user/-/foods/log/water/{log_id}"))
            .await
    }
}
