use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vehicle {
    pub id: i64,
    pub user_id: Uuid,
    pub model: String,
    pub plate: String,
    pub year: i32,
    pub current_mileage: i32,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateVehicleRequest {
    pub model: String,
    pub plate: String,
    pub year: i32,
    #[serde(default)]
    pub current_mileage: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateVehicleRequest {
    pub model: Option<String>,
    pub plate: Option<String>,
    pub year: Option<i32>,
    pub current_mileage: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DriverEarning {
    pub id: i64,
    pub user_id: Uuid,
    pub vehicle_id: Option<i64>,
    pub platform_name: String,
    pub work_date: NaiveDate,
    pub cash_amount: Decimal,
    pub card_amount: Decimal,
    pub start_km: i32,
    pub end_km: i32,
    pub created_at: Option<DateTime<Utc>>,
}

impl DriverEarning {
    pub fn total(&self) -> Decimal {
        self.cash_amount + self.card_amount
    }

    pub fn km_driven(&self) -> i64 {
        (i64::from(self.end_km) - i64::from(self.start_km)).max(0)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateEarningRequest {
    pub vehicle_id: Option<i64>,
    pub platform_name: String,
    pub work_date: String, // Format: "YYYY-MM-DD"
    #[serde(default)]
    pub cash_amount: Decimal,
    #[serde(default)]
    pub card_amount: Decimal,
    #[serde(default)]
    pub start_km: i32,
    #[serde(default)]
    pub end_km: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DriverExpense {
    pub id: i64,
    pub user_id: Uuid,
    pub vehicle_id: Option<i64>,
    pub description: String,
    pub amount: Decimal,
    pub expense_date: NaiveDate,
    pub category: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateExpenseRequest {
    pub vehicle_id: Option<i64>,
    pub description: String,
    pub amount: Decimal,
    pub expense_date: String, // Format: "YYYY-MM-DD"
    pub category: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DateRangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}
