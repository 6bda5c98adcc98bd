use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

pub const THEMES: [&str; 2] = ["light", "dark"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub initial_balance: Decimal,
    pub theme: String,
    pub expiry_date: Option<NaiveDate>,
    pub tour_completed: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub initial_balance: Option<Decimal>,
    pub theme: Option<String>,
    pub tour_completed: Option<bool>,
}

impl UpdateProfileRequest {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.initial_balance.is_none()
            && self.theme.is_none()
            && self.tour_completed.is_none()
    }
}
