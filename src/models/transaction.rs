use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_modality", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentModality {
    Credit,
    Debit,
    Cash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

/// How the user paid, as chosen on the entry form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentChoice {
    Pix,
    Cash,
    Card,
}

/// A persisted transaction. `payment_method` is the card label resolved at
/// read time, falling back to the label captured when the row was written.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: i64,
    pub user_id: Uuid,
    pub series_id: Option<Uuid>,
    pub card_id: Option<i64>,
    pub description: String,
    pub amount: Decimal,
    pub payment_method: String,
    pub payment_modality: PaymentModality,
    pub is_recurring: bool,
    pub settlement_date: NaiveDate,
    pub paid: bool,
    pub driver_flag: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn is_expense(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }
}

/// Select list shared by every transaction read so labels resolve the same way.
pub const TRANSACTION_COLUMNS: &str = r#"
    t.id,
    t.user_id,
    t.series_id,
    t.card_id,
    t.description,
    t.amount,
    COALESCE(c.bank_name || ' - ' || c.nickname, t.payment_method) AS payment_method,
    t.payment_modality,
    t.is_recurring,
    t.settlement_date,
    t.paid,
    t.driver_flag,
    t.created_at
"#;

#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    pub description: String,
    pub amount: Decimal, // always the positive magnitude, `kind` decides the sign
    pub kind: TransactionKind,
    pub method: PaymentChoice,
    pub card_id: Option<i64>,
    pub modality: Option<PaymentModality>,
    pub installments: Option<u32>,
    #[serde(default)]
    pub recurring: bool,
    pub recurring_day: Option<u32>,
    pub date: Option<String>, // Format: "YYYY-MM-DD"
    #[serde(default)]
    pub driver_flag: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePaidRequest {
    pub paid: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodMatch {
    #[default]
    Exact,
    Contains,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransactionQuery {
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub card_id: Option<i64>,
    pub method: Option<String>,
    pub method_match: Option<MethodMatch>,
    pub paid: Option<bool>,
    pub driver: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SettleRequest {
    pub month: u32,
    pub year: i32,
    pub card_id: Option<i64>,
    pub method: Option<String>,
    pub method_match: Option<MethodMatch>,
}
