use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Card {
    pub id: i64,
    pub user_id: Uuid,
    pub bank_name: String,
    pub nickname: String,
    pub due_day: i16,
    pub logo_reference: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Card {
    /// Label shown wherever a transaction paid with this card is listed.
    pub fn label(&self) -> String {
        format!("{} - {}", self.bank_name, self.nickname)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCardRequest {
    pub bank_name: String,
    pub nickname: String,
    pub due_day: i16,
    pub logo_reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCardRequest {
    pub bank_name: Option<String>,
    pub nickname: Option<String>,
    pub due_day: Option<i16>,
    pub logo_reference: Option<String>,
}

pub fn validate_due_day(due_day: i16) -> bool {
    (1..=31).contains(&due_day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_joins_bank_and_nickname() {
        let card = Card {
            id: 1,
            user_id: Uuid::nil(),
            bank_name: "Nubank".to_string(),
            nickname: "Roxinho".to_string(),
            due_day: 10,
            logo_reference: None,
            created_at: None,
        };
        assert_eq!(card.label(), "Nubank - Roxinho");
    }

    #[test]
    fn due_day_bounds() {
        assert!(validate_due_day(1));
        assert!(validate_due_day(31));
        assert!(!validate_due_day(0));
        assert!(!validate_due_day(32));
    }
}
