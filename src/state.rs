use std::sync::Arc;

use axum::extract::FromRef;

use crate::config::Config;
use crate::database::Database;
use crate::ledger::settlement::SettlementLog;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub settlements: SettlementLog,
}

impl FromRef<AppState> for Database {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for Arc<Config> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for SettlementLog {
    fn from_ref(state: &AppState) -> Self {
        state.settlements.clone()
    }
}
