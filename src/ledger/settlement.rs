//! Single-level undo for "settle all". Each user has at most one pending
//! settlement; recording a new one replaces it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use uuid::Uuid;

pub const UNDO_WINDOW: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UndoError {
    #[error("no pending settlement with that id")]
    Unknown,
    #[error("undo window elapsed")]
    Expired,
}

#[derive(Debug)]
struct PendingSettlement {
    id: Uuid,
    transaction_ids: Vec<i64>,
    settled_at: Instant,
}

#[derive(Debug, Clone, Default)]
pub struct SettlementLog {
    pending: Arc<Mutex<HashMap<Uuid, PendingSettlement>>>,
}

impl SettlementLog {
    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, PendingSettlement>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remembers the ids a settle-all touched and returns the settlement id
    /// the client presents to undo it.
    pub fn record(&self, user_id: Uuid, transaction_ids: Vec<i64>, now: Instant) -> Uuid {
        let id = Uuid::new_v4();
        let mut pending = self.lock();
        pending.retain(|_, settlement| now.duration_since(settlement.settled_at) <= UNDO_WINDOW);
        pending.insert(
            user_id,
            PendingSettlement {
                id,
                transaction_ids,
                settled_at: now,
            },
        );
        id
    }

    /// Hands back the ids to revert. The settlement is consumed either way.
    pub fn take(&self, user_id: Uuid, settlement_id: Uuid, now: Instant) -> Result<Vec<i64>, UndoError> {
        let mut pending = self.lock();
        match pending.get(&user_id) {
            Some(settlement) if settlement.id == settlement_id => {}
            _ => return Err(UndoError::Unknown),
        }
        let settlement = pending.remove(&user_id).ok_or(UndoError::Unknown)?;
        if now.duration_since(settlement.settled_at) > UNDO_WINDOW {
            return Err(UndoError::Expired);
        }
        Ok(settlement.transaction_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_within_window_returns_exactly_the_settled_ids() {
        let log = SettlementLog::default();
        let user = Uuid::new_v4();
        let start = Instant::now();
        let id = log.record(user, vec![4, 8, 15], start);

        let ids = log.take(user, id, start + Duration::from_secs(9)).unwrap();
        assert_eq!(ids, vec![4, 8, 15]);
        assert_eq!(log.take(user, id, start), Err(UndoError::Unknown));
    }

    #[test]
    fn undo_after_window_is_refused() {
        let log = SettlementLog::default();
        let user = Uuid::new_v4();
        let start = Instant::now();
        let id = log.record(user, vec![1], start);
        assert_eq!(log.take(user, id, start + Duration::from_secs(11)), Err(UndoError::Expired));
    }

    #[test]
    fn newer_settlement_replaces_older() {
        let log = SettlementLog::default();
        let user = Uuid::new_v4();
        let start = Instant::now();
        let first = log.record(user, vec![1], start);
        let second = log.record(user, vec![2], start);
        assert_eq!(log.take(user, first, start), Err(UndoError::Unknown));
        assert_eq!(log.take(user, second, start), Ok(vec![2]));
    }

    #[test]
    fn users_cannot_undo_each_other() {
        let log = SettlementLog::default();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let start = Instant::now();
        let id = log.record(alice, vec![1], start);
        assert_eq!(log.take(bob, id, start), Err(UndoError::Unknown));
        assert_eq!(log.take(alice, id, start), Ok(vec![1]));
    }
}
