use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::Config;

pub type Database = PgPool;

pub async fn create_database_connection(config: &Config) -> Result<Database, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    tracing::info!(max_connections = config.max_connections, "database connected");
    Ok(pool)
}

pub async fn run_migrations(pool: &Database) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("migrations executed");
    Ok(())
}

const PURGE_EXPIRED_SESSIONS: &str = "DELETE FROM sessions WHERE expires_at <= NOW()";

/// Drops every expired session, whoever it belongs to.
pub async fn purge_expired_sessions(pool: &Database) -> Result<u64, sqlx::Error> {
    let purged = sqlx::query(PURGE_EXPIRED_SESSIONS)
        .execute(pool)
        .await?
        .rows_affected();

    if purged > 0 {
        tracing::debug!(purged, "expired sessions purged");
    }
    Ok(purged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_purge_is_not_scoped_to_one_user() {
        assert!(!PURGE_EXPIRED_SESSIONS.contains("user_id"));
        assert!(PURGE_EXPIRED_SESSIONS.contains("expires_at <= NOW()"));
    }
}
