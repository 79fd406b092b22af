use crate::models::{AnalyticsEvent, ContactCapture, SavedDeal, SharedSave};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// PostgreSQL client for the tables users write to
///
/// Saves, analytics events, contact captures and shared save lists live
/// next to the catalog in the hosted database; they are written through a
/// direct connection instead of the REST API.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout_secs: u64,
        idle_timeout_secs: u64,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(idle_timeout_secs))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Tables are created only if the hosted schema doesn't have them yet
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            acquire_timeout_secs.unwrap_or(5),
            idle_timeout_secs.unwrap_or(600),
        )
        .await
    }

    /// Save a deal for a user. Saving twice is a no-op.
    ///
    /// Returns the deal's total save count afterwards.
    pub async fn save_deal(&self, anon_id: &str, deal_id: &str) -> Result<i64, PostgresError> {
        let query = r#"
            INSERT INTO user_saved_deals (anon_id, deal_id, saved_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (anon_id, deal_id) DO NOTHING
        "#;

        sqlx::query(query)
            .bind(anon_id)
            .bind(deal_id)
            .execute(&self.pool)
            .await?;

        tracing::debug!("Saved deal {} for {}", deal_id, anon_id);

        self.save_count(deal_id).await
    }

    /// Remove a save; returns the deal's remaining save count
    pub async fn unsave_deal(&self, anon_id: &str, deal_id: &str) -> Result<i64, PostgresError> {
        let query = r#"
            DELETE FROM user_saved_deals
            WHERE anon_id = $1 AND deal_id = $2
        "#;

        let result = sqlx::query(query)
            .bind(anon_id)
            .bind(deal_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PostgresError::NotFound(format!("No save of {} for {}", deal_id, anon_id)));
        }

        self.save_count(deal_id).await
    }

    async fn save_count(&self, deal_id: &str) -> Result<i64, PostgresError> {
        let row = sqlx::query("SELECT COUNT(*) AS saves FROM user_saved_deals WHERE deal_id = $1")
            .bind(deal_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("saves"))
    }

    /// All saves for a user, newest first
    pub async fn get_saved_deals(&self, anon_id: &str) -> Result<Vec<SavedDeal>, PostgresError> {
        let query = r#"
            SELECT anon_id, deal_id, saved_at
            FROM user_saved_deals
            WHERE anon_id = $1
            ORDER BY saved_at DESC
        "#;

        let rows = sqlx::query(query).bind(anon_id).fetch_all(&self.pool).await?;

        let saves: Vec<SavedDeal> = rows
            .iter()
            .map(|row| SavedDeal {
                anon_id: row.get("anon_id"),
                deal_id: row.get("deal_id"),
                saved_at: row.get("saved_at"),
            })
            .collect();

        tracing::debug!("User {} has {} saved deals", anon_id, saves.len());

        Ok(saves)
    }

    /// Save counts for the given deals
    pub async fn get_save_counts(&self, deal_ids: &[String]) -> Result<HashMap<String, u32>, PostgresError> {
        if deal_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let query = r#"
            SELECT deal_id, COUNT(*) AS saves
            FROM user_saved_deals
            WHERE deal_id = ANY($1)
            GROUP BY deal_id
        "#;

        let rows = sqlx::query(query).bind(deal_ids).fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(|row| {
                let saves: i64 = row.get("saves");
                (row.get::<String, _>("deal_id"), saves.max(0) as u32)
            })
            .collect())
    }

    /// Record an analytics event
    pub async fn record_event(&self, event: &AnalyticsEvent) -> Result<(), PostgresError> {
        let query = r#"
            INSERT INTO analytics_events (id, anon_id, event_name, properties, created_at)
            VALUES ($1, $2, $3, $4, $5)
        "#;

        sqlx::query(query)
            .bind(event.id)
            .bind(&event.anon_id)
            .bind(&event.event_name)
            .bind(&event.properties)
            .bind(event.created_at)
            .execute(&self.pool)
            .await?;

        tracing::debug!("Recorded event {} for {}", event.event_name, event.anon_id);

        Ok(())
    }

    /// Events for a user, optionally filtered by name
    pub async fn get_events(
        &self,
        anon_id: &str,
        event_names: &[&str],
    ) -> Result<Vec<AnalyticsEvent>, PostgresError> {
        let names: Vec<String> = event_names.iter().map(|n| n.to_string()).collect();
        let query = r#"
            SELECT id, anon_id, event_name, properties, created_at
            FROM analytics_events
            WHERE anon_id = $1 AND (cardinality($2::text[]) = 0 OR event_name = ANY($2))
            ORDER BY created_at DESC
        "#;

        let rows = sqlx::query(query)
            .bind(anon_id)
            .bind(&names)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| AnalyticsEvent {
                id: row.get("id"),
                anon_id: row.get("anon_id"),
                event_name: row.get("event_name"),
                properties: row.get("properties"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    /// Store an email / phone capture. Last write wins per user and source.
    pub async fn upsert_contact(&self, contact: &ContactCapture) -> Result<(), PostgresError> {
        let query = r#"
            INSERT INTO user_contacts (anon_id, email, phone, source, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (anon_id, source)
            DO UPDATE SET
                email = COALESCE(EXCLUDED.email, user_contacts.email),
                phone = COALESCE(EXCLUDED.phone, user_contacts.phone),
                created_at = EXCLUDED.created_at
        "#;

        sqlx::query(query)
            .bind(&contact.anon_id)
            .bind(&contact.email)
            .bind(&contact.phone)
            .bind(&contact.source)
            .execute(&self.pool)
            .await?;

        tracing::info!("Captured contact for {} via {}", contact.anon_id, contact.source);

        Ok(())
    }

    /// Persist a shared save list
    pub async fn create_share(&self, share: &SharedSave) -> Result<(), PostgresError> {
        let query = r#"
            INSERT INTO shared_saves (share_id, anon_id, deal_ids, created_at)
            VALUES ($1, $2, $3, $4)
        "#;

        sqlx::query(query)
            .bind(&share.share_id)
            .bind(&share.anon_id)
            .bind(&share.deal_ids)
            .bind(share.created_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn get_share(&self, share_id: &str) -> Result<SharedSave, PostgresError> {
        let query = r#"
            SELECT share_id, anon_id, deal_ids, created_at
            FROM shared_saves
            WHERE share_id = $1
        "#;

        let row = sqlx::query(query)
            .bind(share_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| PostgresError::NotFound(format!("Share {} not found", share_id)))?;

        Ok(SharedSave {
            share_id: row.get("share_id"),
            anon_id: row.get("anon_id"),
            deal_ids: row.get("deal_ids"),
            created_at: row.get("created_at"),
        })
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, PostgresError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
