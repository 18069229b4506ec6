//! PostgreSQL experiment store

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};

use crate::domain::experiment::{
    validate_rating, ExperimentId, ExperimentQuery, ExperimentResult, ExperimentStatistics,
    ExperimentStore, StoredExperiment,
};
use crate::domain::DomainError;

pub const DEFAULT_TABLE_NAME: &str = "experiments";

static TABLE_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]{0,62}$").expect("static regex is valid"));

/// PostgreSQL connection settings
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/prompt_playground".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }
}

/// Experiments are stored as a JSONB document plus the mutable feedback columns.
///
/// Filtering by time range and pagination run in SQL; the provider filter
/// inspects the `responses` array inside the document.
pub struct PostgresExperimentStore {
    pool: PgPool,
    table_name: String,
}

impl Debug for PostgresExperimentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresExperimentStore")
            .field("table_name", &self.table_name)
            .finish()
    }
}

impl PostgresExperimentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            table_name: DEFAULT_TABLE_NAME.to_string(),
        }
    }

    /// Table names are interpolated into SQL, so only plain identifiers are accepted
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Result<Self, DomainError> {
        let table_name = table_name.into();
        validate_table_name(&table_name)?;
        self.table_name = table_name;
        Ok(self)
    }

    pub async fn connect(config: &PostgresConfig) -> Result<Self, DomainError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to PostgreSQL: {}", e)))?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ensure_table(&self) -> Result<(), DomainError> {
        let create_table = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id VARCHAR(64) PRIMARY KEY,
                data JSONB NOT NULL,
                user_rating SMALLINT,
                notes TEXT,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
            table = self.table_name
        );
        let create_index = format!(
            "CREATE INDEX IF NOT EXISTS {table}_created_at_idx ON {table} (created_at DESC)",
            table = self.table_name
        );

        for statement in [create_table, create_index] {
            sqlx::query(&statement)
                .execute(&self.pool)
                .await
                .map_err(|e| DomainError::storage(format!("Failed to create table: {}", e)))?;
        }

        Ok(())
    }
}

fn validate_table_name(table_name: &str) -> Result<(), DomainError> {
    if TABLE_NAME_PATTERN.is_match(table_name) {
        Ok(())
    } else {
        Err(DomainError::configuration(format!(
            "Invalid table name '{}'",
            table_name
        )))
    }
}

fn select_query<'a>(table_name: &str, query: &'a ExperimentQuery) -> QueryBuilder<'a, Postgres> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT data, user_rating, notes FROM {} WHERE TRUE",
        table_name
    ));

    if let Some(provider) = query.provider {
        builder
            .push(" AND EXISTS (SELECT 1 FROM jsonb_array_elements(data->'responses') r WHERE r->'model_config'->>'provider' = ")
            .push_bind(provider.as_str())
            .push(")");
    }

    if let Some(from) = query.from {
        builder.push(" AND created_at >= ").push_bind(from);
    }

    if let Some(to) = query.to {
        builder.push(" AND created_at < ").push_bind(to);
    }

    builder.push(" ORDER BY created_at DESC");

    if let Some(limit) = query.limit {
        builder.push(" LIMIT ").push_bind(limit as i64);
    }

    if let Some(offset) = query.offset {
        builder.push(" OFFSET ").push_bind(offset as i64);
    }

    builder
}

fn row_to_experiment(row: &PgRow) -> Result<StoredExperiment, DomainError> {
    let data: serde_json::Value = row
        .try_get("data")
        .map_err(|e| DomainError::storage(format!("Failed to read experiment: {}", e)))?;
    let user_rating: Option<i16> = row
        .try_get("user_rating")
        .map_err(|e| DomainError::storage(format!("Failed to read rating: {}", e)))?;
    let notes: Option<String> = row
        .try_get("notes")
        .map_err(|e| DomainError::storage(format!("Failed to read notes: {}", e)))?;

    let result: ExperimentResult = serde_json::from_value(data)
        .map_err(|e| DomainError::storage(format!("Failed to deserialize experiment: {}", e)))?;

    Ok(StoredExperiment {
        result,
        user_rating: user_rating.and_then(|r| u8::try_from(r).ok()),
        notes,
    })
}

#[async_trait]
impl ExperimentStore for PostgresExperimentStore {
    async fn append(&self, result: &ExperimentResult) -> Result<(), DomainError> {
        let data = serde_json::to_value(result)
            .map_err(|e| DomainError::storage(format!("Failed to serialize experiment: {}", e)))?;
        let created_at: DateTime<Utc> = result.timestamp();

        let insert = format!(
            "INSERT INTO {} (id, data, created_at) VALUES ($1, $2, $3)",
            self.table_name
        );

        sqlx::query(&insert)
            .bind(result.id().as_str())
            .bind(data)
            .bind(created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to store experiment: {}", e)))?;

        Ok(())
    }

    async fn get(&self, id: &ExperimentId) -> Result<Option<StoredExperiment>, DomainError> {
        let select = format!(
            "SELECT data, user_rating, notes FROM {} WHERE id = $1",
            self.table_name
        );

        let row = sqlx::query(&select)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get experiment: {}", e)))?;

        row.as_ref().map(row_to_experiment).transpose()
    }

    async fn query(&self, query: &ExperimentQuery) -> Result<Vec<StoredExperiment>, DomainError> {
        let rows = select_query(&self.table_name, query)
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to query experiments: {}", e)))?;

        rows.iter().map(row_to_experiment).collect()
    }

    async fn delete(&self, id: &ExperimentId) -> Result<bool, DomainError> {
        let delete = format!("DELETE FROM {} WHERE id = $1", self.table_name);

        let result = sqlx::query(&delete)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to delete experiment: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_rating(
        &self,
        id: &ExperimentId,
        rating: u8,
        notes: Option<String>,
    ) -> Result<StoredExperiment, DomainError> {
        validate_rating(rating)?;

        let update = format!(
            "UPDATE {} SET user_rating = $2, notes = $3 WHERE id = $1 RETURNING data, user_rating, notes",
            self.table_name
        );

        let row = sqlx::query(&update)
            .bind(id.as_str())
            .bind(i16::from(rating))
            .bind(notes)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to update rating: {}", e)))?
            .ok_or_else(|| DomainError::not_found(format!("Experiment '{}' not found", id)))?;

        row_to_experiment(&row)
    }

    async fn statistics(&self) -> Result<ExperimentStatistics, DomainError> {
        let experiments = self.query(&ExperimentQuery::new()).await?;

        Ok(ExperimentStatistics::from_experiments(
            experiments.iter(),
            Utc::now(),
        ))
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let select = format!("SELECT COUNT(*) AS total FROM {}", self.table_name);

        let row = sqlx::query(&select)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to count experiments: {}", e)))?;

        let total: i64 = row
            .try_get("total")
            .map_err(|e| DomainError::storage(format!("Failed to read count: {}", e)))?;

        Ok(usize::try_from(total).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::experiment::Provider;

    #[test]
    fn test_table_name_validation() {
        assert!(validate_table_name("experiments").is_ok());
        assert!(validate_table_name("playground_experiments_v2").is_ok());
        assert!(validate_table_name("Experiments").is_err());
        assert!(validate_table_name("experiments; DROP TABLE x").is_err());
        assert!(validate_table_name("").is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = PostgresConfig::new("postgres://db/test")
            .with_max_connections(4)
            .with_connect_timeout(5);

        assert_eq!(config.url, "postgres://db/test");
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.connect_timeout_secs, 5);
        assert_eq!(config.min_connections, 1);
    }

    #[test]
    fn test_select_without_filters() {
        let query = ExperimentQuery::new();
        let builder = select_query("experiments", &query);

        assert_eq!(
            builder.sql(),
            "SELECT data, user_rating, notes FROM experiments WHERE TRUE ORDER BY created_at DESC"
        );
    }

    #[test]
    fn test_select_with_all_filters() {
        let now = Utc::now();
        let query = ExperimentQuery::new()
            .with_provider(Provider::Anthropic)
            .with_time_range(now - chrono::Duration::days(1), now)
            .with_limit(10)
            .with_offset(20);
        let builder = select_query("experiments", &query);
        let sql = builder.sql();

        assert!(sql.contains("r->'model_config'->>'provider' = $1"));
        assert!(sql.contains("created_at >= $2"));
        assert!(sql.contains("created_at < $3"));
        assert!(sql.contains("LIMIT $4"));
        assert!(sql.ends_with("OFFSET $5"));
    }
}
