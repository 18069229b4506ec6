//! Experiment store selection from configuration

use std::sync::Arc;

use crate::config::{StorageConfig, StorageType};
use crate::domain::experiment::ExperimentStore;
use crate::domain::DomainError;

use super::in_memory_store::InMemoryExperimentStore;
use super::postgres_store::{PostgresConfig, PostgresExperimentStore};

#[derive(Debug)]
pub struct ExperimentStoreFactory;

impl ExperimentStoreFactory {
    /// Build the configured store. Postgres connects eagerly and creates its table.
    pub async fn create(config: &StorageConfig) -> Result<Arc<dyn ExperimentStore>, DomainError> {
        match config.storage_type {
            StorageType::Memory => {
                tracing::info!(max_records = config.max_records, "Using in-memory experiment store");
                Ok(Arc::new(InMemoryExperimentStore::with_max_records(
                    config.max_records,
                )))
            }
            StorageType::Postgres => {
                let url = config.postgres_url.as_deref().ok_or_else(|| {
                    DomainError::configuration("storage.postgres_url is required for postgres storage")
                })?;

                let store = PostgresExperimentStore::connect(&PostgresConfig::new(url)).await?;
                store.ensure_table().await?;

                tracing::info!("Using PostgreSQL experiment store");
                Ok(Arc::new(store))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_in_memory() {
        let config = StorageConfig {
            storage_type: StorageType::Memory,
            max_records: 5,
            postgres_url: None,
            ..Default::default()
        };

        let store = ExperimentStoreFactory::create(&config).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_postgres_requires_url() {
        let config = StorageConfig {
            storage_type: StorageType::Postgres,
            max_records: 5,
            postgres_url: None,
            ..Default::default()
        };

        let result = ExperimentStoreFactory::create(&config).await;

        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }
}
