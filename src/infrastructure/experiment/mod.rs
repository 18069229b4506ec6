//! Experiment store implementations

mod factory;
mod in_memory_store;
mod postgres_store;

pub use factory::ExperimentStoreFactory;
pub use in_memory_store::{InMemoryExperimentStore, DEFAULT_MAX_RECORDS};
pub use postgres_store::{PostgresConfig, PostgresExperimentStore, DEFAULT_TABLE_NAME};
