//! Run command - executes one experiment without starting the server

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Args;

use crate::domain::experiment::{ExperimentRequest, ExperimentStore};
use crate::infrastructure::experiment::InMemoryExperimentStore;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to an experiment request JSON file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Pretty-print the result
    #[arg(long)]
    pub pretty: bool,
}

pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = super::load_config()?;
    let request = read_request(&args.file)?;

    let store: Arc<dyn ExperimentStore> = Arc::new(InMemoryExperimentStore::with_max_records(1));
    let service = crate::create_experiment_service(&config, store);

    let outcome = service.run(request).await?;

    let output = if args.pretty {
        serde_json::to_string_pretty(&outcome)?
    } else {
        serde_json::to_string(&outcome)?
    };
    println!("{}", output);

    Ok(())
}

fn read_request(path: &Path) -> anyhow::Result<ExperimentRequest> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    serde_json::from_str(&raw).with_context(|| format!("Invalid experiment request in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_request() {
        let path = std::env::temp_dir().join(format!("request-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"{"prompt": "Say hello", "model_configs": [{"provider": "anthropic", "model_name": "claude-3-haiku"}]}"#,
        )
        .unwrap();

        let request = read_request(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(request.prompt, "Say hello");
        assert_eq!(request.num_runs, 1);
        assert_eq!(request.model_configs.len(), 1);
    }

    #[test]
    fn test_missing_file() {
        let err = read_request(Path::new("/nonexistent/request.json")).unwrap_err();

        assert!(err.to_string().contains("Failed to read"));
    }
}
