//! Application context - wires the service to a data directory

use std::path::{Path, PathBuf};
use std::sync::Arc;

use kycflow_core::Actor;
use kycflow_engine::{KycConfig, KycService, StaticOfficerDirectory};
use kycflow_store::SqliteStore;
use tracing::debug;

/// Environment variable listing known compliance officer ids, comma separated
pub const OFFICERS_ENV: &str = "KYCFLOW_OFFICERS";

/// Application context - one service over `<data>/kycflow.db`
pub struct AppContext {
    pub service: KycService,
    pub actor: Actor,
    db_path: PathBuf,
}

impl AppContext {
    /// Open (or create) the data directory and build the service
    pub async fn new(
        data_path: impl AsRef<Path>,
        config_path: Option<&Path>,
        actor_id: &str,
    ) -> Result<Self, anyhow::Error> {
        let data_path = data_path.as_ref();
        std::fs::create_dir_all(data_path)?;
        let db_path = data_path.join("kycflow.db");

        let config = match config_path {
            Some(path) => KycConfig::from_file(path)?,
            None => KycConfig::default(),
        };

        let store = Arc::new(SqliteStore::open(&db_path)?);
        let officer_ids = officers_from_env();
        debug!(db = %db_path.display(), officers = officer_ids.len(), "Opening KycFlow data directory");

        let officers = officer_ids
            .iter()
            .fold(StaticOfficerDirectory::default(), |dir, id| dir.with_officer(id));
        let service = KycService::new(config, store)?.with_officers(Arc::new(officers));

        Ok(Self {
            service,
            actor: Actor::new(actor_id, actor_id),
            db_path,
        })
    }

    /// Path of the SQLite database
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

fn officers_from_env() -> Vec<String> {
    std::env::var(OFFICERS_ENV)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect()
}
