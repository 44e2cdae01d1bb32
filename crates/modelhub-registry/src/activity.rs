//! Version activity: logs and lineage

use tracing::debug;
use uuid::Uuid;

use crate::{
    entities::{Lineage, Log},
    error::{RegistryError, Result},
    registry::Registry,
};

impl Registry {
    /// Append a log entry to a version
    pub async fn attach_log(&self, version_id: Uuid, data: &str) -> Result<Log> {
        let log = Log::new(version_id, data);
        self.store.append_log(&log).await?;
        debug!(version_id = %version_id, log_id = %log.id, "attached log");
        Ok(log)
    }

    /// Logs of a version, oldest first
    pub async fn list_logs(&self, version_id: Uuid) -> Result<Vec<Log>> {
        let version = self.get_version(version_id).await?;
        self.store.list_logs(version.id).await
    }

    pub async fn get_lineage(&self, version_id: Uuid) -> Result<Lineage> {
        self.store
            .get_lineage(version_id)
            .await?
            .ok_or_else(|| RegistryError::not_found("lineage of version", version_id))
    }
}
