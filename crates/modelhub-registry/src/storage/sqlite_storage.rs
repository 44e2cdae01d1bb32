//! SQLite metadata storage implementation
//!
//! This module provides a SQLite-based implementation of the MetadataStore trait.
//! It stores artifacts, branches, versions and their logs in a local SQLite
//! database file.
//!
//! Multi-row writes run inside a transaction whose first statement is a write,
//! so SQLite takes the write lock up front (honouring the busy timeout) instead
//! of failing a read-to-write upgrade under contention. Dropping a transaction
//! before commit rolls it back.

use async_trait::async_trait;
use sqlx::{
    Row, SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteRow},
};
use std::str::FromStr;
use std::time::Duration;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::debug;
use uuid::Uuid;

use super::MetadataStore;
use crate::{RegistryError, entities::*, error::Result, sequencer::next_label};

/// SQLite-based metadata storage implementation
pub struct SqliteStore {
    pool: SqlitePool,
}

const VERSION_DETAILS_SELECT: &str = r#"
    SELECT v.id, v.hash, v.label, v.created_at,
           b.id AS branch_id, b.name AS branch_name,
           p.id AS path_id, p.source_path,
           st.name AS source_type, st.public_url,
           l.id AS lineage_id, l.lineage
    FROM versions v
    JOIN branches b ON b.id = v.branch_id
    JOIN paths p ON p.id = v.path_id
    JOIN source_types st ON st.name = p.source_type
    LEFT JOIN lineages l ON l.version_id = v.id
"#;

impl SqliteStore {
    /// Create a new SQLite storage instance with the given database path
    ///
    /// Each pooled connection to `sqlite::memory:` would see its own empty
    /// database, so use a file path even for throwaway stores.
    pub async fn new(database_path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_path)
            .map_err(|e| RegistryError::Persistence(format!("Invalid database path: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePool::connect_with(options).await.map_err(|e| {
            RegistryError::Persistence(format!("Failed to connect to SQLite: {}", e))
        })?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Create SQLite storage from environment variable
    ///
    /// Expects DATABASE_URL environment variable with SQLite connection string
    /// Example: sqlite:./data/modelhub.db
    pub async fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:./data/modelhub.db".to_string());

        Self::new(&database_url).await
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize database schema
    async fn init_schema(&self) -> Result<()> {
        let statements = [
            (
                "source_types table",
                r#"
                CREATE TABLE IF NOT EXISTS source_types (
                    name TEXT PRIMARY KEY,
                    public_url TEXT
                )
                "#,
            ),
            (
                "artifacts table",
                r#"
                CREATE TABLE IF NOT EXISTS artifacts (
                    id TEXT PRIMARY KEY,
                    kind TEXT NOT NULL,                  -- "model" or "dataset"
                    organization_id TEXT NOT NULL,
                    name TEXT NOT NULL,
                    wiki TEXT NOT NULL DEFAULT '',
                    created_by TEXT NOT NULL,
                    updated_by TEXT NOT NULL,
                    is_public INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    UNIQUE (organization_id, kind, name)
                )
                "#,
            ),
            (
                "branches table",
                r#"
                CREATE TABLE IF NOT EXISTS branches (
                    id TEXT PRIMARY KEY,
                    artifact_id TEXT NOT NULL REFERENCES artifacts(id),
                    name TEXT NOT NULL,
                    is_default INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    UNIQUE (artifact_id, name)
                )
                "#,
            ),
            (
                "single default branch index",
                r#"
                CREATE UNIQUE INDEX IF NOT EXISTS idx_branches_single_default
                ON branches(artifact_id) WHERE is_default = 1
                "#,
            ),
            (
                "paths table",
                r#"
                CREATE TABLE IF NOT EXISTS paths (
                    id TEXT PRIMARY KEY,
                    source_path TEXT NOT NULL,           -- object key in the source bucket
                    source_type TEXT NOT NULL REFERENCES source_types(name)
                )
                "#,
            ),
            (
                "versions table",
                r#"
                CREATE TABLE IF NOT EXISTS versions (
                    id TEXT PRIMARY KEY,
                    branch_id TEXT NOT NULL REFERENCES branches(id),
                    seq INTEGER NOT NULL,                -- N of the "vN" label
                    label TEXT NOT NULL,
                    hash TEXT NOT NULL,
                    path_id TEXT NOT NULL UNIQUE
                        REFERENCES paths(id) DEFERRABLE INITIALLY DEFERRED,
                    created_at TEXT NOT NULL,
                    UNIQUE (branch_id, label),
                    UNIQUE (branch_id, seq)
                )
                "#,
            ),
            (
                "version hash index",
                "CREATE INDEX IF NOT EXISTS idx_versions_hash ON versions(branch_id, hash)",
            ),
            (
                "lineages table",
                r#"
                CREATE TABLE IF NOT EXISTS lineages (
                    id TEXT PRIMARY KEY,
                    version_id TEXT NOT NULL UNIQUE REFERENCES versions(id),
                    lineage TEXT NOT NULL
                )
                "#,
            ),
            (
                "logs table",
                r#"
                CREATE TABLE IF NOT EXISTS logs (
                    id TEXT PRIMARY KEY,
                    version_id TEXT NOT NULL REFERENCES versions(id),
                    data TEXT NOT NULL,
                    created_at TEXT NOT NULL
                )
                "#,
            ),
            (
                "log version index",
                "CREATE INDEX IF NOT EXISTS idx_logs_version ON logs(version_id)",
            ),
        ];

        for (what, sql) in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    RegistryError::Persistence(format!("Failed to create {}: {}", what, e))
                })?;
        }

        Ok(())
    }
}

fn db_err(context: &'static str) -> impl FnOnce(sqlx::Error) -> RegistryError {
    move |e| RegistryError::Persistence(format!("{}: {}", context, e))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

fn format_ts(ts: OffsetDateTime) -> Result<String> {
    ts.format(&Rfc3339)
        .map_err(|e| RegistryError::Persistence(format!("Failed to format timestamp: {}", e)))
}

fn parse_ts(s: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(s, &Rfc3339)
        .map_err(|e| RegistryError::Persistence(format!("Failed to parse timestamp: {}", e)))
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s)
        .map_err(|e| RegistryError::Persistence(format!("Invalid id '{}': {}", s, e)))
}

fn row_to_artifact(row: &SqliteRow) -> Result<Artifact> {
    let kind: String = row.get("kind");
    let kind = kind
        .parse::<ArtifactKind>()
        .map_err(|_| RegistryError::Persistence(format!("Unknown artifact kind '{}'", kind)))?;

    Ok(Artifact {
        id: parse_uuid(&row.get::<String, _>("id"))?,
        kind,
        organization_id: OrgId(row.get("organization_id")),
        name: row.get("name"),
        wiki: row.get("wiki"),
        created_by: UserId(row.get("created_by")),
        updated_by: UserId(row.get("updated_by")),
        is_public: row.get::<i64, _>("is_public") != 0,
        created_at: parse_ts(&row.get::<String, _>("created_at"))?,
        updated_at: parse_ts(&row.get::<String, _>("updated_at"))?,
    })
}

fn row_to_branch(row: &SqliteRow) -> Result<Branch> {
    Ok(Branch {
        id: parse_uuid(&row.get::<String, _>("id"))?,
        artifact_id: parse_uuid(&row.get::<String, _>("artifact_id"))?,
        name: row.get("name"),
        is_default: row.get::<i64, _>("is_default") != 0,
        created_at: parse_ts(&row.get::<String, _>("created_at"))?,
    })
}

fn row_to_details(row: &SqliteRow) -> Result<VersionDetails> {
    let id = parse_uuid(&row.get::<String, _>("id"))?;

    let lineage = match row.get::<Option<String>, _>("lineage_id") {
        Some(lineage_id) => Some(Lineage {
            id: parse_uuid(&lineage_id)?,
            version_id: id,
            lineage: row.get("lineage"),
        }),
        None => None,
    };

    Ok(VersionDetails {
        id,
        hash: row.get("hash"),
        label: row.get("label"),
        created_at: parse_ts(&row.get::<String, _>("created_at"))?,
        branch: BranchRef {
            id: parse_uuid(&row.get::<String, _>("branch_id"))?,
            name: row.get("branch_name"),
        },
        path: PathDetails {
            id: parse_uuid(&row.get::<String, _>("path_id"))?,
            source_path: row.get("source_path"),
            source_type: SourceType {
                name: row.get("source_type"),
                public_url: row.get("public_url"),
            },
        },
        lineage,
    })
}

fn row_to_log(row: &SqliteRow) -> Result<Log> {
    Ok(Log {
        id: parse_uuid(&row.get::<String, _>("id"))?,
        version_id: parse_uuid(&row.get::<String, _>("version_id"))?,
        data: row.get("data"),
        created_at: parse_ts(&row.get::<String, _>("created_at"))?,
    })
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn save_source_type(&self, source_type: &SourceType) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO source_types (name, public_url) VALUES (?, ?)")
            .bind(&source_type.name)
            .bind(&source_type.public_url)
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to save source type"))?;

        Ok(())
    }

    async fn get_source_type(&self, name: &str) -> Result<Option<SourceType>> {
        let row = sqlx::query("SELECT name, public_url FROM source_types WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to get source type"))?;

        Ok(row.map(|row| SourceType {
            name: row.get("name"),
            public_url: row.get("public_url"),
        }))
    }

    async fn list_source_types(&self) -> Result<Vec<SourceType>> {
        let rows = sqlx::query("SELECT name, public_url FROM source_types ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to list source types"))?;

        Ok(rows
            .iter()
            .map(|row| SourceType {
                name: row.get("name"),
                public_url: row.get("public_url"),
            })
            .collect())
    }

    async fn create_artifact(&self, artifact: &Artifact, initial_branch: &Branch) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin transaction"))?;

        sqlx::query(
            r#"
            INSERT INTO artifacts
            (id, kind, organization_id, name, wiki, created_by, updated_by, is_public, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(artifact.id.to_string())
        .bind(artifact.kind.as_str())
        .bind(artifact.organization_id.as_ref())
        .bind(&artifact.name)
        .bind(&artifact.wiki)
        .bind(artifact.created_by.as_ref())
        .bind(artifact.updated_by.as_ref())
        .bind(artifact.is_public)
        .bind(format_ts(artifact.created_at)?)
        .bind(format_ts(artifact.updated_at)?)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RegistryError::DuplicateArtifactName {
                    organization_id: artifact.organization_id.0.clone(),
                    name: artifact.name.clone(),
                }
            } else {
                RegistryError::Persistence(format!("Failed to save artifact: {}", e))
            }
        })?;

        sqlx::query(
            "INSERT INTO branches (id, artifact_id, name, is_default, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(initial_branch.id.to_string())
        .bind(artifact.id.to_string())
        .bind(&initial_branch.name)
        .bind(initial_branch.is_default)
        .bind(format_ts(initial_branch.created_at)?)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to save initial branch"))?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit artifact"))?;

        Ok(())
    }

    async fn get_artifact(&self, id: Uuid) -> Result<Option<Artifact>> {
        let row = sqlx::query("SELECT * FROM artifacts WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to get artifact"))?;

        row.as_ref().map(row_to_artifact).transpose()
    }

    async fn find_artifact(
        &self,
        organization_id: &OrgId,
        kind: ArtifactKind,
        name: &str,
    ) -> Result<Option<Artifact>> {
        let row = sqlx::query(
            "SELECT * FROM artifacts WHERE organization_id = ? AND kind = ? AND name = ?",
        )
        .bind(organization_id.as_ref())
        .bind(kind.as_str())
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to find artifact"))?;

        row.as_ref().map(row_to_artifact).transpose()
    }

    async fn list_artifacts(
        &self,
        organization_id: &OrgId,
        kind: ArtifactKind,
    ) -> Result<Vec<Artifact>> {
        let rows = sqlx::query(
            "SELECT * FROM artifacts WHERE organization_id = ? AND kind = ? ORDER BY name",
        )
        .bind(organization_id.as_ref())
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list artifacts"))?;

        rows.iter().map(row_to_artifact).collect()
    }

    async fn update_artifact(&self, artifact: &Artifact) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE artifacts
            SET wiki = ?, is_public = ?, updated_by = ?, updated_at = ?
            WHERE id = ?
        "#,
        )
        .bind(&artifact.wiki)
        .bind(artifact.is_public)
        .bind(artifact.updated_by.as_ref())
        .bind(format_ts(artifact.updated_at)?)
        .bind(artifact.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to update artifact"))?;

        if result.rows_affected() == 0 {
            return Err(RegistryError::not_found("artifact", artifact.id));
        }

        Ok(())
    }

    async fn create_branch(&self, branch: &Branch) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin transaction"))?;

        if branch.is_default {
            sqlx::query("UPDATE branches SET is_default = 0 WHERE artifact_id = ? AND is_default = 1")
                .bind(branch.artifact_id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(db_err("Failed to clear default branch"))?;
        }

        sqlx::query(
            "INSERT INTO branches (id, artifact_id, name, is_default, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(branch.id.to_string())
        .bind(branch.artifact_id.to_string())
        .bind(&branch.name)
        .bind(branch.is_default)
        .bind(format_ts(branch.created_at)?)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RegistryError::DuplicateBranchName {
                    artifact_id: branch.artifact_id.to_string(),
                    name: branch.name.clone(),
                }
            } else if is_foreign_key_violation(&e) {
                RegistryError::not_found("artifact", branch.artifact_id)
            } else {
                RegistryError::Persistence(format!("Failed to save branch: {}", e))
            }
        })?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit branch"))?;

        Ok(())
    }

    async fn get_branch(&self, id: Uuid) -> Result<Option<Branch>> {
        let row = sqlx::query("SELECT * FROM branches WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to get branch"))?;

        row.as_ref().map(row_to_branch).transpose()
    }

    async fn find_branch(&self, artifact_id: Uuid, name: &str) -> Result<Option<Branch>> {
        let row = sqlx::query("SELECT * FROM branches WHERE artifact_id = ? AND name = ?")
            .bind(artifact_id.to_string())
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find branch"))?;

        row.as_ref().map(row_to_branch).transpose()
    }

    async fn list_branches(&self, artifact_id: Uuid) -> Result<Vec<Branch>> {
        let rows = sqlx::query("SELECT * FROM branches WHERE artifact_id = ? ORDER BY rowid")
            .bind(artifact_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to list branches"))?;

        rows.iter().map(row_to_branch).collect()
    }

    async fn set_default_branch(&self, artifact_id: Uuid, branch_id: Uuid) -> Result<Branch> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin transaction"))?;

        // Clear first: the partial unique index admits one default at a time.
        sqlx::query(
            "UPDATE branches SET is_default = 0 WHERE artifact_id = ? AND is_default = 1 AND id != ?",
        )
        .bind(artifact_id.to_string())
        .bind(branch_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to clear default branch"))?;

        let updated = sqlx::query("UPDATE branches SET is_default = 1 WHERE id = ? AND artifact_id = ?")
            .bind(branch_id.to_string())
            .bind(artifact_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to set default branch"))?;

        if updated.rows_affected() == 0 {
            // tx is rolled back on drop
            return Err(RegistryError::not_found("branch", branch_id));
        }

        let row = sqlx::query("SELECT * FROM branches WHERE id = ?")
            .bind(branch_id.to_string())
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err("Failed to reload branch"))?;
        let branch = row_to_branch(&row)?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit default branch"))?;

        Ok(branch)
    }

    async fn delete_branch(&self, branch_id: Uuid) -> Result<()> {
        let id = branch_id.to_string();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin transaction"))?;

        // versions.path_id is deferred, so paths can go before their versions
        let cascade = [
            (
                "logs",
                "DELETE FROM logs WHERE version_id IN (SELECT id FROM versions WHERE branch_id = ?)",
            ),
            (
                "lineages",
                "DELETE FROM lineages WHERE version_id IN (SELECT id FROM versions WHERE branch_id = ?)",
            ),
            (
                "paths",
                "DELETE FROM paths WHERE id IN (SELECT path_id FROM versions WHERE branch_id = ?)",
            ),
            ("versions", "DELETE FROM versions WHERE branch_id = ?"),
        ];

        for (what, sql) in cascade {
            let result = sqlx::query(sql)
                .bind(&id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    RegistryError::Persistence(format!("Failed to delete branch {}: {}", what, e))
                })?;
            debug!(branch_id = %branch_id, rows = result.rows_affected(), "deleted {}", what);
        }

        let result = sqlx::query("DELETE FROM branches WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to delete branch"))?;

        if result.rows_affected() == 0 {
            return Err(RegistryError::not_found("branch", branch_id));
        }

        tx.commit()
            .await
            .map_err(db_err("Failed to commit branch deletion"))?;

        Ok(())
    }

    async fn latest_label(&self, branch_id: Uuid) -> Result<Option<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT label FROM versions WHERE branch_id = ? ORDER BY seq DESC LIMIT 1",
        )
            .bind(branch_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to get latest version"))
    }

    async fn commit_version(&self, pending: &PendingVersion) -> Result<Version> {
        let branch_id = pending.branch_id.to_string();
        let path_id = Uuid::new_v4();
        let version_id = Uuid::new_v4();
        let created_at = OffsetDateTime::now_utc();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin transaction"))?;

        sqlx::query("INSERT INTO paths (id, source_path, source_type) VALUES (?, ?, ?)")
            .bind(path_id.to_string())
            .bind(&pending.source_path)
            .bind(&pending.source_type)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to save path"))?;

        let latest: Option<String> = sqlx::query_scalar(
            "SELECT label FROM versions WHERE branch_id = ? ORDER BY seq DESC LIMIT 1",
        )
        .bind(&branch_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err("Failed to get latest version"))?;

        let label = next_label(latest.as_deref())?;
        let seq = i64::try_from(label.number())
            .map_err(|_| RegistryError::MalformedLabel(label.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO versions (id, branch_id, seq, label, hash, path_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(version_id.to_string())
        .bind(&branch_id)
        .bind(seq)
        .bind(label.to_string())
        .bind(&pending.hash)
        .bind(path_id.to_string())
        .bind(format_ts(created_at)?)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RegistryError::DuplicateLabel {
                    branch_id: branch_id.clone(),
                    label: label.to_string(),
                }
            } else if is_foreign_key_violation(&e) {
                RegistryError::not_found("branch", pending.branch_id)
            } else {
                RegistryError::Persistence(format!("Failed to save version: {}", e))
            }
        })?;

        if let Some(lineage) = &pending.lineage {
            sqlx::query("INSERT INTO lineages (id, version_id, lineage) VALUES (?, ?, ?)")
                .bind(Uuid::new_v4().to_string())
                .bind(version_id.to_string())
                .bind(lineage)
                .execute(&mut *tx)
                .await
                .map_err(db_err("Failed to save lineage"))?;
        }

        tx.commit()
            .await
            .map_err(db_err("Failed to commit version"))?;

        Ok(Version {
            id: version_id,
            branch_id: pending.branch_id,
            label: label.to_string(),
            hash: pending.hash.clone(),
            path_id,
            created_at,
        })
    }

    async fn has_version_with_hash(&self, branch_id: Uuid, hash: &str) -> Result<bool> {
        let exists: i64 = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM versions WHERE branch_id = ? AND hash = ?)",
        )
        .bind(branch_id.to_string())
        .bind(hash)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to check version hash"))?;

        Ok(exists != 0)
    }

    async fn get_version(&self, id: Uuid) -> Result<Option<VersionDetails>> {
        let sql = format!("{} WHERE v.id = ?", VERSION_DETAILS_SELECT);
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to get version"))?;

        row.as_ref().map(row_to_details).transpose()
    }

    async fn find_version(&self, branch_id: Uuid, label: &str) -> Result<Option<VersionDetails>> {
        let sql = format!(
            "{} WHERE v.branch_id = ? AND v.label = ?",
            VERSION_DETAILS_SELECT
        );
        let row = sqlx::query(&sql)
            .bind(branch_id.to_string())
            .bind(label)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find version"))?;

        row.as_ref().map(row_to_details).transpose()
    }

    async fn list_branch_versions(&self, branch_id: Uuid) -> Result<Vec<VersionDetails>> {
        let sql = format!(
            "{} WHERE v.branch_id = ? ORDER BY v.seq",
            VERSION_DETAILS_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(branch_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to list branch versions"))?;

        rows.iter().map(row_to_details).collect()
    }

    async fn list_artifact_versions(&self, artifact_id: Uuid) -> Result<Vec<VersionDetails>> {
        let sql = format!(
            "{} WHERE b.artifact_id = ? ORDER BY b.rowid, v.seq",
            VERSION_DETAILS_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(artifact_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to list artifact versions"))?;

        rows.iter().map(row_to_details).collect()
    }

    async fn get_lineage(&self, version_id: Uuid) -> Result<Option<Lineage>> {
        let row = sqlx::query("SELECT id, version_id, lineage FROM lineages WHERE version_id = ?")
            .bind(version_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to get lineage"))?;

        match row {
            Some(row) => Ok(Some(Lineage {
                id: parse_uuid(&row.get::<String, _>("id"))?,
                version_id: parse_uuid(&row.get::<String, _>("version_id"))?,
                lineage: row.get("lineage"),
            })),
            None => Ok(None),
        }
    }

    async fn append_log(&self, log: &Log) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO logs (id, version_id, data, created_at)
            SELECT ?, ?, ?, ?
            WHERE EXISTS (SELECT 1 FROM versions WHERE id = ?)
        "#,
        )
        .bind(log.id.to_string())
        .bind(log.version_id.to_string())
        .bind(&log.data)
        .bind(format_ts(log.created_at)?)
        .bind(log.version_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to save log"))?;

        if result.rows_affected() == 0 {
            return Err(RegistryError::VersionNotFound(log.version_id.to_string()));
        }

        Ok(())
    }

    async fn list_logs(&self, version_id: Uuid) -> Result<Vec<Log>> {
        let rows = sqlx::query(
            "SELECT id, version_id, data, created_at FROM logs WHERE version_id = ? ORDER BY rowid",
        )
        .bind(version_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list logs"))?;

        rows.iter().map(row_to_log).collect()
    }
}
