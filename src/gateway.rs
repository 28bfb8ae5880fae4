//! The record store gateway: a CRUD façade over the persisted bug collection.
//!
//! [`LocalGateway`] talks to SQLite directly and backs the HTTP server;
//! [`crate::client::HttpGateway`] talks to that server over the network.

use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::db::Database;
use crate::error::{BugError, Result};
use crate::models::{BugReport, CreateBugRequest, Metadata, Priority, Status};

/// Longest description the store accepts, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 1000;

#[async_trait]
pub trait BugGateway: Send + Sync {
    /// Persist a new bug. The store assigns `id` and `createdAt`.
    async fn create(&self, request: CreateBugRequest) -> Result<BugReport>;

    /// Every stored bug, newest first.
    async fn list(&self) -> Result<Vec<BugReport>>;

    async fn get(&self, id: i64) -> Result<BugReport>;

    async fn update_status(&self, id: i64, status: Status) -> Result<BugReport>;

    async fn update_priority(&self, id: i64, priority: Priority) -> Result<BugReport>;

    /// Merge keys into the bug's metadata; existing keys are overwritten.
    async fn update_metadata(&self, id: i64, metadata: Metadata) -> Result<BugReport>;

    /// Hard delete. Deleting an id that is not there is an error, including
    /// a second delete of the same id.
    async fn delete(&self, id: i64) -> Result<()>;
}

/// Checks the store applies before inserting anything.
pub fn validate_create(request: &CreateBugRequest) -> Result<()> {
    if request.title.trim().is_empty() {
        return Err(BugError::validation("title", "Title is required"));
    }

    if let Some(description) = &request.description {
        if description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(BugError::validation(
                "description",
                format!(
                    "Description must be at most {} characters",
                    MAX_DESCRIPTION_CHARS
                ),
            ));
        }
    }

    Ok(())
}

/// Gateway over a local SQLite database.
#[derive(Clone)]
pub struct LocalGateway {
    db: Arc<Mutex<Database>>,
}

impl LocalGateway {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::open(path).map_err(|e| BugError::Persistence(format!("{:#}", e)))?;
        info!(path = %path.display(), "opened bug database");
        Ok(Self::new(db))
    }

    /// Run `f` against the database on the blocking pool.
    async fn with_db<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let guard = db
                .lock()
                .map_err(|_| BugError::Persistence("database lock poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| BugError::Persistence(e.to_string()))?
    }
}

fn persistence(err: anyhow::Error) -> BugError {
    BugError::Persistence(format!("{:#}", err))
}

fn retrieval(err: anyhow::Error) -> BugError {
    BugError::Retrieval(format!("{:#}", err))
}

fn fetch(db: &Database, id: i64) -> Result<BugReport> {
    db.get_bug(id)
        .map_err(retrieval)?
        .ok_or(BugError::NotFound { id })
}

#[async_trait]
impl BugGateway for LocalGateway {
    async fn create(&self, request: CreateBugRequest) -> Result<BugReport> {
        validate_create(&request)?;

        let bug = self
            .with_db(move |db| {
                let id = db.create_bug(&request).map_err(persistence)?;
                fetch(db, id)
            })
            .await?;

        info!(id = bug.id, priority = %bug.priority, "created bug");
        Ok(bug)
    }

    async fn list(&self) -> Result<Vec<BugReport>> {
        let bugs = self
            .with_db(|db| db.list_bugs().map_err(retrieval))
            .await?;
        debug!(count = bugs.len(), "listed bugs");
        Ok(bugs)
    }

    async fn get(&self, id: i64) -> Result<BugReport> {
        self.with_db(move |db| fetch(db, id)).await
    }

    async fn update_status(&self, id: i64, status: Status) -> Result<BugReport> {
        let bug = self
            .with_db(move |db| {
                if !db.update_status(id, status).map_err(persistence)? {
                    return Err(BugError::NotFound { id });
                }
                fetch(db, id)
            })
            .await?;
        info!(id, %status, "updated bug status");
        Ok(bug)
    }

    async fn update_priority(&self, id: i64, priority: Priority) -> Result<BugReport> {
        let bug = self
            .with_db(move |db| {
                if !db.update_priority(id, priority).map_err(persistence)? {
                    return Err(BugError::NotFound { id });
                }
                fetch(db, id)
            })
            .await?;
        info!(id, %priority, "updated bug priority");
        Ok(bug)
    }

    async fn update_metadata(&self, id: i64, metadata: Metadata) -> Result<BugReport> {
        let keys = metadata.len();
        let bug = self
            .with_db(move |db| {
                if !db.merge_metadata(id, &metadata).map_err(persistence)? {
                    return Err(BugError::NotFound { id });
                }
                fetch(db, id)
            })
            .await?;
        info!(id, keys, "merged bug metadata");
        Ok(bug)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.with_db(move |db| {
            if db.delete_bug(id).map_err(persistence)? {
                Ok(())
            } else {
                Err(BugError::NotFound { id })
            }
        })
        .await?;
        info!(id, "deleted bug");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetadataValue;
    use tempfile::tempdir;

    fn setup_gateway() -> (LocalGateway, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let gateway = LocalGateway::open(&dir.path().join("test.db")).unwrap();
        (gateway, dir)
    }

    #[tokio::test]
    async fn test_create_returns_stored_record() {
        let (gateway, _dir) = setup_gateway();

        let bug = gateway.create(CreateBugRequest::new("Test Bug")).await.unwrap();

        assert!(bug.id > 0);
        assert_eq!(bug.title, "Test Bug");
        assert_eq!(bug.status, Status::Open);
        assert_eq!(bug.priority, Priority::Medium);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_title() {
        let (gateway, _dir) = setup_gateway();

        let err = gateway.create(CreateBugRequest::new(" \t\n")).await.unwrap_err();

        assert!(matches!(err, BugError::Validation { field: "title", .. }));
        assert!(gateway.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_long_description() {
        let (gateway, _dir) = setup_gateway();
        let mut request = CreateBugRequest::new("Long");
        request.description = Some("x".repeat(MAX_DESCRIPTION_CHARS + 1));

        let err = gateway.create(request).await.unwrap_err();
        assert!(matches!(err, BugError::Validation { field: "description", .. }));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (gateway, _dir) = setup_gateway();
        let err = gateway.get(404).await.unwrap_err();
        assert!(matches!(err, BugError::NotFound { id: 404 }));
    }

    #[tokio::test]
    async fn test_update_status_returns_updated_record() {
        let (gateway, _dir) = setup_gateway();
        let bug = gateway.create(CreateBugRequest::new("Test")).await.unwrap();

        let updated = gateway.update_status(bug.id, Status::InProgress).await.unwrap();

        assert_eq!(updated.status, Status::InProgress);
        assert_eq!(updated.created_at, bug.created_at);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let (gateway, _dir) = setup_gateway();

        assert!(matches!(
            gateway.update_status(9, Status::Closed).await,
            Err(BugError::NotFound { id: 9 })
        ));
        assert!(matches!(
            gateway.update_priority(9, Priority::High).await,
            Err(BugError::NotFound { id: 9 })
        ));
        assert!(matches!(
            gateway.update_metadata(9, Metadata::new()).await,
            Err(BugError::NotFound { id: 9 })
        ));
    }

    #[tokio::test]
    async fn test_update_metadata_merges() {
        let (gateway, _dir) = setup_gateway();
        let mut request = CreateBugRequest::new("Test");
        request.metadata = Some(Metadata::from([("initialKey".to_string(), MetadataValue::from("initialValue"))]));
        let bug = gateway.create(request).await.unwrap();

        let updated = gateway
            .update_metadata(
                bug.id,
                Metadata::from([("updatedKey".to_string(), MetadataValue::from("updatedValue"))]),
            )
            .await
            .unwrap();

        let metadata = updated.metadata.unwrap();
        assert_eq!(metadata["initialKey"], MetadataValue::from("initialValue"));
        assert_eq!(metadata["updatedKey"], MetadataValue::from("updatedValue"));
    }

    #[tokio::test]
    async fn test_delete_nonexistent_leaves_list_unchanged() {
        let (gateway, _dir) = setup_gateway();
        gateway.create(CreateBugRequest::new("Keep me")).await.unwrap();
        let before = gateway.list().await.unwrap();

        let err = gateway.delete(99999).await.unwrap_err();

        assert!(matches!(err, BugError::NotFound { id: 99999 }));
        assert_eq!(gateway.list().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_repeated_delete_fails() {
        let (gateway, _dir) = setup_gateway();
        let bug = gateway.create(CreateBugRequest::new("Once")).await.unwrap();

        gateway.delete(bug.id).await.unwrap();
        assert!(matches!(
            gateway.delete(bug.id).await,
            Err(BugError::NotFound { .. })
        ));
    }
}
