//! The document store handle and its single-writer worker task.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Duration;
use tracing::{error, info, warn};

use super::debounce::Debounce;
use super::document::Database;
use super::error::{StoreError, StoreResult};
use crate::CONSOLE_TARGET;

/// How long rapid successive mutations are coalesced before the document is
/// committed to disk.
const FLUSH_DEBOUNCE: Duration = Duration::from_millis(100);

const REQUEST_BUFFER: usize = 256;

type ReadOp = Box<dyn FnOnce(&Database) + Send>;
// Returns whether the document changed and needs a flush.
type MutateOp = Box<dyn FnOnce(&mut Database) -> bool + Send>;

enum StoreRequest {
    Read(ReadOp),
    Mutate(MutateOp),
    Flush(oneshot::Sender<StoreResult<()>>),
}

/// Handle to the single-writer document store. Cheap to clone; all clones
/// feed the same FIFO queue, so mutations commit in submission order with at
/// most one write in flight.
#[derive(Clone)]
pub struct DocumentStore {
    tx: mpsc::Sender<StoreRequest>,
    path: PathBuf,
}

impl DocumentStore {
    /// Load (or recover) the document at `path` and start the writer task.
    ///
    /// A missing file yields a fresh empty document. An unreadable file is
    /// preserved as a timestamped backup, logged, and replaced by an empty
    /// document; corruption is degraded-but-alive, never fatal.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let database = load_or_recover(&path).await?;
        let (tx, rx) = mpsc::channel(REQUEST_BUFFER);
        tokio::spawn(writer_task(path.clone(), database, rx));
        Ok(Self { tx, path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a closure against the latest committed state.
    pub async fn read<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Database) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let op: ReadOp = Box::new(move |db| {
            let _ = reply_tx.send(f(db));
        });
        self.tx
            .send(StoreRequest::Read(op))
            .await
            .map_err(|_| StoreError::Unavailable("writer task stopped".to_string()))?;
        reply_rx
            .await
            .map_err(|_| StoreError::Unavailable("writer task dropped the request".to_string()))
    }

    /// Queue a mutation. The closure sees the latest committed state; its
    /// delta is applied atomically with respect to all other operations. A
    /// closure returning `Err` must leave the document untouched.
    pub async fn mutate<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Database) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let op: MutateOp = Box::new(move |db| {
            let result = f(db);
            let dirty = result.is_ok();
            let _ = reply_tx.send(result);
            dirty
        });
        self.tx
            .send(StoreRequest::Mutate(op))
            .await
            .map_err(|_| StoreError::Unavailable("writer task stopped".to_string()))?;
        reply_rx
            .await
            .map_err(|_| StoreError::Unavailable("writer task dropped the request".to_string()))?
    }

    /// Force a commit of any coalesced state, e.g. at shutdown or in tests.
    pub async fn flush(&self) -> StoreResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StoreRequest::Flush(reply_tx))
            .await
            .map_err(|_| StoreError::Unavailable("writer task stopped".to_string()))?;
        reply_rx
            .await
            .map_err(|_| StoreError::Unavailable("writer task dropped the request".to_string()))?
    }
}

async fn writer_task(
    path: PathBuf,
    mut database: Database,
    mut rx: mpsc::Receiver<StoreRequest>,
) {
    let mut flush_window = Debounce::new(FLUSH_DEBOUNCE);

    loop {
        tokio::select! {
            request = rx.recv() => match request {
                Some(StoreRequest::Read(op)) => op(&database),
                Some(StoreRequest::Mutate(op)) => {
                    if op(&mut database) {
                        // Coalesce: only the last state in the window hits disk
                        flush_window.touch();
                    }
                }
                Some(StoreRequest::Flush(reply)) => {
                    let result = persist(&path, &database).await;
                    if result.is_ok() {
                        flush_window.clear();
                    }
                    let _ = reply.send(result);
                }
                None => {
                    if flush_window.pending()
                        && let Err(e) = persist(&path, &database).await
                    {
                        error!(target: CONSOLE_TARGET, error = %e, "Final document flush failed");
                    }
                    break;
                }
            },
            () = flush_window.expired(), if flush_window.pending() => {
                if let Err(e) = persist(&path, &database).await {
                    // Keep running; the next window retries with newer state
                    error!(target: CONSOLE_TARGET, error = %e, "Document flush failed");
                }
                flush_window.clear();
            }
        }
    }
}

/// Atomic replace: serialize next to the document, then rename over it.
async fn persist(path: &Path, database: &Database) -> StoreResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(database)?;
    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

async fn load_or_recover(path: &Path) -> StoreResult<Database> {
    let content = match tokio::fs::read(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(target: CONSOLE_TARGET, path = %path.display(), "No document found, starting empty");
            return Ok(Database::default());
        }
        Err(e) => return Err(e.into()),
    };

    if content.iter().all(u8::is_ascii_whitespace) {
        backup_unreadable(path, "empty").await?;
        return Ok(Database::default());
    }

    match serde_json::from_slice(&content) {
        Ok(database) => Ok(database),
        Err(e) => {
            warn!(target: CONSOLE_TARGET, error = %e, "Document failed to parse");
            backup_unreadable(path, "unparseable").await?;
            Ok(Database::default())
        }
    }
}

async fn backup_unreadable(path: &Path, condition: &str) -> StoreResult<()> {
    let backup_path = path.with_extension(format!(
        "corrupt-{}.json",
        Utc::now().format("%Y%m%dT%H%M%S%3f")
    ));
    tokio::fs::rename(path, &backup_path).await?;
    warn!(
        target: CONSOLE_TARGET,
        path = %path.display(),
        backup = %backup_path.display(),
        condition,
        "Preserved unreadable document and reinitialized empty"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Group, GroupMembership};

    fn temp_db_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("db.json")
    }

    #[tokio::test]
    async fn test_mutations_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_db_path(&dir);

        let store = DocumentStore::open(&path).await.unwrap();
        let group = Group::new("ext-g", "room", "");
        let group_id = group.id.clone();
        store
            .mutate(move |db| {
                db.groups.insert(group.id.clone(), group);
                Ok(())
            })
            .await
            .unwrap();
        store.flush().await.unwrap();

        let reopened = DocumentStore::open(&path).await.unwrap();
        let found = reopened
            .read(move |db| db.groups.contains_key(&group_id))
            .await
            .unwrap();
        assert!(found);
    }

    #[tokio::test]
    async fn test_concurrent_mutations_fold_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(temp_db_path(&dir)).await.unwrap();

        let membership = GroupMembership::new("g-1", "m-1", false);
        let membership_id = membership.id.clone();
        store
            .mutate(move |db| {
                db.memberships.insert(membership.id.clone(), membership);
                Ok(())
            })
            .await
            .unwrap();

        // N concurrent submissions: none lost, none applied twice
        let mut handles = Vec::new();
        for _ in 0..64 {
            let store = store.clone();
            let id = membership_id.clone();
            handles.push(tokio::spawn(async move {
                store
                    .mutate(move |db| {
                        let membership = db
                            .memberships
                            .get_mut(&id)
                            .ok_or_else(|| StoreError::not_found("membership", id.clone()))?;
                        membership.message_count += 1;
                        Ok(())
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        store.flush().await.unwrap();

        // The on-disk document equals the fold of all 64 operations
        let reopened = DocumentStore::open(store.path().to_path_buf()).await.unwrap();
        let count = reopened
            .read(move |db| db.memberships[&membership_id].message_count)
            .await
            .unwrap();
        assert_eq!(count, 64);
    }

    #[tokio::test]
    async fn test_failed_mutation_does_not_dirty_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_db_path(&dir);
        let store = DocumentStore::open(&path).await.unwrap();

        let result: StoreResult<()> = store
            .mutate(|_| Err(StoreError::not_found("group", "missing")))
            .await;
        assert!(result.unwrap_err().is_not_found());

        store.flush().await.unwrap();
        let on_disk: Database =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert!(on_disk.groups.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_document_is_backed_up_and_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_db_path(&dir);
        std::fs::write(&path, b"{ this is not json").unwrap();

        let store = DocumentStore::open(&path).await.unwrap();
        let empty = store.read(|db| db.groups.is_empty()).await.unwrap();
        assert!(empty);

        let backups: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .contains("corrupt-")
            })
            .collect();
        assert_eq!(backups.len(), 1);
        let backed_up = std::fs::read(backups[0].path()).unwrap();
        assert_eq!(backed_up, b"{ this is not json");
    }

    #[tokio::test]
    async fn test_empty_document_is_treated_as_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_db_path(&dir);
        std::fs::write(&path, b"  \n").unwrap();

        let store = DocumentStore::open(&path).await.unwrap();
        assert!(store.read(|db| db.members.is_empty()).await.unwrap());
    }

    #[tokio::test]
    async fn test_rapid_writes_coalesce_into_one_commit() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_db_path(&dir);
        let store = DocumentStore::open(&path).await.unwrap();

        for i in 0..10u64 {
            let group = Group::new(format!("ext-{i}"), "room", "");
            store
                .mutate(move |db| {
                    db.groups.insert(group.id.clone(), group);
                    Ok(())
                })
                .await
                .unwrap();
        }
        // Inside the debounce window nothing has been committed yet
        assert!(!path.exists());

        tokio::time::sleep(FLUSH_DEBOUNCE * 3).await;
        let on_disk: Database =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(on_disk.groups.len(), 10);
    }
}
