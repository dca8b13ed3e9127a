//! Durable identity lists (admins, banned users).
//!
//! Each store owns one JSON file holding the whole collection. The file is the
//! unit of read and write: every mutation rewrites the full list through a
//! temp file + rename so a crash mid-write leaves the previous list intact.
//!
//! The in-memory copy is guarded by a single async mutex that both the
//! suspending (`add`, `remove`, `contains`) and the blocking (`*_blocking`)
//! variants go through, so concurrent read-modify-write cycles are serialized
//! and no update is lost.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tokio::sync::Mutex;

use crate::{
    domain::{Identity, UserId},
    errors::Error,
    Result,
};

#[derive(Debug)]
pub struct IdentityStore {
    name: String,
    path: PathBuf,
    users: Mutex<Vec<Identity>>,
}

impl IdentityStore {
    /// Load the collection from `path`. A missing or empty file is an empty set.
    pub fn open(name: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self> {
        let name = name.into();
        let path = path.into();

        let txt = match fs::read_to_string(&path) {
            Ok(txt) => txt,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => return Err(Error::storage(&path, e)),
        };
        let users = dedupe(&name, parse_users(&path, &txt)?);

        tracing::info!(
            store = %name,
            path = %path.display(),
            count = users.len(),
            "identity store loaded"
        );

        Ok(Self {
            name,
            path,
            users: Mutex::new(users),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert `identity` unless its id is already present. Returns `false` on duplicates.
    pub async fn add(&self, identity: Identity) -> Result<bool> {
        let mut users = self.users.lock().await;
        if users.iter().any(|u| u.id == identity.id) {
            return Ok(false);
        }

        let mut next = users.clone();
        next.push(identity);
        persist_async(&self.path, &next).await?;
        *users = next;
        Ok(true)
    }

    /// Remove the identity with `id`. Returns `false` if it was absent.
    pub async fn remove(&self, id: UserId) -> Result<bool> {
        let mut users = self.users.lock().await;
        let Some(idx) = users.iter().position(|u| u.id == id.0) else {
            return Ok(false);
        };

        let mut next = users.clone();
        next.remove(idx);
        persist_async(&self.path, &next).await?;
        *users = next;
        Ok(true)
    }

    pub async fn contains(&self, id: UserId) -> bool {
        self.users.lock().await.iter().any(|u| u.id == id.0)
    }

    pub async fn list(&self) -> Vec<Identity> {
        self.users.lock().await.clone()
    }

    /// Bootstrap: add `ids` only when the collection is empty. Returns how
    /// many were added.
    pub async fn seed_if_empty(&self, ids: &[i64]) -> Result<usize> {
        let mut users = self.users.lock().await;
        if !users.is_empty() || ids.is_empty() {
            return Ok(0);
        }

        let next = dedupe(&self.name, ids.iter().copied().map(Identity::new).collect());
        persist_async(&self.path, &next).await?;
        let added = next.len();
        *users = next;
        tracing::info!(store = %self.name, added, "seeded empty identity store");
        Ok(added)
    }

    /// Blocking variant of [`IdentityStore::add`].
    ///
    /// Must be called from a plain thread (e.g. the operator console), never
    /// from inside an async task.
    pub fn add_blocking(&self, identity: Identity) -> Result<bool> {
        let mut users = self.users.blocking_lock();
        if users.iter().any(|u| u.id == identity.id) {
            return Ok(false);
        }

        let mut next = users.clone();
        next.push(identity);
        persist(&self.path, &next)?;
        *users = next;
        Ok(true)
    }

    /// Blocking variant of [`IdentityStore::remove`].
    pub fn remove_blocking(&self, id: UserId) -> Result<bool> {
        let mut users = self.users.blocking_lock();
        let Some(idx) = users.iter().position(|u| u.id == id.0) else {
            return Ok(false);
        };

        let mut next = users.clone();
        next.remove(idx);
        persist(&self.path, &next)?;
        *users = next;
        Ok(true)
    }

    /// Blocking variant of [`IdentityStore::contains`].
    pub fn contains_blocking(&self, id: UserId) -> bool {
        self.users.blocking_lock().iter().any(|u| u.id == id.0)
    }

    pub fn list_blocking(&self) -> Vec<Identity> {
        self.users.blocking_lock().clone()
    }
}

fn parse_users(path: &Path, txt: &str) -> Result<Vec<Identity>> {
    if txt.trim().is_empty() {
        return Ok(Vec::new());
    }
    // `null` is what an empty list looked like in older files.
    let users: Option<Vec<Identity>> =
        serde_json::from_str(txt).map_err(|e| Error::storage(path, e))?;
    Ok(users.unwrap_or_default())
}

fn dedupe(name: &str, users: Vec<Identity>) -> Vec<Identity> {
    let mut out: Vec<Identity> = Vec::with_capacity(users.len());
    for u in users {
        if out.iter().any(|seen| seen.id == u.id) {
            tracing::warn!(store = %name, id = u.id, "dropping duplicate identity on load");
            continue;
        }
        out.push(u);
    }
    out
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".tmp");
    PathBuf::from(os)
}

fn persist(path: &Path, users: &[Identity]) -> Result<()> {
    let txt = serde_json::to_string(users)?;
    let tmp = tmp_path(path);
    fs::write(&tmp, txt).map_err(|e| Error::storage(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| Error::storage(path, e))?;
    Ok(())
}

async fn persist_async(path: &Path, users: &[Identity]) -> Result<()> {
    let txt = serde_json::to_string(users)?;
    let tmp = tmp_path(path);
    tokio::fs::write(&tmp, txt)
        .await
        .map_err(|e| Error::storage(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| Error::storage(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{sync::Arc, time::Duration};

    fn tmp_file(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_nanos();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}.json"))
    }

    fn user(id: i64) -> Identity {
        Identity {
            id,
            first_name: Some(format!("user{id}")),
            last_name: None,
            user_name: None,
        }
    }

    #[test]
    fn missing_and_empty_files_are_empty_sets() {
        let missing = tmp_file("isb-store-missing");
        let store = IdentityStore::open("admins", &missing).unwrap();
        assert!(store.list_blocking().is_empty());

        let empty = tmp_file("isb-store-empty");
        fs::write(&empty, "").unwrap();
        assert!(IdentityStore::open("admins", &empty)
            .unwrap()
            .list_blocking()
            .is_empty());

        let null = tmp_file("isb-store-null");
        fs::write(&null, "null").unwrap();
        assert!(IdentityStore::open("admins", &null)
            .unwrap()
            .list_blocking()
            .is_empty());
    }

    #[test]
    fn malformed_file_is_a_storage_error() {
        let path = tmp_file("isb-store-bad");
        fs::write(&path, "{not json").unwrap();
        let err = IdentityStore::open("banned", &path).unwrap_err();
        assert!(matches!(err, Error::Storage { .. }));
    }

    #[tokio::test]
    async fn add_rejects_duplicates() {
        let store = IdentityStore::open("banned", tmp_file("isb-store-dup")).unwrap();
        assert!(store.add(user(1)).await.unwrap());
        assert!(!store.add(user(1)).await.unwrap());
        assert_eq!(store.list().await.len(), 1);
    }

    #[tokio::test]
    async fn add_remove_contains_round_trip() {
        let store = IdentityStore::open("banned", tmp_file("isb-store-rt")).unwrap();
        assert!(store.add(user(5)).await.unwrap());
        assert!(store.contains(UserId(5)).await);
        assert!(store.remove(UserId(5)).await.unwrap());
        assert!(!store.contains(UserId(5)).await);
        assert!(!store.remove(UserId(5)).await.unwrap());
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn mutations_survive_reopen() {
        let path = tmp_file("isb-store-reopen");
        {
            let store = IdentityStore::open("admins", &path).unwrap();
            store.add(user(1)).await.unwrap();
            store.add(user(2)).await.unwrap();
            store.remove(UserId(1)).await.unwrap();
        }
        let reopened = IdentityStore::open("admins", &path).unwrap();
        assert_eq!(reopened.list().await, vec![user(2)]);
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn blocking_variants_share_state_with_async_ones() {
        let path = tmp_file("isb-store-blocking");
        let store = IdentityStore::open("admins", &path).unwrap();
        assert!(store.add_blocking(user(9)).unwrap());
        assert!(!store.add_blocking(user(9)).unwrap());
        assert!(store.contains_blocking(UserId(9)));

        let rt = tokio::runtime::Runtime::new().unwrap();
        assert!(rt.block_on(store.contains(UserId(9))));
        assert!(store.remove_blocking(UserId(9)).unwrap());
        assert!(!store.remove_blocking(UserId(9)).unwrap());
    }

    #[test]
    fn duplicate_ids_on_disk_are_collapsed() {
        let path = tmp_file("isb-store-dedupe");
        fs::write(&path, r#"[{"Id":3},{"Id":3,"FirstName":"x"},{"Id":4}]"#).unwrap();
        let store = IdentityStore::open("banned", &path).unwrap();
        let ids: Vec<i64> = store.list_blocking().iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_are_not_lost() {
        let store = Arc::new(IdentityStore::open("banned", tmp_file("isb-store-race")).unwrap());
        let mut tasks = Vec::new();
        for id in 0..32 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move { store.add(user(id)).await }));
        }
        for t in tasks {
            assert!(t.await.unwrap().unwrap());
        }

        let reopened = IdentityStore::open("banned", store.path()).unwrap();
        assert_eq!(reopened.list().await.len(), 32);
    }

    #[tokio::test]
    async fn seeding_only_touches_an_empty_store() {
        let store = IdentityStore::open("admins", tmp_file("isb-store-seed")).unwrap();
        assert_eq!(store.seed_if_empty(&[7, 7, 8]).await.unwrap(), 2);
        assert_eq!(store.seed_if_empty(&[9]).await.unwrap(), 0);

        let ids: Vec<i64> = store.list().await.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![7, 8]);
    }

    /// A store whose directory disappears after it was opened.
    fn orphaned_store(prefix: &str, seed: &[i64]) -> IdentityStore {
        let dir = tmp_file(prefix).with_extension("");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("BannedUsers.json");
        let users: Vec<Identity> = seed.iter().copied().map(user).collect();
        fs::write(&path, serde_json::to_string(&users).unwrap()).unwrap();
        let store = IdentityStore::open("banned", &path).unwrap();
        fs::remove_dir_all(&dir).unwrap();
        store
    }

    #[tokio::test]
    async fn failed_writes_leave_memory_unchanged() {
        let store = orphaned_store("isb-store-gone", &[7]);

        assert!(matches!(store.add(user(1)).await, Err(Error::Storage { .. })));
        assert!(!store.contains(UserId(1)).await);

        assert!(matches!(store.remove(UserId(7)).await, Err(Error::Storage { .. })));
        assert!(store.contains(UserId(7)).await);
        assert_eq!(store.list().await, vec![user(7)]);
    }

    #[test]
    fn failed_blocking_writes_leave_memory_unchanged() {
        let store = orphaned_store("isb-store-gone-sync", &[7]);

        assert!(matches!(store.add_blocking(user(1)), Err(Error::Storage { .. })));
        assert!(!store.contains_blocking(UserId(1)));

        assert!(matches!(store.remove_blocking(UserId(7)), Err(Error::Storage { .. })));
        assert!(store.contains_blocking(UserId(7)));
    }
}
