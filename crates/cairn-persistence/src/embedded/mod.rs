// Embedded persistence backend using RocksDB
// Provides standalone (single-node) storage of group documents without an external database

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rocksdb::{DB, Direction, IteratorMode, Options, WriteOptions};
use tracing::{debug, info};

use cairn_api::CacheConfig;
use cairn_common::CLUSTER_GROUP;
use cairn_common::error::CairnError;

use crate::lock::{ConfigurationLock, LockOptions, LockService, LockToken};
use crate::model::StorageMode;
use crate::traits::{CacheConfigMutator, ConfigurationPersistence, lock_not_held};

/// Key prefix of group documents
const GROUP_KEY_PREFIX: &str = "group:";

/// Standalone embedded persistence using RocksDB
///
/// Each group document is stored as one JSON value under `group:<name>`.
/// Writes are synced before returning.
pub struct EmbeddedPersistService {
    db: Arc<DB>,
    lock: ConfigurationLock,
}

impl EmbeddedPersistService {
    /// Open (or create) a store at `path`
    pub fn open(path: impl AsRef<Path>, options: LockOptions) -> anyhow::Result<Self> {
        Self::open_with_lock(path, Arc::new(LockService::new()), options)
    }

    /// Open (or create) a store at `path` that takes the configuration lock
    /// from `lock_service`
    pub fn open_with_lock(
        path: impl AsRef<Path>,
        lock_service: Arc<LockService>,
        options: LockOptions,
    ) -> anyhow::Result<Self> {
        let mut db_options = Options::default();
        db_options.create_if_missing(true);

        let db = DB::open(&db_options, path.as_ref())
            .map_err(|e| anyhow::anyhow!("RocksDB open error: {}", e))?;
        info!(path = %path.as_ref().display(), "Embedded configuration store opened");

        Ok(Self::new(Arc::new(db), lock_service, options))
    }

    /// Create from a raw RocksDB instance
    pub fn new(db: Arc<DB>, lock_service: Arc<LockService>, options: LockOptions) -> Self {
        Self {
            db,
            lock: ConfigurationLock::new(lock_service, options),
        }
    }

    fn group_key(group: &str) -> String {
        format!("{}{}", GROUP_KEY_PREFIX, group)
    }

    fn read_document(&self, group: &str) -> anyhow::Result<Option<CacheConfig>> {
        let bytes = self
            .db
            .get(Self::group_key(group).as_bytes())
            .map_err(|e| anyhow::anyhow!("RocksDB get error: {}", e))?;

        match bytes {
            Some(bytes) => {
                let doc = serde_json::from_slice(&bytes).map_err(|e| {
                    CairnError::SerializationError(format!("group '{}': {}", group, e))
                })?;
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    fn write_document(&self, group: &str, doc: &CacheConfig) -> anyhow::Result<()> {
        let value = serde_json::to_vec(doc)
            .map_err(|e| CairnError::SerializationError(format!("group '{}': {}", group, e)))?;

        let mut write_options = WriteOptions::default();
        write_options.set_sync(true);
        self.db
            .put_opt(Self::group_key(group).as_bytes(), value, &write_options)
            .map_err(|e| anyhow::anyhow!("RocksDB put error: {}", e))
    }
}

#[async_trait]
impl ConfigurationPersistence for EmbeddedPersistService {
    fn storage_mode(&self) -> StorageMode {
        StorageMode::Embedded
    }

    async fn groups(&self) -> anyhow::Result<BTreeSet<String>> {
        let mut groups = BTreeSet::new();
        groups.insert(CLUSTER_GROUP.to_string());

        let iter = self.db.iterator(IteratorMode::From(
            GROUP_KEY_PREFIX.as_bytes(),
            Direction::Forward,
        ));
        for item in iter {
            let (key, _) = item.map_err(|e| anyhow::anyhow!("RocksDB iterator error: {}", e))?;
            let Some(group) = key.strip_prefix(GROUP_KEY_PREFIX.as_bytes()) else {
                break;
            };
            groups.insert(String::from_utf8_lossy(group).into_owned());
        }

        Ok(groups)
    }

    async fn cache_config(
        &self,
        group: &str,
        create_if_absent: bool,
    ) -> anyhow::Result<Option<CacheConfig>> {
        let doc = self.read_document(group)?;
        Ok(match doc {
            Some(doc) => Some(doc),
            None if create_if_absent => Some(CacheConfig::default()),
            None => None,
        })
    }

    async fn update_cache_config(
        &self,
        token: &LockToken,
        group: &str,
        mutator: CacheConfigMutator,
    ) -> anyhow::Result<()> {
        if !self.lock.is_held(token) {
            return Err(lock_not_held());
        }

        let mut doc = self.read_document(group)?.unwrap_or_default();
        mutator(&mut doc)?;
        self.write_document(group, &doc)?;

        debug!(group = %group, "Group configuration persisted");
        Ok(())
    }

    async fn lock(&self) -> Option<LockToken> {
        self.lock.lock().await
    }

    fn unlock(&self, token: &LockToken) {
        self.lock.unlock(token);
    }

    fn renew_lock(&self, token: &LockToken) -> bool {
        self.lock.renew(token)
    }

    fn lock_ttl(&self) -> Duration {
        self.lock.options().ttl
    }

    fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }
}
