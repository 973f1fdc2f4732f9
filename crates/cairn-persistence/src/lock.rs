// In-memory exclusive lock service
// Provides lock acquire/release with automatic expiry and bounded-wait acquisition

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, info};

/// Timing options for the configuration lock
#[derive(Clone, Debug)]
pub struct LockOptions {
    /// How long a holder keeps the lock before it expires
    pub ttl: Duration,
    /// How long an acquisition waits for a busy lock before giving up
    pub wait_timeout: Duration,
    /// Delay between acquisition attempts while waiting
    pub poll_interval: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            wait_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(20),
        }
    }
}

/// An acquired lock entry
pub(crate) struct LockEntry {
    owner: String,
    acquired_at: Instant,
    ttl: Duration,
}

impl LockEntry {
    fn is_expired(&self) -> bool {
        self.acquired_at.elapsed() > self.ttl
    }
}

/// Exclusive, non-reentrant lock service keyed by name
pub struct LockService {
    pub(crate) locks: Arc<DashMap<String, LockEntry>>,
}

impl Default for LockService {
    fn default() -> Self {
        Self::new()
    }
}

impl LockService {
    pub fn new() -> Self {
        Self {
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Spawn a background task that drops expired entries
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_expiry_task(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let locks = self.locks.clone();
        info!("LockService background expiry task started");
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let before = locks.len();
                locks.retain(|_, entry| !entry.is_expired());
                let removed = before.saturating_sub(locks.len());
                if removed > 0 {
                    debug!(count = removed, "Cleaned up expired lock entries");
                }
            }
        })
    }

    /// Acquire a lock for the given key
    ///
    /// Returns `true` if the lock was acquired, `false` if a live holder exists.
    /// A holder cannot re-acquire its own lock.
    pub fn acquire(&self, key: &str, owner: &str, ttl: Duration) -> bool {
        match self.locks.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if !occupied.get().is_expired() {
                    return false;
                }
                debug!(key = %key, previous = %occupied.get().owner, "Taking over expired lock");
                occupied.insert(LockEntry {
                    owner: owner.to_string(),
                    acquired_at: Instant::now(),
                    ttl,
                });
            }
            Entry::Vacant(vacant) => {
                vacant.insert(LockEntry {
                    owner: owner.to_string(),
                    acquired_at: Instant::now(),
                    ttl,
                });
            }
        }

        debug!(key = %key, owner = %owner, "Lock acquired");
        true
    }

    /// Acquire a lock, retrying until `options.wait_timeout` elapses
    pub async fn acquire_within(&self, key: &str, owner: &str, options: &LockOptions) -> bool {
        let deadline = Instant::now() + options.wait_timeout;
        loop {
            if self.acquire(key, owner, options.ttl) {
                return true;
            }
            if Instant::now() >= deadline {
                debug!(key = %key, owner = %owner, "Lock acquisition timed out");
                return false;
            }
            tokio::time::sleep(options.poll_interval).await;
        }
    }

    /// Release a lock for the given key
    ///
    /// Returns `true` if the lock was released, `false` if not held by this owner
    pub fn release(&self, key: &str, owner: &str) -> bool {
        let removed = self
            .locks
            .remove_if(key, |_, entry| entry.owner == owner)
            .is_some();
        if removed {
            debug!(key = %key, owner = %owner, "Lock released");
        }
        removed
    }

    /// Whether `owner` currently holds an unexpired lock on `key`
    pub fn is_held_by(&self, key: &str, owner: &str) -> bool {
        self.locks
            .get(key)
            .is_some_and(|entry| entry.owner == owner && !entry.is_expired())
    }

    /// Whether any holder currently has an unexpired lock on `key`
    pub fn is_locked(&self, key: &str) -> bool {
        self.locks.get(key).is_some_and(|entry| !entry.is_expired())
    }

    /// Restart the TTL of a lock still held by `owner`
    ///
    /// Returns `false` once the entry was released, expired away or taken over.
    pub fn renew(&self, key: &str, owner: &str) -> bool {
        match self.locks.get_mut(key) {
            Some(mut entry) if entry.owner == owner => {
                entry.acquired_at = Instant::now();
                true
            }
            _ => false,
        }
    }
}

/// Proof of one acquisition of the configuration lock
///
/// Every acquisition draws a fresh token. Writes, renewals and the release
/// only succeed for the token that currently holds the lock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockToken(String);

impl LockToken {
    fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LockToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The cluster configuration lock as used by a store
pub struct ConfigurationLock {
    service: Arc<LockService>,
    options: LockOptions,
}

impl ConfigurationLock {
    pub fn new(service: Arc<LockService>, options: LockOptions) -> Self {
        Self { service, options }
    }

    pub fn options(&self) -> &LockOptions {
        &self.options
    }

    pub async fn lock(&self) -> Option<LockToken> {
        let token = LockToken::generate();
        self.service
            .acquire_within(crate::CONFIGURATION_LOCK_KEY, token.as_str(), &self.options)
            .await
            .then_some(token)
    }

    pub fn unlock(&self, token: &LockToken) {
        self.service
            .release(crate::CONFIGURATION_LOCK_KEY, token.as_str());
    }

    pub fn renew(&self, token: &LockToken) -> bool {
        self.service
            .renew(crate::CONFIGURATION_LOCK_KEY, token.as_str())
    }

    pub fn is_held(&self, token: &LockToken) -> bool {
        self.service
            .is_held_by(crate::CONFIGURATION_LOCK_KEY, token.as_str())
    }

    pub fn is_locked(&self) -> bool {
        self.service.is_locked(crate::CONFIGURATION_LOCK_KEY)
    }
}
