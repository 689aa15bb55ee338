use crate::domain::payment::{FinalizeOutcome, PaymentRecord, PaymentStatus};
use crate::error::GatewayError;
use crate::repo::payments_repo::PaymentRecordRepo;
use anyhow::Result;
use dashmap::DashMap;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    Token(String),
    TransactionId(String),
}

pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

struct CacheState {
    /// Least recently used entries are evicted once capacity is reached.
    entries: LruCache<CacheKey, PaymentRecord>,
    /// Bumped on every invalidation so a read that raced a write does not repopulate stale data.
    generation: u64,
}

/// Read-through cache over a [`PaymentRecordRepo`] with per-token write serialization.
///
/// Reads by token and by transaction id are cached. Writes go through a
/// [`TokenLock`], which invalidates every cached entry of the token before the
/// lock is released.
#[derive(Clone)]
pub struct CachedRecordStore {
    repo: Arc<dyn PaymentRecordRepo>,
    cache: Arc<RwLock<CacheState>>,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl CachedRecordStore {
    pub fn new(repo: Arc<dyn PaymentRecordRepo>) -> Self {
        Self::with_capacity(repo, DEFAULT_CACHE_CAPACITY)
    }

    /// A capacity of zero is treated as one.
    pub fn with_capacity(repo: Arc<dyn PaymentRecordRepo>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            repo,
            cache: Arc::new(RwLock::new(CacheState {
                entries: LruCache::new(capacity),
                generation: 0,
            })),
            locks: Arc::new(DashMap::new()),
        }
    }

    pub async fn cached_len(&self) -> usize {
        self.cache.read().await.entries.len()
    }

    pub async fn get_by_token(&self, token: &str) -> Result<Option<PaymentRecord>> {
        let key = CacheKey::Token(token.to_string());
        let (hit, generation) = self.cached(&key).await;
        if hit.is_some() {
            return Ok(hit);
        }

        let found = self.repo.find_by_token(token).await?;
        self.populate(key, &found, generation).await;
        Ok(found)
    }

    pub async fn get_by_transaction_id(&self, transaction_id: &str) -> Result<Option<PaymentRecord>> {
        let key = CacheKey::TransactionId(transaction_id.to_string());
        let (hit, generation) = self.cached(&key).await;
        if hit.is_some() {
            return Ok(hit);
        }

        let found = self.repo.find_by_transaction_id(transaction_id).await?;
        self.populate(key, &found, generation).await;
        Ok(found)
    }

    /// Waits for exclusive write access to `token`.
    pub async fn lock(&self, token: &str) -> TokenLock {
        let mutex = self
            .locks
            .entry(token.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        TokenLock {
            store: self.clone(),
            token: token.to_string(),
            guard: Some(guard),
        }
    }

    pub async fn create_pending(
        &self,
        token: &str,
        intent_id: i64,
        paybylink_url: &str,
    ) -> Result<PaymentRecord, GatewayError> {
        self.lock(token).await.create_pending(intent_id, paybylink_url).await
    }

    pub async fn finalize(
        &self,
        token: &str,
        status: PaymentStatus,
        transaction_id: Option<&str>,
    ) -> Result<FinalizeOutcome> {
        self.lock(token).await.finalize(status, transaction_id).await
    }

    pub async fn delete(&self, token: &str) -> Result<Option<PaymentRecord>> {
        self.lock(token).await.delete().await
    }

    async fn cached(&self, key: &CacheKey) -> (Option<PaymentRecord>, u64) {
        let mut cache = self.cache.write().await;
        let hit = cache.entries.get(key).cloned();
        (hit, cache.generation)
    }

    async fn populate(&self, key: CacheKey, found: &Option<PaymentRecord>, generation: u64) {
        let Some(record) = found else {
            return;
        };
        let mut cache = self.cache.write().await;
        if cache.generation == generation {
            cache.entries.put(key, record.clone());
        }
    }

    async fn invalidate(&self, token: &str, transaction_ids: &[Option<&str>]) {
        let mut cache = self.cache.write().await;
        cache.generation += 1;
        let stale: Vec<CacheKey> = cache
            .entries
            .iter()
            .filter(|(key, record)| {
                record.token == token
                    || match key {
                        CacheKey::Token(t) => t == token,
                        CacheKey::TransactionId(id) => {
                            transaction_ids.iter().flatten().any(|t| *t == id.as_str())
                        }
                    }
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            cache.entries.pop(&key);
        }
    }
}

/// Exclusive write access to one token's record. Released on drop.
pub struct TokenLock {
    store: CachedRecordStore,
    token: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl TokenLock {
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Current stored state, bypassing the cache.
    pub async fn current(&self) -> Result<Option<PaymentRecord>> {
        self.store.repo.find_by_token(&self.token).await
    }

    pub async fn create_pending(
        &self,
        intent_id: i64,
        paybylink_url: &str,
    ) -> Result<PaymentRecord, GatewayError> {
        let inserted = self
            .store
            .repo
            .insert_pending(&self.token, intent_id, paybylink_url)
            .await?;
        self.store.invalidate(&self.token, &[]).await;
        inserted.ok_or_else(|| GatewayError::DuplicateToken(self.token.clone()))
    }

    pub async fn finalize(
        &self,
        status: PaymentStatus,
        transaction_id: Option<&str>,
    ) -> Result<FinalizeOutcome> {
        let outcome = self.store.repo.finalize(&self.token, status, transaction_id).await;
        let stored_txid = match &outcome {
            Ok(FinalizeOutcome::Applied(r)) | Ok(FinalizeOutcome::AlreadyFinal(r)) => {
                r.transaction_id.as_deref()
            }
            _ => None,
        };
        self.store
            .invalidate(&self.token, &[transaction_id, stored_txid])
            .await;
        outcome
    }

    pub async fn delete(&self) -> Result<Option<PaymentRecord>> {
        let removed = self.store.repo.delete_by_token(&self.token).await;
        let txid = match &removed {
            Ok(Some(r)) => r.transaction_id.as_deref(),
            _ => None,
        };
        self.store.invalidate(&self.token, &[txid]).await;
        removed
    }
}

impl Drop for TokenLock {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.store
            .locks
            .remove_if(&self.token, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
