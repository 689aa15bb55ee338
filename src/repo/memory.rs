use crate::domain::payment::{FinalizeOutcome, PaymentRecord, PaymentStatus};
use crate::domain::settings::MerchantSettings;
use crate::repo::payments_repo::PaymentRecordRepo;
use crate::repo::settings_repo::SettingsStore;
use anyhow::Result;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Process-local payment records for `STORE_BACKEND=memory` and tests.
#[derive(Default)]
pub struct InMemoryPaymentsRepo {
    records: RwLock<HashMap<String, PaymentRecord>>,
    next_id: AtomicI64,
    lookups: AtomicUsize,
}

impl InMemoryPaymentsRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of read queries served, used to observe the cache in front of it.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PaymentRecordRepo for InMemoryPaymentsRepo {
    async fn insert_pending(
        &self,
        token: &str,
        intent_id: i64,
        paybylink_url: &str,
    ) -> Result<Option<PaymentRecord>> {
        let mut records = self.records.write().await;
        if records.contains_key(token) {
            return Ok(None);
        }

        let now = Utc::now();
        let record = PaymentRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            token: token.to_string(),
            intent_id,
            status: PaymentStatus::Pending,
            paybylink_url: paybylink_url.to_string(),
            transaction_id: None,
            created_at: now,
            updated_at: now,
        };
        records.insert(token.to_string(), record.clone());
        Ok(Some(record))
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<PaymentRecord>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.read().await.get(token).cloned())
    }

    async fn find_by_transaction_id(&self, transaction_id: &str) -> Result<Option<PaymentRecord>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.transaction_id.as_deref() == Some(transaction_id))
            .max_by_key(|r| (r.updated_at, r.id))
            .cloned())
    }

    async fn finalize(
        &self,
        token: &str,
        status: PaymentStatus,
        transaction_id: Option<&str>,
    ) -> Result<FinalizeOutcome> {
        if !status.is_terminal() {
            anyhow::bail!("cannot finalize {token} into {status}");
        }

        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(token) else {
            return Ok(FinalizeOutcome::NotFound);
        };
        if record.status.is_terminal() {
            return Ok(FinalizeOutcome::AlreadyFinal(record.clone()));
        }

        record.status = status;
        if let Some(txid) = transaction_id {
            record.transaction_id = Some(txid.to_string());
        }
        record.updated_at = Utc::now();
        Ok(FinalizeOutcome::Applied(record.clone()))
    }

    async fn delete_by_token(&self, token: &str) -> Result<Option<PaymentRecord>> {
        Ok(self.records.write().await.remove(token))
    }
}

#[derive(Default)]
pub struct InMemorySettingsStore {
    inner: RwLock<Option<MerchantSettings>>,
}

impl InMemorySettingsStore {
    pub fn new(initial: MerchantSettings) -> Self {
        Self {
            inner: RwLock::new(Some(initial)),
        }
    }
}

#[async_trait::async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn load(&self) -> Result<MerchantSettings> {
        Ok(self.inner.read().await.clone().unwrap_or_default())
    }

    async fn save(&self, settings: &MerchantSettings) -> Result<()> {
        *self.inner.write().await = Some(settings.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.inner.write().await = None;
        Ok(())
    }
}
