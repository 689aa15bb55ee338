use crate::domain::intent::{ChargeIntent, OrderIntent, TransactionIntent};
use crate::domain::payment::{
    CheckoutOutcome, CheckoutRedirect, FinalizeOutcome, PaymentRecord, PaymentStatus, ReturnAck,
    ReturnKind,
};
use crate::error::GatewayError;
use crate::gateways::CheckoutGateway;
use crate::repo::settings_repo::SettingsStore;
use crate::service::payload_builder::{build_charge_payload, TRANSACTION_ID_PLACEHOLDER};
use crate::service::record_store::{CachedRecordStore, TokenLock};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Lower bound on the wait between status polls.
pub const MIN_VERIFY_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for VerifyPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            interval: Duration::from_secs(3),
        }
    }
}

/// Drives a checkout attempt from pay-by-link creation to its terminal status.
#[derive(Clone)]
pub struct ReconciliationService {
    pub gateway: Arc<dyn CheckoutGateway>,
    pub records: CachedRecordStore,
    pub settings: Arc<dyn SettingsStore>,
    pub locale: String,
    pub return_base: Url,
    pub verify_policy: VerifyPolicy,
}

impl ReconciliationService {
    pub async fn initiate_checkout_for_order(&self, intent: &OrderIntent) -> CheckoutOutcome {
        self.initiate_checkout(intent, intent.charge_amount).await
    }

    pub async fn initiate_checkout_for_transaction(
        &self,
        intent: &TransactionIntent,
    ) -> CheckoutOutcome {
        self.initiate_checkout(intent, intent.charge_amount).await
    }

    pub async fn initiate_checkout(&self, intent: &dyn ChargeIntent, amount: Decimal) -> CheckoutOutcome {
        if amount <= Decimal::ZERO {
            tracing::info!(intent_id = intent.identifier(), "nothing to charge, skipping payment");
            return CheckoutOutcome::Skip;
        }

        match self.create_checkout(intent, amount).await {
            Ok(redirect) => CheckoutOutcome::Redirect(redirect),
            Err(err) => {
                tracing::error!(
                    intent_id = intent.identifier(),
                    gateway = self.gateway.name(),
                    code = err.code(),
                    "checkout initiation failed: {err}"
                );
                CheckoutOutcome::Rejected(err)
            }
        }
    }

    async fn create_checkout(
        &self,
        intent: &dyn ChargeIntent,
        amount: Decimal,
    ) -> Result<CheckoutRedirect, GatewayError> {
        let token = intent.token().ok_or(GatewayError::MissingToken)?.to_string();
        let settings = self.settings.load().await?;

        let payload = build_charge_payload(
            intent,
            &token,
            amount,
            &settings,
            &self.locale,
            &self.return_base,
        );
        let link = self
            .gateway
            .create_pay_by_link(settings.gateway_key.as_deref().unwrap_or_default(), &payload)
            .await?;

        let record = self
            .records
            .create_pending(&token, intent.identifier(), &link.redirect_url)
            .await?;
        tracing::info!(
            token = %record.token,
            intent_id = record.intent_id,
            amount = %payload.amount,
            "pay-by-link created"
        );

        Ok(CheckoutRedirect {
            token,
            paybylink_url: record.paybylink_url,
            success_url: payload.success_url,
            cancel_url: payload.cancel_url,
            error_url: payload.error_url,
        })
    }

    /// Settles the record of `token` from the hosted checkout's redirect.
    ///
    /// The token's write lock is held for the whole call, verification
    /// included, so concurrent callbacks for one token are applied one at a
    /// time and the later ones see the terminal status of the first.
    pub async fn handle_return(
        &self,
        kind: ReturnKind,
        token: &str,
        txid: &str,
        cancel: &CancellationToken,
    ) -> ReturnAck {
        if token.trim().is_empty() {
            return ReturnAck::Rejected(GatewayError::MissingToken);
        }
        let txid = normalize_txid(txid);

        let lock = self.records.lock(token).await;
        let current = match lock.current().await {
            Ok(Some(record)) => record,
            Ok(None) => return ReturnAck::Rejected(GatewayError::RecordNotFound),
            Err(err) => return ReturnAck::Rejected(GatewayError::Storage(err)),
        };
        if current.status.is_terminal() {
            tracing::warn!(token, status = %current.status, "callback for settled payment, replaying outcome");
            return replay(&current);
        }

        match kind {
            ReturnKind::Success => match txid {
                Some(txid) => match self.verify_with_retry(txid, cancel).await {
                    Ok(true) => self.settle(&lock, PaymentStatus::Paid, Some(txid)).await,
                    Ok(false) => {
                        tracing::warn!(token, txid, "provider did not confirm the transaction in time");
                        self.settle(&lock, PaymentStatus::Failed, Some(txid)).await
                    }
                    Err(err) => {
                        tracing::error!(token, txid, code = err.code(), "payment verification aborted: {err}");
                        ReturnAck::Rejected(err)
                    }
                },
                None => {
                    tracing::warn!(token, "success callback without transaction id");
                    self.settle(&lock, PaymentStatus::Failed, None).await
                }
            },
            ReturnKind::Cancel => self.settle(&lock, PaymentStatus::Cancelled, None).await,
            ReturnKind::Other(other) => {
                tracing::warn!(token, kind = %other, "checkout returned without success");
                self.settle(&lock, PaymentStatus::Failed, txid).await
            }
        }
    }

    async fn settle(
        &self,
        lock: &TokenLock,
        status: PaymentStatus,
        txid: Option<&str>,
    ) -> ReturnAck {
        match lock.finalize(status, txid).await {
            Ok(FinalizeOutcome::Applied(record)) => {
                tracing::info!(
                    token = %record.token,
                    status = %record.status,
                    transaction_id = record.transaction_id.as_deref().unwrap_or(""),
                    "payment finalized"
                );
                replay(&record)
            }
            Ok(FinalizeOutcome::AlreadyFinal(record)) => {
                tracing::warn!(token = %record.token, status = %record.status, "record settled concurrently");
                replay(&record)
            }
            Ok(FinalizeOutcome::NotFound) => ReturnAck::Rejected(GatewayError::RecordNotFound),
            Err(err) => ReturnAck::Rejected(GatewayError::Storage(err)),
        }
    }

    /// Polls the transaction status until it settles or the policy timeout elapses.
    ///
    /// No poll is issued at or after the deadline; the final wait is clamped to
    /// the time left. The interval never drops below [`MIN_VERIFY_INTERVAL`].
    /// Provider errors end the loop and are returned as-is.
    pub async fn verify_with_retry(
        &self,
        txid: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, GatewayError> {
        let deadline = Instant::now() + self.verify_policy.timeout;
        let interval = self.verify_policy.interval.max(MIN_VERIFY_INTERVAL);
        let mut attempt = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(GatewayError::VerificationCancelled);
            }

            attempt += 1;
            if self.gateway.get_payment_status_by_transaction_id(txid).await? {
                tracing::debug!(txid, attempt, "transaction confirmed");
                return Ok(true);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            let nap = interval.min(deadline - now);
            tokio::select! {
                _ = cancel.cancelled() => return Err(GatewayError::VerificationCancelled),
                _ = tokio::time::sleep(nap) => {}
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
        }
    }
}

/// The provider leaves the placeholder untouched when it has no transaction to report.
fn normalize_txid(txid: &str) -> Option<&str> {
    let txid = txid.trim();
    (!txid.is_empty() && txid != TRANSACTION_ID_PLACEHOLDER).then_some(txid)
}

fn replay(record: &PaymentRecord) -> ReturnAck {
    match record.status {
        PaymentStatus::Paid => ReturnAck::Completed,
        PaymentStatus::Cancelled => ReturnAck::Rejected(GatewayError::PaymentCancelled),
        PaymentStatus::Failed => ReturnAck::Rejected(GatewayError::PaymentFailed),
        PaymentStatus::Pending => ReturnAck::Rejected(GatewayError::PaymentPending),
    }
}
