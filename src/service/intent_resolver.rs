use crate::domain::intent::{ChargeIntent, OrderIntent, PaymentData, TransactionIntent};
use crate::domain::payment::{PaymentStatus, Resolution, PAYMENT_METHOD_CODE, PROCESSOR_CODE};
use crate::error::GatewayError;
use crate::service::record_store::CachedRecordStore;

const PAYMENT_ERROR: &str = "payment_error";

#[derive(Clone)]
pub struct IntentResolver {
    pub records: CachedRecordStore,
}

impl IntentResolver {
    pub async fn resolve_order_payment(&self, intent: &mut OrderIntent) -> Resolution {
        if !handled_here(&intent.payment_data) {
            return Resolution::NotApplicable;
        }
        self.resolve(intent).await
    }

    pub async fn resolve_transaction_payment(&self, intent: &mut TransactionIntent) -> Resolution {
        if !handled_here(&intent.payment_data) {
            return Resolution::NotApplicable;
        }
        self.resolve(intent).await
    }

    /// Reports whether the intent's checkout attempt ended PAID.
    ///
    /// The attempt is looked up by token first and by transaction id second,
    /// since some front ends hand back the provider reference in the token slot.
    pub async fn resolve(&self, intent: &mut dyn ChargeIntent) -> Resolution {
        let Some(token) = intent.token().map(str::to_string) else {
            return reject(intent, GatewayError::MissingToken.code(), "Missing payment token");
        };

        let lookup = match self.records.get_by_token(&token).await {
            Ok(None) => self.records.get_by_transaction_id(&token).await,
            other => other,
        };
        let record = match lookup {
            Ok(Some(record)) => record,
            Ok(None) => {
                return reject(intent, GatewayError::RecordNotFound.code(), "Payment record not found")
            }
            Err(err) => {
                tracing::error!(token = %token, "payment lookup failed: {err:#}");
                return reject(intent, "STORAGE_ERROR", "Payment lookup failed");
            }
        };

        match record.status {
            PaymentStatus::Paid => Resolution::Paid {
                charge_id: record.transaction_id,
            },
            PaymentStatus::Cancelled => {
                reject(intent, GatewayError::PaymentCancelled.code(), "Payment was cancelled")
            }
            PaymentStatus::Failed => reject(intent, GatewayError::PaymentFailed.code(), "Payment failed"),
            PaymentStatus::Pending => {
                tracing::warn!(token = %token, intent_id = intent.identifier(), "intent resolved while payment is pending");
                reject(intent, GatewayError::PaymentPending.code(), "Payment is still pending")
            }
        }
    }
}

fn handled_here(payment_data: &PaymentData) -> bool {
    payment_data.processor.as_deref() == Some(PROCESSOR_CODE)
        && payment_data.method.as_deref() == Some(PAYMENT_METHOD_CODE)
}

fn reject(intent: &mut dyn ChargeIntent, code: &'static str, message: &str) -> Resolution {
    intent.record_error(PAYMENT_ERROR, message);
    Resolution::Rejected {
        code,
        message: message.to_string(),
    }
}
