use crate::domain::payment::{FinalizeOutcome, PaymentRecord, PaymentStatus};
use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

/// Durable storage of payment attempts, keyed by token.
#[async_trait::async_trait]
pub trait PaymentRecordRepo: Send + Sync {
    /// Inserts a PENDING record. `None` when the token is already taken.
    async fn insert_pending(
        &self,
        token: &str,
        intent_id: i64,
        paybylink_url: &str,
    ) -> Result<Option<PaymentRecord>>;

    async fn find_by_token(&self, token: &str) -> Result<Option<PaymentRecord>>;

    /// Most recently updated record carrying `transaction_id`.
    async fn find_by_transaction_id(&self, transaction_id: &str) -> Result<Option<PaymentRecord>>;

    /// Moves a PENDING record to `status`. Terminal records are never rewritten.
    async fn finalize(
        &self,
        token: &str,
        status: PaymentStatus,
        transaction_id: Option<&str>,
    ) -> Result<FinalizeOutcome>;

    async fn delete_by_token(&self, token: &str) -> Result<Option<PaymentRecord>>;
}

#[derive(Clone)]
pub struct PaymentsRepo {
    pub pool: PgPool,
}

const COLUMNS: &str =
    "id, token, intent_id, status, paybylink_url, transaction_id, created_at, updated_at";

fn map_row(row: &PgRow) -> Result<PaymentRecord> {
    let status: String = row.try_get("status")?;
    Ok(PaymentRecord {
        id: row.try_get("id")?,
        token: row.try_get("token")?,
        intent_id: row.try_get("intent_id")?,
        status: status.parse()?,
        paybylink_url: row.try_get("paybylink_url")?,
        transaction_id: row.try_get("transaction_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait::async_trait]
impl PaymentRecordRepo for PaymentsRepo {
    async fn insert_pending(
        &self,
        token: &str,
        intent_id: i64,
        paybylink_url: &str,
    ) -> Result<Option<PaymentRecord>> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO ifthenpay_payments (token, intent_id, status, paybylink_url, created_at, updated_at)
            VALUES ($1, $2, 'PENDING', $3, now(), now())
            ON CONFLICT (token) DO NOTHING
            RETURNING {COLUMNS}
            "#
        ))
        .bind(token)
        .bind(intent_id)
        .bind(paybylink_url)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row).transpose()
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<PaymentRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM ifthenpay_payments WHERE token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row).transpose()
    }

    async fn find_by_transaction_id(&self, transaction_id: &str) -> Result<Option<PaymentRecord>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {COLUMNS}
            FROM ifthenpay_payments
            WHERE transaction_id = $1
            ORDER BY updated_at DESC, id DESC
            LIMIT 1
            "#
        ))
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row).transpose()
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

        let row = sqlx::query(&format!(
            r#"
            UPDATE ifthenpay_payments
            SET status = $2,
                transaction_id = COALESCE($3, transaction_id),
                updated_at = now()
            WHERE token = $1 AND status = 'PENDING'
            RETURNING {COLUMNS}
            "#
        ))
        .bind(token)
        .bind(status.as_str())
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(FinalizeOutcome::Applied(map_row(&row)?));
        }

        Ok(match self.find_by_token(token).await? {
            Some(existing) => FinalizeOutcome::AlreadyFinal(existing),
            None => FinalizeOutcome::NotFound,
        })
    }

    async fn delete_by_token(&self, token: &str) -> Result<Option<PaymentRecord>> {
        let row = sqlx::query(&format!(
            "DELETE FROM ifthenpay_payments WHERE token = $1 RETURNING {COLUMNS}"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row).transpose()
    }
}
