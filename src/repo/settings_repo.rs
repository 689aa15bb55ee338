use crate::domain::settings::MerchantSettings;
use anyhow::Result;
use sqlx::{PgPool, Row};

const MERCHANT_SETTINGS: &str = "merchant";

#[async_trait::async_trait]
pub trait SettingsStore: Send + Sync {
    /// Stored settings, or the empty default when nothing was saved yet.
    async fn load(&self) -> Result<MerchantSettings>;
    async fn save(&self, settings: &MerchantSettings) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

#[derive(Clone)]
pub struct SettingsRepo {
    pub pool: PgPool,
}

#[async_trait::async_trait]
impl SettingsStore for SettingsRepo {
    async fn load(&self) -> Result<MerchantSettings> {
        let row = sqlx::query("SELECT value FROM ifthenpay_settings WHERE name = $1")
            .bind(MERCHANT_SETTINGS)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let value: serde_json::Value = row.try_get("value")?;
                Ok(serde_json::from_value(value)?)
            }
            None => Ok(MerchantSettings::default()),
        }
    }

    async fn save(&self, settings: &MerchantSettings) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ifthenpay_settings (name, value, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (name) DO UPDATE SET value = EXCLUDED.value, updated_at = now()
            "#,
        )
        .bind(MERCHANT_SETTINGS)
        .bind(serde_json::to_value(settings)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM ifthenpay_settings WHERE name = $1")
            .bind(MERCHANT_SETTINGS)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
