use crate::error::GatewayError;
use crate::repo::settings_repo::SettingsStore;
use anyhow::Result;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

pub const DEFAULT_SUPPORT_EMAIL: &str = "suporte@ifthenpay.com";
const SUBJECT_TAG: &str = "ifthenpay";

#[derive(Debug, Clone, Deserialize)]
pub struct ActivationRequest {
    pub gateway_key: String,
    pub entity: String,
    pub customer_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportEmail {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub html_body: String,
}

#[async_trait::async_trait]
pub trait SupportMailer: Send + Sync {
    async fn send(&self, email: &SupportEmail) -> Result<()>;
}

pub struct SmtpSupportMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpSupportMailer {
    pub fn new(host: &str, username: &str, password: &str) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(host)?;
        if !username.is_empty() {
            builder = builder.credentials(Credentials::new(username.to_string(), password.to_string()));
        }
        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait::async_trait]
impl SupportMailer for SmtpSupportMailer {
    async fn send(&self, email: &SupportEmail) -> Result<()> {
        let message = Message::builder()
            .from(email.from.parse::<Mailbox>()?)
            .to(email.to.parse::<Mailbox>()?)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(email.html_body.clone())?;
        self.transport.send(message).await?;
        Ok(())
    }
}

/// Asks ifthenpay support to enable a payment method on a gateway key.
#[derive(Clone)]
pub struct ActivationService {
    pub mailer: Option<Arc<dyn SupportMailer>>,
    pub settings: Arc<dyn SettingsStore>,
    pub support_email: String,
    pub site_url: Url,
    pub site_name: String,
}

impl ActivationService {
    pub async fn activate_account(&self, request: &ActivationRequest) -> Result<(), GatewayError> {
        if request.gateway_key.trim().is_empty() || request.entity.trim().is_empty() {
            return Err(GatewayError::MissingRequiredKeys);
        }
        let settings = self.settings.load().await?;
        let backoffice_key = settings.backoffice_key.unwrap_or_default();

        let email = self.build_email(request, &backoffice_key);
        let Some(mailer) = &self.mailer else {
            tracing::error!("activation requested but no SMTP relay is configured");
            return Err(GatewayError::MailDelivery("no SMTP relay configured".to_string()));
        };

        mailer.send(&email).await.map_err(|err| {
            tracing::error!(entity = %request.entity, "activation email failed: {err:#}");
            GatewayError::MailDelivery(format!("{err:#}"))
        })?;
        tracing::info!(entity = %request.entity, gateway_key = %request.gateway_key, "activation request sent");
        Ok(())
    }

    pub fn build_email(&self, request: &ActivationRequest, backoffice_key: &str) -> SupportEmail {
        let entity = request.entity.trim().to_uppercase();
        let rows = [
            ("Chave de acesso ao backoffice:", backoffice_key.to_string()),
            ("Gateway Key:", request.gateway_key.clone()),
            ("Email Cliente:", request.customer_email.clone()),
            ("Método a ativar:", entity.clone()),
            ("Loja online:", self.site_url.to_string()),
            ("Plataforma:", format!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))),
            ("Atualizar Conta Cliente:", "Após adicionar o método não precisa tomar mais nenhuma ação, este método ficará disponível para seleção na página de configuração.".to_string()),
        ];

        let table: String = rows
            .iter()
            .map(|(label, value)| {
                format!(
                    "<tr><td style=\"padding:8px 0;width:200px;font-weight:bold\">{}</td><td style=\"padding:8px 0\">{}</td></tr>",
                    escape_html(label),
                    escape_html(value)
                )
            })
            .collect();
        let html_body = format!(
            "<div style=\"font-family:Arial,sans-serif;color:#333;max-width:600px;margin:auto\">\
             <h2>Ativar método de pagamento para a Gateway <span style=\"color:#d32f2f\">{}</span></h2>\
             <table role=\"presentation\" style=\"width:100%;border-collapse:collapse\">{table}</table>\
             <p style=\"font-size:12px;color:#777;text-align:center\">Pedido gerado automaticamente pelo módulo ifthenpay</p>\
             </div>",
            escape_html(&request.gateway_key)
        );

        let host = self.site_url.host_str().unwrap_or("localhost");
        SupportEmail {
            to: self.support_email.clone(),
            from: format!("{} <no-reply@{host}>", self.site_name.replace(['<', '>', '"'], "")),
            subject: format!("[{SUBJECT_TAG}] [{entity}]: Ativação de Serviço"),
            html_body,
        }
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::settings::MerchantSettings;
    use crate::repo::memory::InMemorySettingsStore;

    fn service() -> ActivationService {
        ActivationService {
            mailer: None,
            settings: Arc::new(InMemorySettingsStore::new(MerchantSettings::default())),
            support_email: DEFAULT_SUPPORT_EMAIL.to_string(),
            site_url: Url::parse("https://spa.example.pt/").unwrap(),
            site_name: "Spa".to_string(),
        }
    }

    #[test]
    fn subject_carries_uppercased_entity() {
        let email = service().build_email(
            &ActivationRequest {
                gateway_key: "GW-1".to_string(),
                entity: "mbway".to_string(),
                customer_email: "owner@spa.example.pt".to_string(),
            },
            "1234-5678-9012-3456",
        );
        assert_eq!(email.subject, "[ifthenpay] [MBWAY]: Ativação de Serviço");
        assert_eq!(email.from, "Spa <no-reply@spa.example.pt>");
        assert!(email.html_body.contains("1234-5678-9012-3456"));
    }

    #[test]
    fn markup_in_values_is_escaped() {
        assert_eq!(escape_html("<b>&\"x\"</b>"), "&lt;b&gt;&amp;&quot;x&quot;&lt;/b&gt;");
    }

    #[tokio::test]
    async fn missing_relay_reports_delivery_failure() {
        let err = service()
            .activate_account(&ActivationRequest {
                gateway_key: "GW-1".to_string(),
                entity: "MB".to_string(),
                customer_email: String::new(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "MAIL_DELIVERY_FAILED");
    }
}
