use std::sync::Arc;

use log::*;
use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use tsg_common::Amount;

use crate::{config::MailerConfig, error::ProcessorApiError};

/// Template variables for the bank order notification sent to the operator mailbox.
#[derive(Debug, Clone, Serialize)]
pub struct BankOrderMail {
    pub investor_email: String,
    pub amount: Amount,
    pub currency: String,
    pub bank_name: String,
    pub bank_number: String,
    pub swift_code: String,
}

#[derive(Clone)]
pub struct MailerApi {
    config: MailerConfig,
    client: Arc<Client>,
}

impl MailerApi {
    pub fn new(config: MailerConfig) -> Result<Self, ProcessorApiError> {
        let client = Client::builder().build().map_err(|e| ProcessorApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    /// Notifies the operator that a bank order was placed, with the transfer instructions the
    /// investor was shown. Fire-and-forget: failures are logged, never surfaced.
    pub async fn send_bank_order_email(&self, mail: BankOrderMail) {
        if !self.config.is_configured() {
            warn!("📧️ Mail relay not configured; dropping bank order notification");
            return;
        }
        let payload = json!({
            "from": self.config.from_address,
            "to": self.config.operator_email,
            "subject": format!("Bank order placed: {} {}", mail.amount, mail.currency),
            "template": "bank-order",
            "variables": mail,
        });
        let result = self
            .client
            .post(format!("{}/messages", self.config.api_url))
            .bearer_auth(self.config.api_token.reveal())
            .json(&payload)
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => {
                debug!("📧️ Bank order notification delivered to relay");
            },
            Ok(response) => {
                error!("📧️ Mail relay refused bank order notification: {}", response.status());
            },
            Err(e) => {
                error!("📧️ Could not reach mail relay: {e}");
            },
        }
    }
}
