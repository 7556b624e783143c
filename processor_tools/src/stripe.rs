use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde::{Deserialize, Serialize};

use crate::{config::StripeConfig, error::ProcessorApiError};

/// The fields of a charge response the gateway cares about.
///
/// `paid` is the authoritative signal: a 200 response with `paid = false` is a decline, and
/// nothing may be persisted for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeReceipt {
    pub id: String,
    pub paid: bool,
    /// The charged amount in minor units (cents).
    pub amount: i64,
    /// Lowercase ISO currency code, as the processor reports it.
    pub currency: String,
    pub balance_transaction: Option<String>,
}

#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, ProcessorApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let bearer = format!("Bearer {}", config.secret_key.reveal());
        let val =
            HeaderValue::from_str(&bearer).map_err(|e| ProcessorApiError::Initialization(e.to_string()))?;
        headers.insert("Authorization", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/x-www-form-urlencoded"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ProcessorApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    /// Charges `amount_minor` minor units against the given card token.
    ///
    /// Hard declines come back as a `QueryError` (the processor answers 402); soft declines as a
    /// receipt with `paid = false`. Callers treat both the same way: report failure, persist
    /// nothing.
    pub async fn charge(
        &self,
        amount_minor: i64,
        currency: &str,
        source_token: &str,
        description: &str,
    ) -> Result<ChargeReceipt, ProcessorApiError> {
        let url = format!("{}/v1/charges", self.config.api_url);
        let amount = amount_minor.to_string();
        let currency_lower = currency.to_ascii_lowercase();
        let params = [
            ("amount", amount.as_str()),
            ("currency", currency_lower.as_str()),
            ("source", source_token),
            ("description", description),
        ];
        trace!("💳️ Sending charge request for {amount} {currency_lower}");
        let response = self
            .client
            .post(url)
            .body(crate::helpers::form_encode(&params))
            .send()
            .await
            .map_err(|e| ProcessorApiError::ResponseError(e.to_string()))?;
        if response.status().is_success() {
            let receipt =
                response.json::<ChargeReceipt>().await.map_err(|e| ProcessorApiError::JsonError(e.to_string()))?;
            debug!("💳️ Charge {} completed, paid = {}", receipt.id, receipt.paid);
            Ok(receipt)
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| ProcessorApiError::ResponseError(e.to_string()))?;
            warn!("💳️ Charge request failed with status {status}");
            Err(ProcessorApiError::QueryError { status, message })
        }
    }
}
