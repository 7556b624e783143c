use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    config::CoinPaymentsConfig,
    error::ProcessorApiError,
    helpers::{form_encode, hmac_sha512_hex},
};

const API_VERSION: &str = "1";

/// A deposit address issued for one order. Funds sent to it trigger IPN deliveries keyed by the
/// same address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackAddress {
    pub address: String,
    /// Destination tag / memo for currencies that need one.
    #[serde(default)]
    pub dest_tag: Option<String>,
}

/// Envelope every CoinPayments command response arrives in.
#[derive(Debug, Deserialize)]
struct CommandResponse<T> {
    error: String,
    result: Option<T>,
}

#[derive(Clone)]
pub struct CoinPaymentsApi {
    config: CoinPaymentsConfig,
    client: Arc<Client>,
}

impl CoinPaymentsApi {
    pub fn new(config: CoinPaymentsConfig) -> Result<Self, ProcessorApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/x-www-form-urlencoded"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ProcessorApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    /// Requests a fresh deposit address for the given currency.
    pub async fn get_callback_address(&self, currency: &str) -> Result<CallbackAddress, ProcessorApiError> {
        debug!("🪙️ Requesting callback address for {currency}");
        let address = self.command("get_callback_address", &[("currency", currency)]).await?;
        Ok(address)
    }

    /// Executes one signed API command. The body is form-encoded and signed with an HMAC-SHA512
    /// of the private key; the signature rides in the `HMAC` header.
    async fn command<T: DeserializeOwned>(
        &self,
        cmd: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ProcessorApiError> {
        let mut pairs =
            vec![("version", API_VERSION), ("format", "json"), ("cmd", cmd), ("key", self.config.public_key.as_str())];
        pairs.extend_from_slice(params);
        let body = form_encode(&pairs);
        let signature = hmac_sha512_hex(self.config.private_key.reveal(), body.as_bytes());
        trace!("🪙️ Sending command {cmd}");
        let response = self
            .client
            .post(&self.config.api_url)
            .header("HMAC", signature)
            .body(body)
            .send()
            .await
            .map_err(|e| ProcessorApiError::ResponseError(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| ProcessorApiError::ResponseError(e.to_string()))?;
            warn!("🪙️ Command {cmd} failed with status {status}");
            return Err(ProcessorApiError::QueryError { status, message });
        }
        let envelope =
            response.json::<CommandResponse<T>>().await.map_err(|e| ProcessorApiError::JsonError(e.to_string()))?;
        if envelope.error != "ok" {
            warn!("🪙️ Command {cmd} rejected: {}", envelope.error);
            return Err(ProcessorApiError::CommandError(envelope.error));
        }
        envelope.result.ok_or_else(|| ProcessorApiError::ResponseError("missing result payload".to_string()))
    }
}
