use log::*;
use tsg_common::Secret;

const DEFAULT_STRIPE_API_URL: &str = "https://api.stripe.com";
const DEFAULT_COINPAYMENTS_API_URL: &str = "https://www.coinpayments.net/api.php";

#[derive(Debug, Clone, Default)]
pub struct StripeConfig {
    pub api_url: String,
    pub secret_key: Secret<String>,
}

impl StripeConfig {
    pub fn from_env_or_default() -> Self {
        let api_url = std::env::var("TSG_STRIPE_API_URL").unwrap_or_else(|_| DEFAULT_STRIPE_API_URL.to_string());
        let secret_key = Secret::new(std::env::var("TSG_STRIPE_SECRET_KEY").unwrap_or_else(|_| {
            warn!("TSG_STRIPE_SECRET_KEY not set. Card charges will be rejected by the processor.");
            "sk_test_000000000000".to_string()
        }));
        Self { api_url, secret_key }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CoinPaymentsConfig {
    pub api_url: String,
    /// The API public key, sent with every command.
    pub public_key: String,
    /// The API private key, used to sign command bodies.
    pub private_key: Secret<String>,
}

impl CoinPaymentsConfig {
    pub fn from_env_or_default() -> Self {
        let api_url =
            std::env::var("TSG_COINPAYMENTS_API_URL").unwrap_or_else(|_| DEFAULT_COINPAYMENTS_API_URL.to_string());
        let public_key = std::env::var("TSG_COINPAYMENTS_PUBLIC_KEY").unwrap_or_else(|_| {
            warn!("TSG_COINPAYMENTS_PUBLIC_KEY not set. Deposit address requests will fail.");
            String::default()
        });
        let private_key = Secret::new(std::env::var("TSG_COINPAYMENTS_PRIVATE_KEY").unwrap_or_else(|_| {
            warn!("TSG_COINPAYMENTS_PRIVATE_KEY not set. Deposit address requests will fail.");
            String::default()
        }));
        Self { api_url, public_key, private_key }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MailerConfig {
    /// Base URL of the transactional mail relay.
    pub api_url: String,
    pub api_token: Secret<String>,
    pub from_address: String,
    /// The operator mailbox notified of incoming bank orders.
    pub operator_email: String,
}

impl MailerConfig {
    pub fn from_env_or_default() -> Self {
        let api_url = std::env::var("TSG_MAIL_API_URL").unwrap_or_else(|_| {
            warn!("TSG_MAIL_API_URL not set. Mail notifications will be dropped.");
            String::default()
        });
        let api_token = Secret::new(std::env::var("TSG_MAIL_API_TOKEN").unwrap_or_default());
        let from_address =
            std::env::var("TSG_MAIL_FROM").unwrap_or_else(|_| "no-reply@sale.example.com".to_string());
        let operator_email =
            std::env::var("TSG_MAIL_OPERATOR").unwrap_or_else(|_| "operations@sale.example.com".to_string());
        Self { api_url, api_token, from_address, operator_email }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_url.is_empty()
    }
}
