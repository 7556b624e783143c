use std::env;

use chrono::Duration;
use log::*;
use processor_tools::{CoinPaymentsConfig, MailerConfig, StripeConfig};
use rand::{distributions::Alphanumeric, Rng};
use tsg_common::{parse_boolean_flag, Secret};

const DEFAULT_TSG_HOST: &str = "127.0.0.1";
const DEFAULT_TSG_PORT: u16 = 8480;
const DEFAULT_UNPAID_ORDER_TIMEOUT: Duration = Duration::hours(48);
const DEFAULT_MIN_CONFIRMATIONS: i64 = 2;
/// Level-1 referrers earn 5% of the referred purchase by default.
const DEFAULT_REFERRAL_RATES: [f64; 1] = [0.05];

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    pub ipn: IpnConfig,
    pub bank: BankDetails,
    /// Crypto payments credit once this many confirmations have been reported.
    pub min_confirmations: i64,
    /// Bonus rates per referral level, as fractions of the referred purchase amount.
    pub referral_rates: Vec<f64>,
    /// The time before an unpaid deposit order is considered abandoned and marked as expired.
    pub unpaid_order_timeout: Duration,
    pub stripe: StripeConfig,
    pub coinpayments: CoinPaymentsConfig,
    pub mailer: MailerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_TSG_HOST.to_string(),
            port: DEFAULT_TSG_PORT,
            database_url: String::default(),
            auth: AuthConfig::default(),
            ipn: IpnConfig::default(),
            bank: BankDetails::default(),
            min_confirmations: DEFAULT_MIN_CONFIRMATIONS,
            referral_rates: DEFAULT_REFERRAL_RATES.to_vec(),
            unpaid_order_timeout: DEFAULT_UNPAID_ORDER_TIMEOUT,
            stripe: StripeConfig::default(),
            coinpayments: CoinPaymentsConfig::default(),
            mailer: MailerConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("TSG_HOST").ok().unwrap_or_else(|| DEFAULT_TSG_HOST.into());
        let port = env::var("TSG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for TSG_PORT. {e} Using the default, {DEFAULT_TSG_PORT}, \
                         instead."
                    );
                    DEFAULT_TSG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_TSG_PORT);
        let database_url = env::var("TSG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ TSG_DATABASE_URL is not set. Please set it to the URL for the gateway database.");
            String::default()
        });
        let min_confirmations = env::var("TSG_MIN_CONFIRMATIONS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(DEFAULT_MIN_CONFIRMATIONS);
        let referral_rates = parse_referral_rates(env::var("TSG_REFERRAL_RATES").ok());
        let unpaid_order_timeout = env::var("TSG_UNPAID_ORDER_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Duration::hours)
            .unwrap_or(DEFAULT_UNPAID_ORDER_TIMEOUT);
        Self {
            host,
            port,
            database_url,
            auth: AuthConfig::from_env_or_default(),
            ipn: IpnConfig::from_env_or_default(),
            bank: BankDetails::from_env_or_default(),
            min_confirmations,
            referral_rates,
            unpaid_order_timeout,
            stripe: StripeConfig::from_env_or_default(),
            coinpayments: CoinPaymentsConfig::from_env_or_default(),
            mailer: MailerConfig::from_env_or_default(),
        }
    }
}

/// Parses `TSG_REFERRAL_RATES`, a comma-separated list of fractions ("0.05,0.03"), indexed by
/// referral level.
fn parse_referral_rates(value: Option<String>) -> Vec<f64> {
    let value = match value {
        Some(v) => v,
        None => return DEFAULT_REFERRAL_RATES.to_vec(),
    };
    let rates = value
        .split(',')
        .filter_map(|s| {
            s.trim().parse::<f64>().map_err(|e| warn!("🪛️ Ignoring invalid referral rate '{s}': {e}")).ok()
        })
        .collect::<Vec<f64>>();
    if rates.is_empty() {
        warn!("🪛️ TSG_REFERRAL_RATES contained no usable rates. Using the default.");
        return DEFAULT_REFERRAL_RATES.to_vec();
    }
    rates
}

//--------------------------------------     AuthConfig      ---------------------------------------------------------
/// Access tokens presented by clients are HMAC-signed with this secret by the (out of scope)
/// identity service. The server only verifies.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub token_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🪛️ Using a randomly generated token secret. This server will not accept tokens issued by anyone \
             else, including a previous instance of itself. Set TSG_AUTH_SECRET in production."
        );
        let secret: String = rand::thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect();
        Self { token_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn from_env_or_default() -> Self {
        match env::var("TSG_AUTH_SECRET") {
            Ok(secret) if !secret.is_empty() => Self { token_secret: Secret::new(secret) },
            _ => Self::default(),
        }
    }
}

//--------------------------------------      IpnConfig      ---------------------------------------------------------
#[derive(Clone, Debug, Default)]
pub struct IpnConfig {
    /// The merchant id the processor stamps on every notification. Mismatches are rejected.
    pub merchant_id: String,
    /// Shared secret signing IPN bodies (HMAC-SHA512 in the `HMAC` header).
    pub merchant_secret: Secret<String>,
    /// Disable only in tests.
    pub hmac_checks: bool,
}

impl IpnConfig {
    pub fn from_env_or_default() -> Self {
        let merchant_id = env::var("TSG_CP_MERCHANT_ID").unwrap_or_else(|_| {
            warn!("🪛️ TSG_CP_MERCHANT_ID not set. All deposit notifications will be rejected.");
            String::default()
        });
        let merchant_secret = Secret::new(env::var("TSG_CP_MERCHANT_SECRET").unwrap_or_else(|_| {
            warn!("🪛️ TSG_CP_MERCHANT_SECRET not set. All deposit notifications will be rejected.");
            String::default()
        }));
        let hmac_checks = parse_boolean_flag(env::var("TSG_IPN_HMAC_CHECKS").ok(), true);
        if !hmac_checks {
            warn!("🪛️ IPN HMAC checks are DISABLED. Never do this in production.");
        }
        Self { merchant_id, merchant_secret, hmac_checks }
    }
}

//--------------------------------------     BankDetails     ---------------------------------------------------------
/// The account investors are told to wire bank orders to.
#[derive(Clone, Debug, Default)]
pub struct BankDetails {
    pub bank_name: String,
    pub bank_number: String,
    pub swift_code: String,
}

impl BankDetails {
    pub fn from_env_or_default() -> Self {
        let bank_name = env::var("TSG_BANK_NAME").unwrap_or_else(|_| "Example Bank AG".to_string());
        let bank_number = env::var("TSG_BANK_NUMBER").unwrap_or_else(|_| "CH00 0000 0000 0000 0000 0".to_string());
        let swift_code = env::var("TSG_BANK_SWIFT").unwrap_or_else(|_| "EXAMCHZZXXX".to_string());
        Self { bank_name, bank_number, swift_code }
    }
}

#[cfg(test)]
mod test {
    use super::parse_referral_rates;

    #[test]
    fn referral_rate_parsing() {
        assert_eq!(parse_referral_rates(Some("0.05,0.03".into())), vec![0.05, 0.03]);
        assert_eq!(parse_referral_rates(Some("0.1, junk ,0.02".into())), vec![0.1, 0.02]);
        assert_eq!(parse_referral_rates(Some("junk".into())), vec![0.05]);
        assert_eq!(parse_referral_rates(None), vec![0.05]);
    }
}
