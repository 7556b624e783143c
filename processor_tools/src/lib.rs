//! HTTP clients for the gateway's external collaborators.
//!
//! Three thin, error-first clients with no retry logic of their own:
//! * [`StripeApi`] charges cards synchronously for fiat purchases.
//! * [`CoinPaymentsApi`] issues per-order deposit addresses; the asynchronous notifications it
//!   sends later are handled by the server's IPN route, not here.
//! * [`MailerApi`] posts transactional mail to a relay, fire-and-forget.
//!
//! Retrying a failed purchase is the investor's job (nothing has been persisted when a call here
//! fails); retrying a failed notification is the provider's.
mod coinpayments;
mod config;
mod error;
pub mod helpers;
mod mailer;
mod stripe;

pub use coinpayments::{CallbackAddress, CoinPaymentsApi};
pub use config::{CoinPaymentsConfig, MailerConfig, StripeConfig};
pub use error::ProcessorApiError;
pub use mailer::{BankOrderMail, MailerApi};
pub use stripe::{ChargeReceipt, StripeApi};
