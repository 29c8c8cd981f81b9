use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::time::Duration;

/// Workflow configuration.
///
/// The purchase is a single fixed amount in a single configured
/// currency; there is no per-item pricing model.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    /// The fixed purchase amount.
    pub amount: Decimal,
    /// ISO 4217 currency code for the purchase.
    pub currency: String,
    /// Sampling cadence of the code reader, in milliseconds.
    pub scan_interval_ms: u64,
    /// Timeout applied to gateway and verifier HTTP calls, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            amount: dec!(10.00),
            currency: "USD".to_string(),
            scan_interval_ms: 300,
            request_timeout_secs: 30,
        }
    }
}

impl PaymentConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
