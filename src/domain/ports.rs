use super::session::{CaptureResult, OrderId, Settlement};
use crate::error::{GatewayError, VerificationError};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// One sampling outcome from a code reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeEvent {
    /// A code was found in the frame; carries its decoded text.
    Decoded(String),
    /// The frame held no readable code. Non-fatal; scanning continues.
    DecodeFailed,
}

/// A lazy, infinite source of decode events at a fixed cadence.
#[async_trait]
pub trait CodeReader: Send {
    /// Waits for the next sampling tick and reports its outcome.
    async fn next_decode(&mut self) -> DecodeEvent;
}

/// The third-party payment capability, modeled as opaque.
///
/// Failures are reported, never retried here; recovery means a fresh
/// scan.
#[async_trait]
pub trait AuthorizationGateway: Send + Sync {
    async fn create_order(&self, amount: Decimal, currency: &str)
    -> Result<OrderId, GatewayError>;

    async fn capture_authorization(
        &self,
        order_id: &OrderId,
    ) -> Result<CaptureResult, GatewayError>;
}

/// The application backend's settlement check.
///
/// This is the only source of truth for presenting a payment as
/// successful; the gateway's own capture confirmation is not trusted
/// alone.
#[async_trait]
pub trait SettlementVerifier: Send + Sync {
    async fn verify_capture(&self, order_id: &OrderId) -> Result<Settlement, VerificationError>;
}

pub type GatewayBox = Box<dyn AuthorizationGateway>;
pub type VerifierBox = Box<dyn SettlementVerifier>;
