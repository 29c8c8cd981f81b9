use crate::domain::ports::{AuthorizationGateway, SettlementVerifier};
use crate::domain::session::{CaptureResult, OrderId, Settlement};
use crate::error::{GatewayError, VerificationError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A deterministic in-process gateway.
///
/// Issues order ids `O1, O2, ...` and capture ids `C1, C2, ...`, and
/// records every call it receives. Failures can be scripted per
/// operation. Used by tests and the simulation binary.
#[derive(Default, Clone)]
pub struct InMemoryGateway {
    created: Arc<Mutex<Vec<OrderId>>>,
    captured: Arc<Mutex<Vec<OrderId>>>,
    fail_create: Option<GatewayError>,
    fail_capture: Option<GatewayError>,
    confirm_captures: bool,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self {
            confirm_captures: true,
            ..Self::default()
        }
    }

    /// Scripts a failure for every `create_order` call.
    pub fn with_create_failure(mut self, err: GatewayError) -> Self {
        self.fail_create = Some(err);
        self
    }

    /// Scripts a failure for every `capture_authorization` call.
    pub fn with_capture_failure(mut self, err: GatewayError) -> Self {
        self.fail_capture = Some(err);
        self
    }

    /// Makes captures report `gateway_confirmed: false` while still
    /// returning a capture id.
    pub fn with_unconfirmed_captures(mut self) -> Self {
        self.confirm_captures = false;
        self
    }

    /// Orders created so far, in call order.
    pub async fn created_orders(&self) -> Vec<OrderId> {
        self.created.lock().await.clone()
    }

    /// Orders captured so far, in call order.
    pub async fn captured_orders(&self) -> Vec<OrderId> {
        self.captured.lock().await.clone()
    }
}

#[async_trait]
impl AuthorizationGateway for InMemoryGateway {
    async fn create_order(
        &self,
        _amount: Decimal,
        _currency: &str,
    ) -> Result<OrderId, GatewayError> {
        if let Some(err) = &self.fail_create {
            return Err(err.clone());
        }
        let mut created = self.created.lock().await;
        let order_id = OrderId::new(format!("O{}", created.len() + 1));
        created.push(order_id.clone());
        Ok(order_id)
    }

    async fn capture_authorization(
        &self,
        order_id: &OrderId,
    ) -> Result<CaptureResult, GatewayError> {
        if let Some(err) = &self.fail_capture {
            return Err(err.clone());
        }
        let mut captured = self.captured.lock().await;
        captured.push(order_id.clone());
        Ok(CaptureResult {
            capture_id: format!("C{}", captured.len()),
            gateway_confirmed: self.confirm_captures,
        })
    }
}

/// A scripted settlement verifier.
///
/// Answers with a fixed verdict (or a scripted failure) and records
/// which orders it was asked about, so tests can assert the
/// verify-at-most-once property.
#[derive(Clone)]
pub struct InMemoryVerifier {
    accepted: bool,
    fail: Option<VerificationError>,
    asked: Arc<Mutex<Vec<OrderId>>>,
}

impl InMemoryVerifier {
    /// A verifier that confirms every settlement.
    pub fn accepting() -> Self {
        Self {
            accepted: true,
            fail: None,
            asked: Arc::default(),
        }
    }

    /// A verifier that rejects every settlement.
    pub fn rejecting() -> Self {
        Self {
            accepted: false,
            ..Self::accepting()
        }
    }

    /// A verifier whose call itself fails.
    pub fn failing(err: VerificationError) -> Self {
        Self {
            fail: Some(err),
            ..Self::accepting()
        }
    }

    /// Orders this verifier was asked about, in call order.
    pub async fn verified_orders(&self) -> Vec<OrderId> {
        self.asked.lock().await.clone()
    }
}

#[async_trait]
impl SettlementVerifier for InMemoryVerifier {
    async fn verify_capture(&self, order_id: &OrderId) -> Result<Settlement, VerificationError> {
        if let Some(err) = &self.fail {
            return Err(err.clone());
        }
        self.asked.lock().await.push(order_id.clone());
        Ok(Settlement {
            accepted: self.accepted,
        })
    }
}
