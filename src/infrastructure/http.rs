use crate::domain::ports::{AuthorizationGateway, SettlementVerifier};
use crate::domain::session::{CaptureResult, OrderId, Settlement};
use crate::error::{GatewayError, VerificationError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// REST adapter for the third-party authorization gateway.
///
/// Mirrors the gateway's order-create / order-capture surface. No
/// retries: any failure is surfaced to the session, which is terminal
/// for the attempt.
pub struct HttpAuthorizationGateway {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest {
    purchase_units: Vec<PurchaseUnit>,
}

#[derive(Debug, Serialize)]
struct PurchaseUnit {
    amount: UnitAmount,
}

#[derive(Debug, Serialize)]
struct UnitAmount {
    value: String,
    currency_code: String,
}

#[derive(Debug, Deserialize)]
struct OrderCreatedResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CaptureResponse {
    id: String,
}

impl HttpAuthorizationGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn order_request(amount: Decimal, currency: &str) -> CreateOrderRequest {
        CreateOrderRequest {
            purchase_units: vec![PurchaseUnit {
                amount: UnitAmount {
                    value: amount.to_string(),
                    currency_code: currency.to_string(),
                },
            }],
        }
    }

    async fn gateway_error(operation: &'static str, response: reqwest::Response) -> GatewayError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            GatewayError::Declined {
                operation,
                message: format!("{status}: {body}"),
            }
        } else {
            GatewayError::Transport(format!("{operation} returned {status}: {body}"))
        }
    }
}

#[async_trait]
impl AuthorizationGateway for HttpAuthorizationGateway {
    async fn create_order(&self, amount: Decimal, currency: &str)
    -> Result<OrderId, GatewayError> {
        let url = format!("{}/orders", self.base_url);
        info!(%url, %amount, %currency, "posting order creation");
        let response = self
            .client
            .post(&url)
            .json(&Self::order_request(amount, currency))
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Self::gateway_error("create-order", response).await);
        }
        let created: OrderCreatedResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Transport(format!("malformed order response: {e}")))?;
        Ok(OrderId::new(created.id))
    }

    async fn capture_authorization(
        &self,
        order_id: &OrderId,
    ) -> Result<CaptureResult, GatewayError> {
        let url = format!("{}/orders/{}/capture", self.base_url, order_id);
        info!(%url, "posting authorization capture");
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Self::gateway_error("capture", response).await);
        }
        let capture: CaptureResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Transport(format!("malformed capture response: {e}")))?;
        Ok(CaptureResult {
            capture_id: capture.id,
            gateway_confirmed: true,
        })
    }
}

/// HTTP adapter for the backend settlement check.
///
/// Posts `{"orderID": ...}` to the capture endpoint and reads back
/// `{"success": bool}`. Any non-2xx status or transport failure is a
/// `VerificationError`; a `success: false` body is a valid answer and
/// maps to a rejected settlement.
pub struct HttpSettlementVerifier {
    client: reqwest::Client,
    capture_url: String,
}

#[derive(Debug, Serialize)]
struct VerifyCaptureRequest<'a> {
    #[serde(rename = "orderID")]
    order_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct VerifyCaptureResponse {
    success: bool,
}

impl HttpSettlementVerifier {
    pub fn new(capture_url: impl Into<String>, timeout: Duration) -> Result<Self, VerificationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VerificationError::Transport(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            capture_url: capture_url.into(),
        })
    }
}

#[async_trait]
impl SettlementVerifier for HttpSettlementVerifier {
    async fn verify_capture(&self, order_id: &OrderId) -> Result<Settlement, VerificationError> {
        info!(url = %self.capture_url, %order_id, "requesting settlement verification");
        let response = self
            .client
            .post(&self.capture_url)
            .json(&VerifyCaptureRequest {
                order_id: order_id.as_str(),
            })
            .send()
            .await
            .map_err(|e| VerificationError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VerificationError::Transport(format!(
                "capture endpoint returned {status}: {body}"
            )));
        }
        let verdict: VerifyCaptureResponse = response
            .json()
            .await
            .map_err(|e| VerificationError::Malformed(e.to_string()))?;
        Ok(Settlement {
            accepted: verdict.success,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_verify_request_wire_shape() {
        let body = serde_json::to_value(VerifyCaptureRequest { order_id: "O1" }).unwrap();
        assert_eq!(body, serde_json::json!({"orderID": "O1"}));
    }

    #[test]
    fn test_verify_response_parsing() {
        let ok: VerifyCaptureResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(ok.success);
        let rejected: VerifyCaptureResponse =
            serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert!(!rejected.success);
        assert!(serde_json::from_str::<VerifyCaptureResponse>(r#"{"status": "ok"}"#).is_err());
    }

    #[test]
    fn test_order_request_wire_shape() {
        let request = HttpAuthorizationGateway::order_request(dec!(10.00), "USD");
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "purchase_units": [
                    {"amount": {"value": "10.00", "currency_code": "USD"}}
                ]
            })
        );
    }

    #[test]
    fn test_base_url_normalization() {
        let gateway =
            HttpAuthorizationGateway::new("https://gateway.test/", Duration::from_secs(5))
                .unwrap();
        assert_eq!(gateway.base_url, "https://gateway.test");
    }
}
