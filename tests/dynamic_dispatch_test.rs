use qrpay::domain::ports::{GatewayBox, VerifierBox};
use qrpay::domain::session::OrderId;
use qrpay::infrastructure::in_memory::{InMemoryGateway, InMemoryVerifier};
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_ports_as_trait_objects() {
    let gateway: GatewayBox = Box::new(InMemoryGateway::new());
    let verifier: VerifierBox = Box::new(InMemoryVerifier::accepting());

    // Verify Send + Sync by spawning tasks
    let gateway_handle = tokio::spawn(async move {
        let order_id = gateway.create_order(dec!(10.00), "USD").await.unwrap();
        gateway.capture_authorization(&order_id).await.unwrap()
    });

    let verifier_handle = tokio::spawn(async move {
        verifier.verify_capture(&OrderId::new("O1")).await.unwrap()
    });

    let capture = gateway_handle.await.unwrap();
    assert_eq!(capture.capture_id, "C1");
    assert!(capture.gateway_confirmed);

    let settlement = verifier_handle.await.unwrap();
    assert!(settlement.accepted);
}
