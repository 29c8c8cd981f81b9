use qrpay::application::controller::PaymentSessionController;
use qrpay::config::PaymentConfig;
use qrpay::infrastructure::in_memory::{InMemoryGateway, InMemoryVerifier};
use qrpay::interfaces::scanner::{IntervalScanner, ScriptedFrames};
use std::time::Duration;

pub fn controller(
    gateway: InMemoryGateway,
    verifier: InMemoryVerifier,
) -> PaymentSessionController {
    PaymentSessionController::new(
        Box::new(gateway),
        Box::new(verifier),
        PaymentConfig::default(),
    )
}

/// A scanner over scripted frames with a short cadence so tests stay fast.
pub fn scanner_for(frames: ScriptedFrames) -> IntervalScanner<ScriptedFrames> {
    IntervalScanner::start(frames, Duration::from_millis(1)).unwrap()
}
