use crate::domain::reference::PaymentReference;
use crate::error::{GatewayError, PaymentError, VerificationError};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Lifecycle phase of a payment session.
///
/// Tagged variants instead of ad-hoc booleans so every transition is
/// explicit and auditable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Scanning,
    ReferenceAcquired,
    OrderCreating,
    OrderCreated,
    Authorizing,
    Capturing,
    Verifying,
    Succeeded,
    Failed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Succeeded | Phase::Failed)
    }

    /// True while a network call is in flight for this session.
    pub fn is_busy(&self) -> bool {
        matches!(self, Phase::OrderCreating | Phase::Capturing | Phase::Verifying)
    }
}

/// Identity of one session incarnation.
///
/// Every in-flight external call carries the generation it was issued
/// under; a reset bumps the counter so late completions from an
/// abandoned session are recognized and discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

/// Whether a call completion was applied to the live session or
/// discarded because the session it belonged to was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Stale,
}

/// Identifier of a pending order at the authorization gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A pending payment transaction created with the gateway.
///
/// Immutable once created; scoped to one payment attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub order_id: OrderId,
    pub amount: Decimal,
    pub currency: String,
    pub reference: PaymentReference,
}

/// Outcome of the gateway's capture step.
///
/// Not sufficient on its own to declare the payment successful; the
/// settlement verifier must independently confirm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureResult {
    pub capture_id: String,
    pub gateway_confirmed: bool,
}

/// Authoritative backend verdict on whether funds actually settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub accepted: bool,
}

/// The single mutable entity of the workflow.
///
/// Owned exclusively by the session controller; everyone else reads a
/// [`SessionView`] projection. Mutators come in `begin_*`/`complete_*`
/// pairs: `begin_*` gates the transition on the current phase and hands
/// out the generation to tag the external call with, `complete_*`
/// applies the response only if that generation is still live.
#[derive(Debug)]
pub struct SessionState {
    phase: Phase,
    reference: Option<PaymentReference>,
    order: Option<OrderRecord>,
    capture: Option<CaptureResult>,
    error: Option<String>,
    generation: Generation,
    verification_issued: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            reference: None,
            order: None,
            capture: None,
            error: None,
            generation: Generation(0),
            verification_issued: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn reference(&self) -> Option<&PaymentReference> {
        self.reference.as_ref()
    }

    pub fn order(&self) -> Option<&OrderRecord> {
        self.order.as_ref()
    }

    pub fn capture(&self) -> Option<&CaptureResult> {
        self.capture.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Idle -> Scanning. The caller acquires the code reader.
    pub fn start_scanning(&mut self) -> Result<(), PaymentError> {
        if self.phase != Phase::Idle {
            return Err(self.transition_error("start_scanning"));
        }
        self.advance(Phase::Scanning);
        Ok(())
    }

    /// Scanning -> ReferenceAcquired. Scanning stops after one accepted
    /// reference; the caller releases the code reader.
    pub fn accept_reference(&mut self, reference: PaymentReference) -> Result<(), PaymentError> {
        if self.phase != Phase::Scanning {
            return Err(self.transition_error("accept_reference"));
        }
        self.reference = Some(reference);
        self.advance(Phase::ReferenceAcquired);
        Ok(())
    }

    /// ReferenceAcquired -> OrderCreating. Returns the generation to tag
    /// the `create_order` call with, plus the reference for the record.
    pub fn begin_order(&mut self) -> Result<(Generation, PaymentReference), PaymentError> {
        match (&self.phase, &self.reference) {
            (Phase::ReferenceAcquired, Some(reference)) => {
                let reference = reference.clone();
                self.advance(Phase::OrderCreating);
                Ok((self.generation, reference))
            }
            _ => Err(self.transition_error("begin_order")),
        }
    }

    /// Applies the `create_order` response: OrderCreating -> OrderCreated,
    /// or Failed on a gateway error. Stale generations are discarded.
    pub fn complete_order(
        &mut self,
        generation: Generation,
        outcome: Result<OrderRecord, GatewayError>,
    ) -> Completion {
        if !self.is_live(generation, Phase::OrderCreating, "complete_order") {
            return Completion::Stale;
        }
        match outcome {
            Ok(order) => {
                self.order = Some(order);
                self.advance(Phase::OrderCreated);
            }
            Err(err) => self.fail(err.to_string()),
        }
        Completion::Applied
    }

    /// OrderCreated -> Authorizing. The gateway's own UI takes over; the
    /// session only learns of completion through the approval callback.
    pub fn begin_authorization(&mut self) -> Result<(), PaymentError> {
        if self.phase != Phase::OrderCreated {
            return Err(self.transition_error("begin_authorization"));
        }
        self.advance(Phase::Authorizing);
        Ok(())
    }

    /// Authorizing -> Capturing, on the approval signal.
    pub fn begin_capture(&mut self) -> Result<(Generation, OrderId), PaymentError> {
        match (&self.phase, &self.order) {
            (Phase::Authorizing, Some(order)) => {
                let order_id = order.order_id.clone();
                self.advance(Phase::Capturing);
                Ok((self.generation, order_id))
            }
            _ => Err(self.transition_error("begin_capture")),
        }
    }

    /// Applies the capture response: Capturing -> Verifying regardless of
    /// the gateway's own confirmation flag, or Failed on a gateway error.
    pub fn complete_capture(
        &mut self,
        generation: Generation,
        outcome: Result<CaptureResult, GatewayError>,
    ) -> Completion {
        if !self.is_live(generation, Phase::Capturing, "complete_capture") {
            return Completion::Stale;
        }
        match outcome {
            Ok(capture) => {
                self.capture = Some(capture);
                self.advance(Phase::Verifying);
            }
            Err(err) => self.fail(err.to_string()),
        }
        Completion::Applied
    }

    /// Issues the settlement verification. Requires a capture result and
    /// is permitted at most once per capture attempt.
    pub fn begin_verification(&mut self) -> Result<(Generation, OrderId), PaymentError> {
        if self.verification_issued {
            return Err(PaymentError::Transition(
                "verification already issued for this capture".to_string(),
            ));
        }
        match (&self.phase, &self.capture, &self.order) {
            (Phase::Verifying, Some(_), Some(order)) => {
                self.verification_issued = true;
                Ok((self.generation, order.order_id.clone()))
            }
            _ => Err(self.transition_error("begin_verification")),
        }
    }

    /// Applies the verifier's verdict: Verifying -> Succeeded or Failed.
    pub fn complete_verification(
        &mut self,
        generation: Generation,
        outcome: Result<Settlement, VerificationError>,
    ) -> Completion {
        if !self.is_live(generation, Phase::Verifying, "complete_verification") {
            return Completion::Stale;
        }
        match outcome {
            Ok(Settlement { accepted: true }) => self.advance(Phase::Succeeded),
            Ok(Settlement { accepted: false }) => {
                let order = self
                    .order
                    .as_ref()
                    .map(|o| o.order_id.to_string())
                    .unwrap_or_default();
                self.fail(format!("payment could not be captured (order {order})"));
            }
            Err(err) => self.fail(err.to_string()),
        }
        Completion::Applied
    }

    /// Any state -> Idle. Discards the session entirely and bumps the
    /// generation so in-flight responses of the old session are ignored.
    pub fn reset(&mut self) {
        debug!(from = ?self.phase, "session reset");
        self.phase = Phase::Idle;
        self.reference = None;
        self.order = None;
        self.capture = None;
        self.error = None;
        self.verification_issued = false;
        self.generation = Generation(self.generation.0 + 1);
    }

    /// Immutable projection for the presentation surface.
    pub fn view(&self) -> SessionView {
        SessionView {
            phase: self.phase,
            reference: self.reference.as_ref().map(|r| r.to_string()),
            order_id: self.order.as_ref().map(|o| o.order_id.to_string()),
            busy: self.phase.is_busy(),
            error: self.error.clone(),
        }
    }

    fn advance(&mut self, next: Phase) {
        debug!(from = ?self.phase, to = ?next, "session transition");
        self.phase = next;
    }

    fn fail(&mut self, message: String) {
        warn!(from = ?self.phase, %message, "session failed");
        self.error = Some(message);
        self.phase = Phase::Failed;
    }

    fn is_live(&self, generation: Generation, expected: Phase, op: &str) -> bool {
        if generation != self.generation || self.phase != expected {
            debug!(
                op,
                issued = generation.0,
                live = self.generation.0,
                phase = ?self.phase,
                "discarding completion for abandoned session"
            );
            return false;
        }
        true
    }

    fn transition_error(&self, op: &str) -> PaymentError {
        PaymentError::Transition(format!("{op} not permitted in phase {:?}", self.phase))
    }
}

/// Read-only state projection consumed by the presentation surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub phase: Phase,
    pub reference: Option<String>,
    pub order_id: Option<String>,
    pub busy: bool,
    pub error: Option<String>,
}

impl SessionView {
    /// One-line user-facing rendering of the current state.
    pub fn status_line(&self) -> String {
        match self.phase {
            Phase::Idle => "Scan a QR code to pay.".to_string(),
            Phase::Scanning => "Scanning for a payment code...".to_string(),
            Phase::ReferenceAcquired => match &self.reference {
                Some(reference) => format!("Code accepted: {reference}"),
                None => "Code accepted.".to_string(),
            },
            Phase::OrderCreating => "Creating order...".to_string(),
            Phase::OrderCreated => match &self.order_id {
                Some(order_id) => format!("Order {order_id} created; awaiting authorization."),
                None => "Order created; awaiting authorization.".to_string(),
            },
            Phase::Authorizing => "Awaiting authorization...".to_string(),
            Phase::Capturing => "Capturing payment...".to_string(),
            Phase::Verifying => "Verifying settlement...".to_string(),
            Phase::Succeeded => "Payment successful!".to_string(),
            Phase::Failed => self
                .error
                .clone()
                .unwrap_or_else(|| "Payment failed.".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(id: &str, reference: &PaymentReference) -> OrderRecord {
        OrderRecord {
            order_id: OrderId::new(id),
            amount: dec!(10.00),
            currency: "USD".to_string(),
            reference: reference.clone(),
        }
    }

    fn acquired(reference: &str) -> SessionState {
        let mut session = SessionState::new();
        session.start_scanning().unwrap();
        session
            .accept_reference(PaymentReference::extract(reference).unwrap())
            .unwrap();
        session
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut session = acquired("REF-1001");
        let (generation, reference) = session.begin_order().unwrap();
        assert_eq!(session.phase(), Phase::OrderCreating);
        assert!(session.view().busy);

        let applied = session.complete_order(generation, Ok(order("O1", &reference)));
        assert_eq!(applied, Completion::Applied);
        assert_eq!(session.phase(), Phase::OrderCreated);
        assert_eq!(session.order().unwrap().order_id.as_str(), "O1");

        session.begin_authorization().unwrap();
        let (generation, order_id) = session.begin_capture().unwrap();
        assert_eq!(order_id.as_str(), "O1");
        session.complete_capture(
            generation,
            Ok(CaptureResult {
                capture_id: "C1".to_string(),
                gateway_confirmed: true,
            }),
        );
        assert_eq!(session.phase(), Phase::Verifying);

        let (generation, order_id) = session.begin_verification().unwrap();
        assert_eq!(order_id.as_str(), "O1");
        session.complete_verification(generation, Ok(Settlement { accepted: true }));
        assert_eq!(session.phase(), Phase::Succeeded);
        assert!(session.phase().is_terminal());
    }

    #[test]
    fn test_order_set_iff_created() {
        let mut session = acquired("REF-1001");
        assert!(session.order().is_none());
        let (generation, reference) = session.begin_order().unwrap();
        assert!(session.order().is_none());
        session.complete_order(generation, Ok(order("O1", &reference)));
        assert!(session.order().is_some());
    }

    #[test]
    fn test_gateway_failure_is_terminal() {
        let mut session = acquired("REF-1001");
        let (generation, _) = session.begin_order().unwrap();
        session.complete_order(
            generation,
            Err(GatewayError::Transport("request timed out".to_string())),
        );
        assert_eq!(session.phase(), Phase::Failed);
        assert!(session.error_message().unwrap().contains("request timed out"));
        // No order was created; capture must be impossible.
        assert!(session.begin_capture().is_err());
    }

    #[test]
    fn test_settlement_rejection_keeps_order_for_diagnostics() {
        let mut session = acquired("REF-1001");
        let (generation, reference) = session.begin_order().unwrap();
        session.complete_order(generation, Ok(order("O1", &reference)));
        session.begin_authorization().unwrap();
        let (generation, _) = session.begin_capture().unwrap();
        session.complete_capture(
            generation,
            Ok(CaptureResult {
                capture_id: "C1".to_string(),
                gateway_confirmed: true,
            }),
        );
        let (generation, _) = session.begin_verification().unwrap();
        session.complete_verification(generation, Ok(Settlement { accepted: false }));

        assert_eq!(session.phase(), Phase::Failed);
        assert!(session.error_message().unwrap().contains("O1"));
        assert_eq!(session.order().unwrap().order_id.as_str(), "O1");
    }

    #[test]
    fn test_unconfirmed_capture_still_reaches_verification() {
        let mut session = acquired("REF-1001");
        let (generation, reference) = session.begin_order().unwrap();
        session.complete_order(generation, Ok(order("O1", &reference)));
        session.begin_authorization().unwrap();
        let (generation, _) = session.begin_capture().unwrap();
        session.complete_capture(
            generation,
            Ok(CaptureResult {
                capture_id: "C1".to_string(),
                gateway_confirmed: false,
            }),
        );
        assert_eq!(session.phase(), Phase::Verifying);
    }

    #[test]
    fn test_verification_issued_at_most_once() {
        let mut session = acquired("REF-1001");
        let (generation, reference) = session.begin_order().unwrap();
        session.complete_order(generation, Ok(order("O1", &reference)));
        session.begin_authorization().unwrap();
        let (generation, _) = session.begin_capture().unwrap();
        session.complete_capture(
            generation,
            Ok(CaptureResult {
                capture_id: "C1".to_string(),
                gateway_confirmed: true,
            }),
        );

        assert!(session.begin_verification().is_ok());
        assert!(matches!(
            session.begin_verification(),
            Err(PaymentError::Transition(_))
        ));
    }

    #[test]
    fn test_verification_requires_capture() {
        let mut session = acquired("REF-1001");
        let (generation, reference) = session.begin_order().unwrap();
        session.complete_order(generation, Ok(order("O1", &reference)));
        assert!(session.begin_verification().is_err());
    }

    #[test]
    fn test_stale_completion_is_discarded() {
        let mut session = acquired("REF-1001");
        let (generation, reference) = session.begin_order().unwrap();
        let record = order("O1", &reference);

        // User rescans while the call is in flight.
        session.reset();
        assert_eq!(session.phase(), Phase::Idle);

        let applied = session.complete_order(generation, Ok(record));
        assert_eq!(applied, Completion::Stale);
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.order().is_none());
    }

    #[test]
    fn test_stale_completion_does_not_touch_replacement_session() {
        let mut session = acquired("REF-1001");
        let (old_generation, old_reference) = session.begin_order().unwrap();
        session.reset();

        // A fresh session gets as far as its own order.
        session.start_scanning().unwrap();
        session
            .accept_reference(PaymentReference::extract("REF-2002").unwrap())
            .unwrap();
        let (generation, reference) = session.begin_order().unwrap();
        session.complete_order(generation, Ok(order("O2", &reference)));

        // The abandoned session's response arrives late.
        let applied = session.complete_order(old_generation, Ok(order("O1", &old_reference)));
        assert_eq!(applied, Completion::Stale);
        assert_eq!(session.order().unwrap().order_id.as_str(), "O2");
        assert_eq!(session.phase(), Phase::OrderCreated);
    }

    #[test]
    fn test_reset_allowed_from_any_phase() {
        let mut session = acquired("REF-1001");
        let (generation, reference) = session.begin_order().unwrap();
        session.complete_order(generation, Ok(order("O1", &reference)));
        session.begin_authorization().unwrap();

        session.reset();
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.reference().is_none());
        assert!(session.order().is_none());
        assert!(session.error_message().is_none());

        // A new scan can start immediately.
        assert!(session.start_scanning().is_ok());
    }

    #[test]
    fn test_out_of_order_calls_are_rejected() {
        let mut session = SessionState::new();
        assert!(session.begin_order().is_err());
        assert!(session.begin_capture().is_err());
        assert!(session.begin_verification().is_err());
        assert!(
            session
                .accept_reference(PaymentReference::extract("REF-1").unwrap())
                .is_err()
        );

        session.start_scanning().unwrap();
        assert!(session.start_scanning().is_err());
    }

    #[test]
    fn test_view_projection() {
        let mut session = SessionState::new();
        assert_eq!(session.view().status_line(), "Scan a QR code to pay.");

        session.start_scanning().unwrap();
        session
            .accept_reference(PaymentReference::extract("REF-1001").unwrap())
            .unwrap();
        let view = session.view();
        assert_eq!(view.reference.as_deref(), Some("REF-1001"));
        assert!(!view.busy);
        assert_eq!(view.status_line(), "Code accepted: REF-1001");

        let (generation, _reference) = session.begin_order().unwrap();
        assert!(session.view().busy);
        session.complete_order(
            generation,
            Err(GatewayError::Declined {
                operation: "create-order",
                message: "insufficient funds".to_string(),
            }),
        );
        let view = session.view();
        assert_eq!(view.phase, Phase::Failed);
        assert!(view.status_line().contains("insufficient funds"));
    }
}
