use crate::config::PaymentConfig;
use crate::domain::ports::{CodeReader, DecodeEvent, GatewayBox, VerifierBox};
use crate::domain::reference::PaymentReference;
use crate::domain::session::{Completion, OrderRecord, Phase, SessionState, SessionView};
use crate::error::{PaymentError, Result};
use tracing::{debug, info, warn};

/// The state machine at the heart of the workflow.
///
/// Owns the single [`SessionState`] for its lifetime and mediates every
/// call to the authorization gateway and the settlement verifier. All
/// work runs in response to discrete events on one logical task; no
/// gateway and verifier calls overlap for the same session.
pub struct PaymentSessionController {
    gateway: GatewayBox,
    verifier: VerifierBox,
    config: PaymentConfig,
    session: SessionState,
}

impl PaymentSessionController {
    pub fn new(gateway: GatewayBox, verifier: VerifierBox, config: PaymentConfig) -> Self {
        Self {
            gateway,
            verifier,
            config,
            session: SessionState::new(),
        }
    }

    /// Read access to the session for diagnostics and tests.
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// The projection consumed by the presentation surface.
    pub fn view(&self) -> SessionView {
        self.session.view()
    }

    /// Abandons the current session unconditionally. Responses of its
    /// in-flight calls, if any arrive later, are discarded.
    pub fn reset(&mut self) {
        self.session.reset();
    }

    /// Drives the code reader until the first usable value.
    ///
    /// Decode failures and extractor rejections are absorbed here and
    /// never surface to the user; the phase stays `Scanning` until a
    /// reference is accepted. The caller drops the reader afterwards,
    /// which releases the camera device.
    pub async fn scan(&mut self, reader: &mut dyn CodeReader) -> Result<()> {
        self.session.start_scanning()?;
        loop {
            match reader.next_decode().await {
                DecodeEvent::Decoded(raw) => match PaymentReference::extract(&raw) {
                    Ok(reference) => {
                        info!(%reference, "payment reference acquired");
                        self.session.accept_reference(reference)?;
                        return Ok(());
                    }
                    Err(err) => {
                        debug!(%err, "rejected decoded value; scanning continues");
                    }
                },
                DecodeEvent::DecodeFailed => {
                    debug!("frame held no readable code");
                }
            }
        }
    }

    /// Creates the gateway order for the configured fixed amount.
    ///
    /// On gateway failure the session is terminal (`Failed`); there is
    /// no automatic retry, only a fresh scan.
    pub async fn place_order(&mut self) -> Result<()> {
        let (generation, reference) = self.session.begin_order()?;
        info!(
            amount = %self.config.amount,
            currency = %self.config.currency,
            %reference,
            "creating gateway order"
        );
        let outcome = self
            .gateway
            .create_order(self.config.amount, &self.config.currency)
            .await
            .map(|order_id| OrderRecord {
                order_id,
                amount: self.config.amount,
                currency: self.config.currency.clone(),
                reference,
            });
        let error = outcome.as_ref().err().cloned();
        if self.session.complete_order(generation, outcome) == Completion::Stale {
            return Ok(());
        }
        match error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Records that the gateway's own authorization UI has taken over.
    /// Completion arrives through [`approve`](Self::approve).
    pub fn open_authorization(&mut self) -> Result<()> {
        self.session.begin_authorization()
    }

    /// The approval callback: captures the authorization and then asks
    /// the settlement verifier for the authoritative verdict.
    ///
    /// The verifier is consulted on every capture result, whatever the
    /// gateway's own confirmation flag says.
    pub async fn approve(&mut self) -> Result<()> {
        let (generation, order_id) = self.session.begin_capture()?;
        info!(%order_id, "capturing authorization");
        let outcome = self.gateway.capture_authorization(&order_id).await;
        if let Ok(capture) = &outcome
            && !capture.gateway_confirmed
        {
            warn!(
                capture_id = %capture.capture_id,
                "gateway did not confirm its own capture; verification will decide"
            );
        }
        let error = outcome.as_ref().err().cloned();
        if self.session.complete_capture(generation, outcome) == Completion::Stale {
            return Ok(());
        }
        if let Some(err) = error {
            return Err(err.into());
        }

        let (generation, order_id) = self.session.begin_verification()?;
        info!(%order_id, "verifying settlement with backend");
        let outcome = self.verifier.verify_capture(&order_id).await;
        let error = outcome.as_ref().err().cloned();
        if self.session.complete_verification(generation, outcome) == Completion::Stale {
            return Ok(());
        }
        if let Some(err) = error {
            return Err(err.into());
        }
        if self.session.phase() == Phase::Failed {
            return Err(PaymentError::NotSettled(order_id.to_string()));
        }
        Ok(())
    }

    /// Drives one full session: scan, order creation, approval, capture
    /// and verification. Approval is granted immediately; interactive
    /// surfaces call the individual steps instead.
    pub async fn run(&mut self, reader: &mut dyn CodeReader) -> Result<()> {
        self.scan(reader).await?;
        self.place_order().await?;
        self.open_authorization()?;
        self.approve().await
    }
}
