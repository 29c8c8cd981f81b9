use crate::domain::ports::{CodeReader, DecodeEvent};
use crate::error::PaymentError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior, interval};
use tracing::debug;

/// A camera-like device that yields frames on demand.
///
/// `open` is called before the first sample and `close` when scanning
/// stops. [`IntervalScanner`] owns both calls so the device is released
/// on every exit path.
pub trait FrameSource: Send {
    fn open(&mut self) -> Result<(), PaymentError>;

    /// Samples one frame. `Some` carries the decoded text of a code
    /// found in the frame; `None` is an unreadable frame.
    fn sample(&mut self) -> Option<String>;

    fn close(&mut self);
}

/// Samples a frame source at a fixed cadence, producing decode events.
///
/// The sequence is lazy and infinite: nothing is sampled until the
/// consumer asks, and unreadable frames keep coming forever. The device
/// is opened on construction and closed on drop.
pub struct IntervalScanner<F: FrameSource> {
    source: F,
    ticker: Interval,
}

impl<F: FrameSource> IntervalScanner<F> {
    /// Acquires the device and starts ticking at `cadence`.
    pub fn start(mut source: F, cadence: Duration) -> Result<Self, PaymentError> {
        source.open()?;
        let mut ticker = interval(cadence);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(?cadence, "scanner started");
        Ok(Self { source, ticker })
    }
}

impl<F: FrameSource> Drop for IntervalScanner<F> {
    fn drop(&mut self) {
        debug!("scanner stopped; releasing device");
        self.source.close();
    }
}

#[async_trait]
impl<F: FrameSource> CodeReader for IntervalScanner<F> {
    async fn next_decode(&mut self) -> DecodeEvent {
        self.ticker.tick().await;
        match self.source.sample() {
            Some(text) => DecodeEvent::Decoded(text),
            None => DecodeEvent::DecodeFailed,
        }
    }
}

/// A frame source fed from a fixed script.
///
/// Once the script runs out it keeps yielding unreadable frames, so the
/// decode sequence stays infinite. Clones share the device slot: only
/// one handle can be open at a time, modeling exclusive camera access.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFrames {
    frames: VecDeque<Option<String>>,
    active: Arc<AtomicBool>,
}

impl ScriptedFrames {
    pub fn new<I, S>(frames: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            frames: frames
                .into_iter()
                .map(|frame| frame.map(Into::into))
                .collect(),
            active: Arc::default(),
        }
    }

    /// Shared handle to the device-active flag, for asserting release.
    pub fn active_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.active)
    }
}

impl FrameSource for ScriptedFrames {
    fn open(&mut self) -> Result<(), PaymentError> {
        if self.active.swap(true, Ordering::SeqCst) {
            return Err(PaymentError::Device(
                "frame source already in use".to_string(),
            ));
        }
        Ok(())
    }

    fn sample(&mut self) -> Option<String> {
        self.frames.pop_front().flatten()
    }

    fn close(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}
