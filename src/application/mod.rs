//! Application layer containing the core workflow orchestration.
//!
//! This module defines the `PaymentSessionController`, the single owner
//! of the session state. All gateway and verifier traffic is mediated
//! here; everything outside reads projections.

pub mod controller;
