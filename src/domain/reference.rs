use crate::error::PaymentError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum accepted length of a decoded reference, in bytes.
const MAX_REFERENCE_LEN: usize = 128;

/// An opaque payment reference decoded from a scanned code.
///
/// Immutable once captured. Extraction only checks that the content is
/// structurally plausible; what the reference means is the gateway's
/// business.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReference(String);

impl PaymentReference {
    /// Validates and normalizes a decoded string into a reference.
    ///
    /// Surrounding whitespace is trimmed. The result must be non-empty,
    /// at most 128 bytes, and consist of printable ASCII with no
    /// embedded whitespace.
    pub fn extract(raw: &str) -> Result<Self, PaymentError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PaymentError::InvalidReference(
                "empty scan result".to_string(),
            ));
        }
        if trimmed.len() > MAX_REFERENCE_LEN {
            return Err(PaymentError::InvalidReference(format!(
                "reference exceeds {MAX_REFERENCE_LEN} bytes"
            )));
        }
        if !trimmed.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(PaymentError::InvalidReference(
                "reference contains non-printable or embedded whitespace characters".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
