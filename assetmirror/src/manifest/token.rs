//! Manifest token decoding.
//!
//! The CDN publishes the manifest as a signed token of dot-delimited
//! segments (`header.payload.signature`). The payload segment is URL-safe
//! base64 JSON. The signature is not verified.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use thiserror::Error;

/// Index of the payload segment within the token.
const PAYLOAD_SEGMENT: usize = 1;

/// URL-safe alphabet; trailing padding is tolerated but not required.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Errors while extracting the payload from a manifest token.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token has no payload segment.
    #[error("malformed manifest token: expected at least {} segments, found {found}", PAYLOAD_SEGMENT + 1)]
    MissingPayload { found: usize },

    /// The payload segment is not valid base64.
    #[error("invalid manifest payload encoding: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// Extract and decode the payload segment of a manifest token.
///
/// Returns the raw JSON bytes, which double as the baseline stored for the
/// next run.
pub fn decode_payload(token: &[u8]) -> Result<Vec<u8>, TokenError> {
    let segments: Vec<&[u8]> = token.split(|b| *b == b'.').collect();
    let payload = segments
        .get(PAYLOAD_SEGMENT)
        .ok_or(TokenError::MissingPayload {
            found: segments.len(),
        })?;

    Ok(PAYLOAD_ENGINE.decode(payload.trim_ascii())?)
}
