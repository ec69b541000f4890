//! Payload decoding with validation.
//!
//! Malformed or invalid payloads are dropped with a warning; delivery is
//! at-least-once, so downstream layers must tolerate duplicates anyway and
//! a bad payload is never worth crashing an intake pump over.

use shared_types::{EnergyRequest, PollutionBatch};
use tracing::warn;

/// Decode an inbound energy request, or `None` for junk.
#[must_use]
pub fn decode_request(payload: &[u8]) -> Option<EnergyRequest> {
    match serde_json::from_slice::<EnergyRequest>(payload) {
        Ok(request) if request.is_valid() => Some(request),
        Ok(request) => {
            warn!(
                request_id = %request.request_id,
                amount_kwh = request.amount_kwh,
                "Dropping invalid energy request"
            );
            None
        }
        Err(error) => {
            warn!(%error, "Dropping malformed energy request payload");
            None
        }
    }
}

/// Decode an inbound pollution batch, or `None` for junk.
#[must_use]
pub fn decode_batch(payload: &[u8]) -> Option<PollutionBatch> {
    match serde_json::from_slice::<PollutionBatch>(payload) {
        Ok(batch) if batch.is_valid() => Some(batch),
        Ok(batch) => {
            warn!(plant_id = batch.plant_id, "Dropping invalid pollution batch");
            None
        }
        Err(error) => {
            warn!(%error, "Dropping malformed pollution batch payload");
            None
        }
    }
}
