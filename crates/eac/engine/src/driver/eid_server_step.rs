//! Relay of server-dictated APDUs
//!
//! After the EAC protocol completes, the eID-Server reads the data groups
//! it is authorized for by sending raw APDUs through the terminal. The
//! terminal executes them in order and stops a batch at the first
//! response whose status the server did not declare acceptable; the
//! offending response is still reported back.

use eac_apdu_core::{CardTransport, Response};
use tracing::{debug, trace};

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::messages::{TransmitRequest, TransmitResponse};

/// Execute one transmit batch against the card channel.
pub fn relay<T: CardTransport + ?Sized>(
    transport: &mut T,
    cancel: &CancelToken,
    request: &TransmitRequest,
) -> Result<TransmitResponse> {
    let mut outputs = Vec::with_capacity(request.apdus.len());
    for apdu in &request.apdus {
        cancel.checkpoint()?;
        let raw = transport.transmit_raw(&apdu.input)?;
        let response = Response::from_bytes(&raw)?;
        trace!(status = %response.status(), "relayed apdu");
        let acceptable = apdu.accepts(response.status());
        outputs.push(raw);
        if !acceptable {
            debug!(
                status = %response.status(),
                executed = outputs.len(),
                requested = request.apdus.len(),
                "batch stopped at unacceptable status"
            );
            break;
        }
    }
    Ok(TransmitResponse { outputs })
}
