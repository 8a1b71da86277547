//! Responses to client reads and writes.

use tracing::{debug, trace};

use crate::gatt::event::{ReadRequest, WriteRequest};
use crate::gatt::value::AttributeValue;
use crate::stack::{GattStatus, GattsIf, StackHandle};

/// Authentication requirement of a response (`esp_gatt_auth_req_t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum AuthReq {
    /// No authentication required.
    #[default]
    None = 0,
    /// Unauthenticated encryption.
    NoMitm = 1,
    /// Authenticated encryption.
    Mitm = 2,
    /// Signed data, no MITM protection.
    SignedNoMitm = 3,
    /// Signed data with MITM protection.
    SignedMitm = 4,
}

/// Response container (`esp_gatt_rsp_t`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattResponse {
    /// Attribute handle.
    pub handle: u16,
    /// Offset of `value` within the attribute.
    pub offset: u16,
    /// Authentication requirement.
    pub auth_req: AuthReq,
    /// Attribute value.
    pub value: AttributeValue,
}

impl GattResponse {
    /// A response carrying `value`, with no authentication requirement.
    pub fn new(handle: u16, offset: u16, value: &AttributeValue) -> Self {
        Self {
            handle,
            offset,
            auth_req: AuthReq::None,
            value: value.clone(),
        }
    }

    /// Length of the carried value.
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// Check if the carried value is empty.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// Apply a client write to `value` and answer it.
///
/// Returns whether the write was accepted. An oversized write keeps the old
/// value and is answered with `ESP_GATT_INVALID_ATTR_LEN`.
pub(crate) fn answer_write(
    stack: &StackHandle,
    gatts_if: GattsIf,
    handle: u16,
    value: &mut AttributeValue,
    request: &WriteRequest,
) -> bool {
    trace!(
        "Write of {} bytes to handle 0x{:02x} at offset {}",
        request.value.len(),
        handle,
        request.offset
    );
    let (accepted, status, response) = match value.set(&request.value) {
        Ok(()) => (
            true,
            GattStatus::OK,
            GattResponse::new(handle, request.offset, value),
        ),
        Err(_) => (
            false,
            GattStatus::INVALID_ATTR_LEN,
            GattResponse::new(handle, request.offset, &AttributeValue::new()),
        ),
    };
    send(stack, gatts_if, request.conn_id, request.trans_id, status, &response);
    accepted
}

/// Answer a client read with the current `value`, if a response is expected.
pub(crate) fn answer_read(
    stack: &StackHandle,
    gatts_if: GattsIf,
    value: &AttributeValue,
    request: &ReadRequest,
) {
    if !request.need_rsp {
        return;
    }
    debug!("Sending a response (esp_ble_gatts_send_response)");
    let response = GattResponse::new(request.handle, 0, value);
    send(
        stack,
        gatts_if,
        request.conn_id,
        request.trans_id,
        GattStatus::OK,
        &response,
    );
}

fn send(
    stack: &StackHandle,
    gatts_if: GattsIf,
    conn_id: u16,
    trans_id: u32,
    status: GattStatus,
    response: &GattResponse,
) {
    let rc = stack
        .stack()
        .send_response(gatts_if, conn_id, trans_id, status, response);
    // Nobody awaits a response send; the failure is logged by check().
    let _ = stack.check("esp_ble_gatts_send_response", rc);
}
