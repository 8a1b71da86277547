//! A [`GattsStack`] that records every request, for tests.

use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{EspErr, GattStatus, GattsIf, GattsStack, ServiceId, StackResult};
use crate::gatt::properties::{AttributePermissions, CharacteristicProperties};
use crate::gatt::response::GattResponse;
use crate::gatt::value::AttributeValue;

/// A request as seen by the stack.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StackRequest {
    AppRegister {
        app_id: u16,
    },
    CreateService {
        gatts_if: GattsIf,
        service_id: ServiceId,
        num_handles: u16,
    },
    StartService {
        service_handle: u16,
    },
    AddChar {
        service_handle: u16,
        uuid: Uuid,
        permissions: AttributePermissions,
        properties: CharacteristicProperties,
    },
    AddCharDescr {
        service_handle: u16,
        uuid: Uuid,
        permissions: AttributePermissions,
    },
    SendResponse {
        gatts_if: GattsIf,
        conn_id: u16,
        trans_id: u32,
        status: GattStatus,
        response: GattResponse,
    },
}

/// Records requests and optionally forwards them to a channel.
#[derive(Default)]
pub(crate) struct RecordingStack {
    requests: Mutex<Vec<StackRequest>>,
    fail_with: Mutex<Option<EspErr>>,
    forward: Mutex<Option<mpsc::UnboundedSender<StackRequest>>>,
}

impl RecordingStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Also send every request to the returned receiver.
    pub(crate) fn forwarding() -> (Self, mpsc::UnboundedReceiver<StackRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let stack = Self::default();
        *stack.forward.lock() = Some(tx);
        (stack, rx)
    }

    /// Make every subsequent call fail with `code`.
    pub(crate) fn fail_with(&self, code: EspErr) {
        *self.fail_with.lock() = Some(code);
    }

    pub(crate) fn requests(&self) -> Vec<StackRequest> {
        self.requests.lock().clone()
    }

    pub(crate) fn responses(&self) -> Vec<StackRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| matches!(r, StackRequest::SendResponse { .. }))
            .cloned()
            .collect()
    }

    pub(crate) fn clear(&self) {
        self.requests.lock().clear();
    }

    fn record(&self, request: StackRequest) -> StackResult {
        if let Some(code) = *self.fail_with.lock() {
            return Err(code);
        }
        if let Some(tx) = self.forward.lock().as_ref() {
            let _ = tx.send(request.clone());
        }
        self.requests.lock().push(request);
        Ok(())
    }
}

impl GattsStack for RecordingStack {
    fn app_register(&self, app_id: u16) -> StackResult {
        self.record(StackRequest::AppRegister { app_id })
    }

    fn create_service(
        &self,
        gatts_if: GattsIf,
        service_id: &ServiceId,
        num_handles: u16,
    ) -> StackResult {
        self.record(StackRequest::CreateService {
            gatts_if,
            service_id: *service_id,
            num_handles,
        })
    }

    fn start_service(&self, service_handle: u16) -> StackResult {
        self.record(StackRequest::StartService { service_handle })
    }

    fn add_char(
        &self,
        service_handle: u16,
        uuid: &Uuid,
        permissions: AttributePermissions,
        properties: CharacteristicProperties,
        _value: &AttributeValue,
    ) -> StackResult {
        self.record(StackRequest::AddChar {
            service_handle,
            uuid: *uuid,
            permissions,
            properties,
        })
    }

    fn add_char_descr(
        &self,
        service_handle: u16,
        uuid: &Uuid,
        permissions: AttributePermissions,
        _value: &AttributeValue,
    ) -> StackResult {
        self.record(StackRequest::AddCharDescr {
            service_handle,
            uuid: *uuid,
            permissions,
        })
    }

    fn send_response(
        &self,
        gatts_if: GattsIf,
        conn_id: u16,
        trans_id: u32,
        status: GattStatus,
        response: &GattResponse,
    ) -> StackResult {
        self.record(StackRequest::SendResponse {
            gatts_if,
            conn_id,
            trans_id,
            status,
            response: response.clone(),
        })
    }
}
