//! Binding to the native GATT server stack.
//!
//! The vendor stack is only reachable through [`GattsStack`]. A firmware build
//! implements it on top of `esp_ble_gatts_*`; tests implement it with a
//! recorder or a mock.

pub mod status;

#[cfg(test)]
pub(crate) mod recording;

use std::sync::Arc;

use tracing::error;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::gatt::properties::{AttributePermissions, CharacteristicProperties};
use crate::gatt::response::GattResponse;
use crate::gatt::value::AttributeValue;

pub use status::{EspErr, EspErrNames, GattStatus, StatusDescriber};

/// GATT server interface id assigned by the stack on application registration.
pub type GattsIf = u8;

/// Result of a native stack call.
pub type StackResult = std::result::Result<(), EspErr>;

/// Identity of a service as passed to and reported by the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServiceId {
    /// Service UUID.
    pub uuid: Uuid,
    /// Instance id, distinguishing services that share a UUID.
    pub inst_id: u8,
    /// Whether this is a primary service.
    pub is_primary: bool,
}

impl ServiceId {
    /// A primary service with instance id 0.
    pub fn primary(uuid: Uuid) -> Self {
        Self {
            uuid,
            inst_id: 0,
            is_primary: true,
        }
    }
}

/// Outbound requests to the native GATT server.
///
/// Every call is fire-and-forget from the stack's point of view: a successful
/// return only means the request was queued, and the outcome arrives later as
/// a [`GattsEvent`](crate::gatt::GattsEvent).
///
/// Implementations must not deliver that event from inside the request call.
/// [`GattServer`](crate::gatt::GattServer) holds its service table while
/// issuing requests, and feeding an event back on the same thread deadlocks.
#[cfg_attr(test, mockall::automock)]
pub trait GattsStack: Send + Sync {
    /// `esp_ble_gatts_app_register`.
    fn app_register(&self, app_id: u16) -> StackResult;

    /// `esp_ble_gatts_create_service`.
    fn create_service(
        &self,
        gatts_if: GattsIf,
        service_id: &ServiceId,
        num_handles: u16,
    ) -> StackResult;

    /// `esp_ble_gatts_start_service`.
    fn start_service(&self, service_handle: u16) -> StackResult;

    /// `esp_ble_gatts_add_char`.
    fn add_char(
        &self,
        service_handle: u16,
        uuid: &Uuid,
        permissions: AttributePermissions,
        properties: CharacteristicProperties,
        value: &AttributeValue,
    ) -> StackResult;

    /// `esp_ble_gatts_add_char_descr`.
    fn add_char_descr(
        &self,
        service_handle: u16,
        uuid: &Uuid,
        permissions: AttributePermissions,
        value: &AttributeValue,
    ) -> StackResult;

    /// `esp_ble_gatts_send_response`.
    fn send_response(
        &self,
        gatts_if: GattsIf,
        conn_id: u16,
        trans_id: u32,
        status: GattStatus,
        response: &GattResponse,
    ) -> StackResult;
}

/// Shared handle to the stack plus the collaborator used to describe its
/// status codes.
#[derive(Clone)]
pub struct StackHandle {
    stack: Arc<dyn GattsStack>,
    describer: Arc<dyn StatusDescriber>,
}

impl StackHandle {
    /// Wrap a stack, describing status codes with [`EspErrNames`].
    pub fn new(stack: Arc<dyn GattsStack>) -> Self {
        Self {
            stack,
            describer: Arc::new(EspErrNames),
        }
    }

    /// Replace the status code describer.
    pub fn with_describer(mut self, describer: impl StatusDescriber + 'static) -> Self {
        self.describer = Arc::new(describer);
        self
    }

    /// Get the underlying stack.
    pub fn stack(&self) -> &dyn GattsStack {
        self.stack.as_ref()
    }

    /// Describe a native status code.
    pub fn describe(&self, code: EspErr) -> String {
        self.describer.describe(code)
    }

    /// Log and convert a failed native call.
    pub(crate) fn check(&self, operation: &'static str, rc: StackResult) -> Result<()> {
        rc.map_err(|code| {
            let description = self.describe(code);
            error!("{}: rc={} {}", operation, code, description);
            Error::Stack {
                operation,
                code,
                description,
            }
        })
    }
}

impl std::fmt::Debug for StackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackHandle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_maps_failure() {
        let mut mock = MockGattsStack::new();
        mock.expect_start_service()
            .returning(|_| Err(EspErr::INVALID_STATE));
        let handle = StackHandle::new(Arc::new(mock));

        let rc = handle.stack().start_service(0x28);
        match handle.check("esp_ble_gatts_start_service", rc) {
            Err(Error::Stack {
                operation,
                code,
                description,
            }) => {
                assert_eq!(operation, "esp_ble_gatts_start_service");
                assert_eq!(code, EspErr::INVALID_STATE);
                assert_eq!(description, "ESP_ERR_INVALID_STATE");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_custom_describer() {
        let handle = StackHandle::new(Arc::new(MockGattsStack::new()))
            .with_describer(|code: EspErr| format!("vendor error {}", code));
        assert_eq!(handle.describe(EspErr::FAIL), "vendor error -1");
        assert!(handle.check("noop", Ok(())).is_ok());
    }

    #[test]
    fn test_primary_service_id() {
        let uuid = Uuid::from_u128(0x180a);
        let id = ServiceId::primary(uuid);
        assert_eq!(id.uuid, uuid);
        assert_eq!(id.inst_id, 0);
        assert!(id.is_primary);
    }
}
