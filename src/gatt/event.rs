//! Events delivered by the native GATT server.
//!
//! Field names follow the `esp_ble_gatts_cb_param_t` union members they are
//! decoded from.

use bytes::Bytes;
use uuid::Uuid;

use crate::stack::{GattStatus, ServiceId};

/// A GATT server callback event.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GattsEvent {
    /// `ESP_GATTS_REG_EVT`: an application was registered.
    Registered {
        /// Registration status.
        status: GattStatus,
        /// Application id passed to `app_register`.
        app_id: u16,
    },
    /// `ESP_GATTS_CREATE_EVT`: a service was created.
    ServiceCreated {
        /// Creation status.
        status: GattStatus,
        /// Handle allocated to the service.
        service_handle: u16,
        /// Identity of the created service.
        service_id: ServiceId,
    },
    /// `ESP_GATTS_START_EVT`: a service was started.
    ServiceStarted {
        /// Start status.
        status: GattStatus,
        /// Handle of the started service.
        service_handle: u16,
    },
    /// `ESP_GATTS_ADD_CHAR_EVT`: a characteristic was added to a service.
    CharacteristicAdded {
        /// Addition status.
        status: GattStatus,
        /// Handle allocated to the characteristic value.
        attr_handle: u16,
        /// Handle of the owning service.
        service_handle: u16,
        /// UUID of the added characteristic.
        char_uuid: Uuid,
    },
    /// `ESP_GATTS_ADD_CHAR_DESCR_EVT`: a descriptor was added to the last
    /// added characteristic.
    DescriptorAdded {
        /// Addition status.
        status: GattStatus,
        /// Handle allocated to the descriptor.
        attr_handle: u16,
        /// Handle of the owning service.
        service_handle: u16,
        /// UUID of the added descriptor.
        descr_uuid: Uuid,
    },
    /// `ESP_GATTS_WRITE_EVT`: a client wrote an attribute.
    Write(WriteRequest),
    /// `ESP_GATTS_READ_EVT`: a client reads an attribute.
    Read(ReadRequest),
}

impl GattsEvent {
    /// Short name for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Registered { .. } => "ESP_GATTS_REG_EVT",
            Self::ServiceCreated { .. } => "ESP_GATTS_CREATE_EVT",
            Self::ServiceStarted { .. } => "ESP_GATTS_START_EVT",
            Self::CharacteristicAdded { .. } => "ESP_GATTS_ADD_CHAR_EVT",
            Self::DescriptorAdded { .. } => "ESP_GATTS_ADD_CHAR_DESCR_EVT",
            Self::Write(_) => "ESP_GATTS_WRITE_EVT",
            Self::Read(_) => "ESP_GATTS_READ_EVT",
        }
    }
}

/// Parameters of a client write.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WriteRequest {
    /// Connection id.
    pub conn_id: u16,
    /// Transaction id to answer with.
    pub trans_id: u32,
    /// Remote device address.
    pub bda: [u8; 6],
    /// Attribute handle being written.
    pub handle: u16,
    /// Write offset.
    pub offset: u16,
    /// Whether the client expects a response.
    pub need_rsp: bool,
    /// Whether this is a prepared (queued) write.
    pub is_prep: bool,
    /// Written bytes.
    pub value: Bytes,
}

/// Parameters of a client read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReadRequest {
    /// Connection id.
    pub conn_id: u16,
    /// Transaction id to answer with.
    pub trans_id: u32,
    /// Remote device address.
    pub bda: [u8; 6],
    /// Attribute handle being read.
    pub handle: u16,
    /// Read offset.
    pub offset: u16,
    /// Whether this is a long (blob) read.
    pub is_long: bool,
    /// Whether the application must send the response.
    pub need_rsp: bool,
}
