//! Error types for the esp-gatts crate.

use thiserror::Error;

use crate::stack::{EspErr, GattStatus};

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// A native GATT server call returned something other than `ESP_OK`.
    #[error("{operation}: rc={code} {description}")]
    Stack {
        /// The native call that failed.
        operation: &'static str,
        /// The raw status code returned by the stack.
        code: EspErr,
        /// Human-readable form of `code`.
        description: String,
    },

    /// The stack accepted a request but reported failure in its completion event.
    #[error("{operation} rejected by the stack: {status}")]
    Rejected {
        /// The request that was rejected.
        operation: &'static str,
        /// The status carried by the completion event.
        status: GattStatus,
    },

    /// The attribute already has a handle assigned.
    #[error("{uuid} already has handle {handle:#06x}")]
    AlreadyCreated {
        /// UUID of the attribute.
        uuid: String,
        /// The handle it already owns.
        handle: u16,
    },

    /// An attribute that must already have a handle has none.
    #[error("{uuid} has no handle yet")]
    NotCreated {
        /// UUID of the attribute that is missing its handle.
        uuid: String,
    },

    /// The service has already been started.
    #[error("Service {uuid} already started")]
    AlreadyStarted {
        /// UUID of the service.
        uuid: String,
    },

    /// The GATT application has not been registered with the stack.
    #[error("GATT server application not registered")]
    NotRegistered,

    /// A characteristic with the same UUID exists in the service.
    #[error("Duplicate characteristic: {uuid}")]
    DuplicateCharacteristic {
        /// The duplicated UUID.
        uuid: String,
    },

    /// A descriptor with the same UUID exists in the characteristic.
    #[error("Duplicate descriptor: {uuid}")]
    DuplicateDescriptor {
        /// The duplicated UUID.
        uuid: String,
    },

    /// A service with the same UUID exists in the server.
    #[error("Duplicate service: {uuid}")]
    DuplicateService {
        /// The duplicated UUID.
        uuid: String,
    },

    /// A value longer than the maximum attribute length was supplied.
    #[error("Size {len} too large, must be no bigger than {max}")]
    ValueTooLong {
        /// Length of the rejected value.
        len: usize,
        /// Maximum attribute length.
        max: usize,
    },

    /// Service not found.
    #[error("Service not found: {uuid}")]
    ServiceNotFound {
        /// The UUID of the service that was not found.
        uuid: String,
    },

    /// Characteristic not found.
    #[error("Characteristic not found: {uuid}")]
    CharacteristicNotFound {
        /// The UUID of the characteristic that was not found.
        uuid: String,
    },

    /// Descriptor not found.
    #[error("Descriptor not found: {uuid}")]
    DescriptorNotFound {
        /// The UUID of the descriptor that was not found.
        uuid: String,
    },

    /// The completion event for a request did not arrive in time.
    #[error("Timed out waiting for {operation}")]
    Timeout {
        /// The request that timed out.
        operation: &'static str,
    },

    /// The pending request was abandoned before its completion arrived.
    #[error("{operation} cancelled")]
    Cancelled {
        /// The request that was cancelled.
        operation: &'static str,
    },
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
