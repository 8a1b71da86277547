//! GATT server object model.
//!
//! A [`GattServer`] owns [`Service`]s, which own [`Characteristic`]s, which own
//! [`Descriptor`]s. Requests flow down to the [`GattsStack`](crate::stack::GattsStack);
//! stack events flow back down the same tree through `handle_event`, with each
//! layer filtering for the events that concern it.

pub mod characteristic;
pub mod characteristic_map;
pub mod descriptor;
pub mod event;
pub mod properties;
pub mod response;
pub mod server;
pub mod service;
pub mod value;

pub use characteristic::Characteristic;
pub use characteristic_map::CharacteristicMap;
pub use descriptor::Descriptor;
pub use event::{GattsEvent, ReadRequest, WriteRequest};
pub use properties::{AttributePermissions, CharacteristicProperties};
pub use response::{AuthReq, GattResponse};
pub use server::{AttributeWrite, GattServer, GattServerConfig};
pub use service::{Service, ServiceState};
pub use value::{AttributeValue, MAX_ATTR_LEN};

use uuid::Uuid;

use crate::error::Result;

/// Kind of attribute a creation request allocates a handle for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// A service declaration.
    Service,
    /// A characteristic value.
    Characteristic,
    /// A characteristic descriptor.
    Descriptor,
}

/// Outcome of a creation request, produced when its event is handled.
#[derive(Debug)]
pub struct Completion {
    /// What was being created.
    pub kind: AttributeKind,
    /// The allocated handle, or why there is none.
    pub result: Result<u16>,
}

impl Completion {
    pub(crate) fn created(kind: AttributeKind, handle: u16) -> Self {
        Self {
            kind,
            result: Ok(handle),
        }
    }

    pub(crate) fn failed(kind: AttributeKind, error: crate::error::Error) -> Self {
        Self {
            kind,
            result: Err(error),
        }
    }
}

/// What the attribute tree did with one event.
#[derive(Debug, Default)]
pub struct EventOutcome {
    /// Outcome of the creation request the event answered, if any.
    pub completion: Option<Completion>,
    /// UUID of the attribute that accepted a client write.
    pub written: Option<Uuid>,
}

impl EventOutcome {
    pub(crate) fn completed(completion: Completion) -> Self {
        Self {
            completion: Some(completion),
            written: None,
        }
    }

    pub(crate) fn accepted_write(uuid: Uuid) -> Self {
        Self {
            completion: None,
            written: Some(uuid),
        }
    }

    /// Keep what `self` reported and fill the gaps from `other`.
    pub(crate) fn or(self, other: Self) -> Self {
        Self {
            completion: self.completion.or(other.completion),
            written: self.written.or(other.written),
        }
    }
}

/// The parts of a service its characteristics and descriptors look at while
/// creating themselves and filtering events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceScope {
    /// Service UUID.
    pub uuid: Uuid,
    /// Service handle, 0 while unassigned.
    pub handle: u16,
    /// UUID of the characteristic whose creation is in flight.
    pub last_created: Option<Uuid>,
}

/// Reference from a descriptor to its owning characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicRef {
    /// Characteristic UUID.
    pub uuid: Uuid,
    /// Handle of the service owning the characteristic.
    pub service_handle: u16,
}
