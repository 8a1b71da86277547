//! GATT service.
//!
//! A service is identified by a UUID and owns its characteristics. Its handle,
//! and the handles of everything it contains, are allocated by the stack and
//! arrive asynchronously through [`Service::handle_event`].

use std::fmt;

use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::ble::uuids::gatt_service_name;
use crate::error::{Error, Result};
use crate::gatt::characteristic::Characteristic;
use crate::gatt::characteristic_map::CharacteristicMap;
use crate::gatt::event::GattsEvent;
use crate::gatt::{AttributeKind, Completion, EventOutcome, ServiceScope};
use crate::stack::{GattStatus, GattsIf, ServiceId, StackHandle};

/// Lifecycle of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ServiceState {
    /// No handle, no request outstanding.
    #[default]
    Unassigned,
    /// Creation requested, waiting for the stack.
    Creating,
    /// Handle assigned.
    Created,
    /// Start requested, characteristics being created.
    Starting,
    /// Every characteristic and descriptor has been created.
    Started,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unassigned => write!(f, "Unassigned"),
            Self::Creating => write!(f, "Creating"),
            Self::Created => write!(f, "Created"),
            Self::Starting => write!(f, "Starting"),
            Self::Started => write!(f, "Started"),
        }
    }
}

/// A GATT service.
#[derive(Debug, Clone)]
pub struct Service {
    uuid: Uuid,
    handle: u16,
    gatts_if: Option<GattsIf>,
    state: ServiceState,
    characteristics: CharacteristicMap,
    /// Characteristic whose creation handshake is in flight.
    last_created: Option<Uuid>,
}

impl Service {
    /// Create an unregistered service.
    pub fn new(uuid: Uuid) -> Self {
        Self {
            uuid,
            handle: 0,
            gatts_if: None,
            state: ServiceState::Unassigned,
            characteristics: CharacteristicMap::new(),
            last_created: None,
        }
    }

    /// Get the service UUID.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Get the handle, 0 while unassigned.
    pub fn handle(&self) -> u16 {
        self.handle
    }

    /// Set the handle.
    pub fn set_handle(&mut self, handle: u16) {
        debug!(">> set_handle(0x{:02x})", handle);
        self.handle = handle;
    }

    /// Get the lifecycle state.
    pub fn state(&self) -> ServiceState {
        self.state
    }

    /// Get the GATT interface the service was created on.
    pub fn gatts_if(&self) -> Option<GattsIf> {
        self.gatts_if
    }

    /// Get the identity passed to the stack.
    pub fn service_id(&self) -> ServiceId {
        ServiceId::primary(self.uuid)
    }

    /// View of this service handed to its characteristics and descriptors.
    pub fn scope(&self) -> ServiceScope {
        ServiceScope {
            uuid: self.uuid,
            handle: self.handle,
            last_created: self.last_created,
        }
    }

    /// Ask the stack to create this service on `gatts_if`.
    ///
    /// Completion is reported by the service-created event.
    pub fn create(
        &mut self,
        gatts_if: GattsIf,
        num_handles: u16,
        stack: &StackHandle,
    ) -> Result<()> {
        debug!(">> create() - Creating service (esp_ble_gatts_create_service)");

        if self.state != ServiceState::Unassigned {
            error!("Service {} is already {}", self.uuid, self.state);
            return Err(Error::AlreadyCreated {
                uuid: self.uuid.to_string(),
                handle: self.handle,
            });
        }

        self.gatts_if = Some(gatts_if);
        let rc = stack
            .stack()
            .create_service(gatts_if, &self.service_id(), num_handles);
        stack.check("esp_ble_gatts_create_service", rc)?;
        self.state = ServiceState::Creating;

        debug!("<< create()");
        Ok(())
    }

    /// Forget an outstanding creation request that will not complete.
    pub(crate) fn abandon_creation(&mut self) {
        if self.state == ServiceState::Creating {
            self.state = ServiceState::Unassigned;
        }
    }

    /// Add a characteristic.
    ///
    /// Only UUID lookup is possible until the stack assigns the characteristic a
    /// handle during [`Service::start`].
    pub fn add_characteristic(&mut self, characteristic: Characteristic) -> Result<()> {
        debug!(
            "Adding characteristic: uuid={} to service: {}",
            characteristic.uuid(),
            self
        );

        if matches!(self.state, ServiceState::Starting | ServiceState::Started) {
            error!("<< Attempt to add a characteristic to a started service");
            return Err(Error::AlreadyStarted {
                uuid: self.uuid.to_string(),
            });
        }

        self.characteristics.insert(characteristic).map_err(|e| {
            error!("<< Attempt to add a characteristic but we already have one with this UUID");
            e
        })
    }

    /// Ask the stack to start the service.
    ///
    /// Returns the characteristics to create, in insertion order. Each must be
    /// passed to [`Service::create_characteristic`] and its completion awaited
    /// before the next one is created.
    pub fn start(&mut self, stack: &StackHandle) -> Result<Vec<Uuid>> {
        debug!(
            ">> start(): Starting service (esp_ble_gatts_start_service): {}",
            self
        );

        if self.handle == 0 {
            error!("Service {} has no handle, cannot start", self.uuid);
            return Err(Error::NotCreated {
                uuid: self.uuid.to_string(),
            });
        }
        if matches!(self.state, ServiceState::Starting | ServiceState::Started) {
            return Err(Error::AlreadyStarted {
                uuid: self.uuid.to_string(),
            });
        }

        let rc = stack.stack().start_service(self.handle);
        stack.check("esp_ble_gatts_start_service", rc)?;
        self.state = ServiceState::Starting;

        debug!("<< start()");
        Ok(self.characteristics.uuids())
    }

    /// Make `uuid` the last created characteristic and ask it to create itself.
    pub fn create_characteristic(&mut self, uuid: &Uuid, stack: &StackHandle) -> Result<()> {
        self.last_created = Some(*uuid);
        let scope = self.scope();
        self.characteristics
            .get_by_uuid_mut(uuid)
            .ok_or_else(|| Error::CharacteristicNotFound {
                uuid: uuid.to_string(),
            })?
            .create(&scope, stack)
    }

    /// Ask a descriptor of `characteristic_uuid` to create itself.
    pub fn create_descriptor(
        &mut self,
        characteristic_uuid: &Uuid,
        descriptor_uuid: &Uuid,
        stack: &StackHandle,
    ) -> Result<()> {
        let service_handle = self.handle;
        self.characteristics
            .get_by_uuid_mut(characteristic_uuid)
            .ok_or_else(|| Error::CharacteristicNotFound {
                uuid: characteristic_uuid.to_string(),
            })?
            .create_descriptor(descriptor_uuid, service_handle, stack)
    }

    /// Mark the start sequence as finished.
    pub fn finish_start(&mut self) {
        if self.state == ServiceState::Starting {
            self.state = ServiceState::Started;
        }
        self.last_created = None;
    }

    /// Get a characteristic by UUID.
    pub fn get_characteristic(&self, uuid: &Uuid) -> Option<&Characteristic> {
        self.characteristics.get_by_uuid(uuid)
    }

    /// Get a mutable characteristic by UUID.
    pub fn get_characteristic_mut(&mut self, uuid: &Uuid) -> Option<&mut Characteristic> {
        self.characteristics.get_by_uuid_mut(uuid)
    }

    /// Get a characteristic by its assigned handle.
    pub fn characteristic_by_handle(&self, handle: u16) -> Option<&Characteristic> {
        self.characteristics.get_by_handle(handle)
    }

    /// Get all characteristics.
    pub fn characteristics(&self) -> &CharacteristicMap {
        &self.characteristics
    }

    /// Get the characteristic whose creation is in flight.
    pub fn last_created_characteristic(&self) -> Option<&Characteristic> {
        self.last_created
            .as_ref()
            .and_then(|uuid| self.characteristics.get_by_uuid(uuid))
    }

    /// UUID of the attribute in this service owning `handle`.
    pub fn attribute_uuid(&self, handle: u16) -> Option<Uuid> {
        self.characteristics
            .iter()
            .find_map(|c| c.attribute_uuid(handle))
    }

    /// Log the service and its characteristics.
    pub fn dump(&self) {
        let name = gatt_service_name(&self.uuid).unwrap_or("unknown");
        debug!(
            "Service: uuid:{} ({}), handle: 0x{:02x}",
            self.uuid, name, self.handle
        );
        debug!("Characteristics:\n{}", self.characteristics);
    }

    /// Handle a GATT server event, then pass it on to every characteristic.
    pub fn handle_event(
        &mut self,
        gatts_if: GattsIf,
        event: &GattsEvent,
        stack: &StackHandle,
    ) -> EventOutcome {
        let completion = match event {
            GattsEvent::CharacteristicAdded {
                status,
                attr_handle,
                service_handle,
                char_uuid,
            } if self.handle != 0 && *service_handle == self.handle => {
                self.on_characteristic_added(*status, *attr_handle, char_uuid)
            }
            GattsEvent::ServiceCreated {
                status,
                service_handle,
                service_id,
            } if service_id.uuid == self.uuid && self.handle == 0 => {
                if status.is_ok() {
                    self.set_handle(*service_handle);
                    self.state = ServiceState::Created;
                    Some(Completion::created(AttributeKind::Service, *service_handle))
                } else {
                    error!("Creating service {} failed: {}", self.uuid, status);
                    self.state = ServiceState::Unassigned;
                    Some(Completion::failed(
                        AttributeKind::Service,
                        Error::Rejected {
                            operation: "esp_ble_gatts_create_service",
                            status: *status,
                        },
                    ))
                }
            }
            GattsEvent::ServiceStarted {
                status,
                service_handle,
            } if self.handle != 0 && *service_handle == self.handle => {
                if status.is_ok() {
                    debug!("Service {} started by the stack", self.uuid);
                } else {
                    error!("Starting service {} failed: {}", self.uuid, status);
                }
                None
            }
            _ => None,
        };

        let mut outcome = EventOutcome {
            completion,
            written: None,
        };
        let scope = self.scope();
        for characteristic in self.characteristics.iter_mut() {
            outcome = outcome.or(characteristic.handle_event(gatts_if, event, &scope, stack));
        }
        outcome
    }

    fn on_characteristic_added(
        &mut self,
        status: GattStatus,
        attr_handle: u16,
        char_uuid: &Uuid,
    ) -> Option<Completion> {
        let existing = self.characteristics.get_by_uuid(char_uuid).map(Characteristic::handle);
        let completion = match existing {
            None => {
                error!(
                    "Expected to find characteristic with UUID: {}, but didnt!",
                    char_uuid
                );
                self.dump();
                Completion::failed(
                    AttributeKind::Characteristic,
                    Error::CharacteristicNotFound {
                        uuid: char_uuid.to_string(),
                    },
                )
            }
            Some(_) if !status.is_ok() => {
                error!("Adding characteristic {} failed: {}", char_uuid, status);
                Completion::failed(
                    AttributeKind::Characteristic,
                    Error::Rejected {
                        operation: "esp_ble_gatts_add_char",
                        status,
                    },
                )
            }
            Some(handle) if handle != 0 => {
                warn!(
                    "Characteristic {} already has handle 0x{:02x}, ignoring 0x{:02x}",
                    char_uuid, handle, attr_handle
                );
                return None;
            }
            Some(_) => {
                self.characteristics.set_handle(char_uuid, attr_handle);
                Completion::created(AttributeKind::Characteristic, attr_handle)
            }
        };
        Some(completion)
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UUID: {}, handle: 0x{:02x}", self.uuid, self.handle)
    }
}
