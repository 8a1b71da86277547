//! GATT characteristic.

use std::fmt;

use tracing::{debug, error};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::gatt::descriptor::Descriptor;
use crate::gatt::event::GattsEvent;
use crate::gatt::properties::{AttributePermissions, CharacteristicProperties};
use crate::gatt::response::{answer_read, answer_write};
use crate::gatt::value::AttributeValue;
use crate::gatt::{CharacteristicRef, EventOutcome, ServiceScope};
use crate::stack::{GattsIf, StackHandle};

/// A characteristic and the descriptors attached to it.
#[derive(Debug, Clone)]
pub struct Characteristic {
    uuid: Uuid,
    handle: u16,
    properties: CharacteristicProperties,
    permissions: AttributePermissions,
    value: AttributeValue,
    descriptors: Vec<Descriptor>,
}

impl Characteristic {
    /// Create an unregistered characteristic with read/write permissions.
    pub fn new(uuid: Uuid, properties: CharacteristicProperties) -> Self {
        Self {
            uuid,
            handle: 0,
            properties,
            permissions: AttributePermissions::READ_WRITE,
            value: AttributeValue::new(),
            descriptors: Vec::new(),
        }
    }

    /// Replace the attribute permissions.
    pub fn with_permissions(mut self, permissions: AttributePermissions) -> Self {
        self.permissions = permissions;
        self
    }

    /// Get the characteristic UUID.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Get the value handle, 0 while unassigned.
    pub fn handle(&self) -> u16 {
        self.handle
    }

    /// Set the value handle.
    pub fn set_handle(&mut self, handle: u16) {
        debug!(">> set_handle(0x{:02x}) for characteristic {}", handle, self.uuid);
        self.handle = handle;
    }

    /// Get the properties.
    pub fn properties(&self) -> CharacteristicProperties {
        self.properties
    }

    /// Get the attribute permissions.
    pub fn permissions(&self) -> AttributePermissions {
        self.permissions
    }

    /// Set the value.
    pub fn set_value(&mut self, data: &[u8]) -> Result<()> {
        self.value.set(data)
    }

    /// Get the current value.
    pub fn value(&self) -> &[u8] {
        self.value.as_bytes()
    }

    /// Attach a descriptor. Must happen before the owning service is started.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateDescriptor`] if a descriptor with the same UUID is attached.
    pub fn add_descriptor(&mut self, descriptor: Descriptor) -> Result<()> {
        if self.descriptor(&descriptor.uuid()).is_some() {
            error!(
                "Characteristic {} already has a descriptor with UUID {}",
                self.uuid,
                descriptor.uuid()
            );
            return Err(Error::DuplicateDescriptor {
                uuid: descriptor.uuid().to_string(),
            });
        }
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Get a descriptor by UUID.
    pub fn descriptor(&self, uuid: &Uuid) -> Option<&Descriptor> {
        self.descriptors.iter().find(|d| d.uuid() == *uuid)
    }

    /// Get a mutable descriptor by UUID.
    pub fn descriptor_mut(&mut self, uuid: &Uuid) -> Option<&mut Descriptor> {
        self.descriptors.iter_mut().find(|d| d.uuid() == *uuid)
    }

    /// Get all descriptors in the order they were added.
    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    /// Ask the stack to allocate a handle for this characteristic.
    pub fn create(&mut self, service: &ServiceScope, stack: &StackHandle) -> Result<()> {
        debug!(">> create(): {}", self);

        if self.handle != 0 {
            error!("Characteristic already has a handle.");
            return Err(Error::AlreadyCreated {
                uuid: self.uuid.to_string(),
                handle: self.handle,
            });
        }
        if service.handle == 0 {
            return Err(Error::NotCreated {
                uuid: service.uuid.to_string(),
            });
        }

        let rc = stack.stack().add_char(
            service.handle,
            &self.uuid,
            self.permissions,
            self.properties,
            &self.value,
        );
        stack.check("esp_ble_gatts_add_char", rc)?;

        debug!("<< create()");
        Ok(())
    }

    /// Ask the stack to allocate a handle for one of this characteristic's
    /// descriptors. The characteristic itself must already have a handle.
    pub fn create_descriptor(
        &mut self,
        descriptor_uuid: &Uuid,
        service_handle: u16,
        stack: &StackHandle,
    ) -> Result<()> {
        if self.handle == 0 {
            return Err(Error::NotCreated {
                uuid: self.uuid.to_string(),
            });
        }
        let owner = CharacteristicRef {
            uuid: self.uuid,
            service_handle,
        };
        self.descriptor_mut(descriptor_uuid)
            .ok_or_else(|| Error::DescriptorNotFound {
                uuid: descriptor_uuid.to_string(),
            })?
            .create(&owner, stack)
    }

    /// UUID of the attribute (this characteristic or one of its descriptors)
    /// owning `handle`.
    pub fn attribute_uuid(&self, handle: u16) -> Option<Uuid> {
        if handle == 0 {
            return None;
        }
        if self.handle == handle {
            return Some(self.uuid);
        }
        self.descriptors
            .iter()
            .find(|d| d.handle() == handle)
            .map(Descriptor::uuid)
    }

    /// Handle a GATT server event, then pass it on to every descriptor.
    pub fn handle_event(
        &mut self,
        gatts_if: GattsIf,
        event: &GattsEvent,
        service: &ServiceScope,
        stack: &StackHandle,
    ) -> EventOutcome {
        let mut outcome = match event {
            GattsEvent::Write(request) if self.handle != 0 && request.handle == self.handle => {
                if answer_write(stack, gatts_if, self.handle, &mut self.value, request) {
                    EventOutcome::accepted_write(self.uuid)
                } else {
                    EventOutcome::default()
                }
            }
            GattsEvent::Read(request) if self.handle != 0 && request.handle == self.handle => {
                answer_read(stack, gatts_if, &self.value, request);
                EventOutcome::default()
            }
            _ => EventOutcome::default(),
        };

        for descriptor in &mut self.descriptors {
            outcome = outcome.or(descriptor.handle_event(gatts_if, event, service, stack));
        }
        outcome
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UUID: {}, handle: 0x{:02x}, props: 0x{:02x}",
            self.uuid,
            self.handle,
            self.properties.bits()
        )
    }
}
