//! Characteristic descriptor.

use std::fmt;

use tracing::{debug, error, trace};
use uuid::Uuid;

use crate::ble::uuids::descriptor_name;
use crate::error::{Error, Result};
use crate::gatt::event::GattsEvent;
use crate::gatt::properties::AttributePermissions;
use crate::gatt::response::{answer_read, answer_write};
use crate::gatt::value::AttributeValue;
use crate::gatt::{AttributeKind, CharacteristicRef, Completion, EventOutcome, ServiceScope};
use crate::stack::{GattsIf, StackHandle};

/// A descriptor attached to a characteristic.
///
/// The handle is 0 until the stack reports the descriptor as added, and never
/// changes after that.
#[derive(Debug, Clone)]
pub struct Descriptor {
    uuid: Uuid,
    value: AttributeValue,
    handle: u16,
    /// UUID of the owning characteristic, set by [`Descriptor::create`].
    owner: Option<Uuid>,
}

impl Descriptor {
    /// Create an unregistered descriptor with an empty value.
    pub fn new(uuid: Uuid) -> Self {
        Self {
            uuid,
            value: AttributeValue::new(),
            handle: 0,
            owner: None,
        }
    }

    /// Get the descriptor UUID.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Get the UUID of the owning characteristic, once created.
    pub fn owner(&self) -> Option<Uuid> {
        self.owner
    }

    /// Ask the stack to allocate a handle for this descriptor.
    ///
    /// The handle is not known when this returns; it is adopted later in
    /// [`Descriptor::handle_event`].
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyCreated`] if a handle is assigned, [`Error::Stack`] if the
    /// stack refuses the request.
    pub fn create(&mut self, owner: &CharacteristicRef, stack: &StackHandle) -> Result<()> {
        debug!(
            ">> create(): {} ({})",
            self,
            descriptor_name(&self.uuid).unwrap_or("custom")
        );

        if self.handle != 0 {
            error!("Descriptor already has a handle.");
            return Err(Error::AlreadyCreated {
                uuid: self.uuid.to_string(),
                handle: self.handle,
            });
        }

        self.owner = Some(owner.uuid);

        let rc = stack.stack().add_char_descr(
            owner.service_handle,
            &self.uuid,
            AttributePermissions::READ_WRITE,
            &self.value,
        );
        stack.check("esp_ble_gatts_add_char_descr", rc)?;

        debug!("<< create()");
        Ok(())
    }

    /// Set the value. Data longer than [`MAX_ATTR_LEN`](crate::gatt::MAX_ATTR_LEN)
    /// is rejected and the current value kept.
    pub fn set_value(&mut self, data: &[u8]) -> Result<()> {
        self.value.set(data)
    }

    /// Get the current value.
    pub fn value(&self) -> &[u8] {
        self.value.as_bytes()
    }

    /// Get the length of the current value.
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// Check if the value is empty.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Get the handle, 0 while unassigned.
    pub fn handle(&self) -> u16 {
        self.handle
    }

    /// Set the handle.
    pub fn set_handle(&mut self, handle: u16) {
        debug!(
            ">> set_handle(0x{:02x}): Setting descriptor handle to be 0x{:02x}",
            handle, handle
        );
        self.handle = handle;
    }

    /// Handle a GATT server event.
    ///
    /// A descriptor-added event is adopted only if this descriptor was created,
    /// is still unassigned, has the event's UUID, belongs to the event's service
    /// and its owner is that service's last created characteristic. The stack
    /// offers no correlation token, so this is how the event is tied to the
    /// request that caused it.
    pub fn handle_event(
        &mut self,
        gatts_if: GattsIf,
        event: &GattsEvent,
        service: &ServiceScope,
        stack: &StackHandle,
    ) -> EventOutcome {
        match event {
            GattsEvent::DescriptorAdded {
                status,
                attr_handle,
                service_handle,
                descr_uuid,
            } => {
                let Some(owner) = self.owner else {
                    return EventOutcome::default();
                };
                trace!(
                    "Descriptor {}: event uuid {}, service 0x{:02x}/0x{:02x}, last created {:?}",
                    self.uuid,
                    descr_uuid,
                    service.handle,
                    service_handle,
                    service.last_created
                );
                if self.handle != 0
                    || *descr_uuid != self.uuid
                    || *service_handle != service.handle
                    || service.last_created != Some(owner)
                {
                    return EventOutcome::default();
                }
                if !status.is_ok() {
                    error!("Adding descriptor {} failed: {}", self.uuid, status);
                    return EventOutcome::completed(Completion::failed(
                        AttributeKind::Descriptor,
                        Error::Rejected {
                            operation: "esp_ble_gatts_add_char_descr",
                            status: *status,
                        },
                    ));
                }
                self.set_handle(*attr_handle);
                EventOutcome::completed(Completion::created(AttributeKind::Descriptor, *attr_handle))
            }
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
        }
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UUID: {}, handle: 0x{:02x}", self.uuid, self.handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::uuids::{uuid16, CLIENT_CHARACTERISTIC_CONFIGURATION_UUID};
    use crate::gatt::event::{ReadRequest, WriteRequest};
    use crate::gatt::response::GattResponse;
    use crate::gatt::MAX_ATTR_LEN;
    use crate::stack::recording::{RecordingStack, StackRequest};
    use crate::stack::{EspErr, GattStatus};
    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const SERVICE_HANDLE: u16 = 0x28;

    fn char_uuid() -> Uuid {
        uuid16(0x2a37)
    }

    fn scope(last_created: Option<Uuid>) -> ServiceScope {
        ServiceScope {
            uuid: uuid16(0x180d),
            handle: SERVICE_HANDLE,
            last_created,
        }
    }

    fn owner() -> CharacteristicRef {
        CharacteristicRef {
            uuid: char_uuid(),
            service_handle: SERVICE_HANDLE,
        }
    }

    fn added(uuid: Uuid, attr_handle: u16) -> GattsEvent {
        GattsEvent::DescriptorAdded {
            status: GattStatus::OK,
            attr_handle,
            service_handle: SERVICE_HANDLE,
            descr_uuid: uuid,
        }
    }

    fn read(handle: u16, need_rsp: bool) -> GattsEvent {
        GattsEvent::Read(ReadRequest {
            conn_id: 1,
            trans_id: 9,
            bda: [0; 6],
            handle,
            offset: 0,
            is_long: false,
            need_rsp,
        })
    }

    fn write(handle: u16, value: &[u8]) -> GattsEvent {
        GattsEvent::Write(WriteRequest {
            conn_id: 1,
            trans_id: 10,
            bda: [0; 6],
            handle,
            offset: 0,
            need_rsp: true,
            is_prep: false,
            value: Bytes::copy_from_slice(value),
        })
    }

    fn created_descriptor(recorder: &Arc<RecordingStack>) -> (Descriptor, StackHandle) {
        let stack = StackHandle::new(recorder.clone());
        let mut descriptor = Descriptor::new(CLIENT_CHARACTERISTIC_CONFIGURATION_UUID);
        descriptor.create(&owner(), &stack).unwrap();
        (descriptor, stack)
    }

    #[test]
    fn test_new_descriptor() {
        let descriptor = Descriptor::new(CLIENT_CHARACTERISTIC_CONFIGURATION_UUID);
        assert_eq!(descriptor.handle(), 0);
        assert_eq!(descriptor.len(), 0);
        assert!(descriptor.is_empty());
        assert_eq!(descriptor.owner(), None);
    }

    #[test]
    fn test_set_value() {
        let mut descriptor = Descriptor::new(CLIENT_CHARACTERISTIC_CONFIGURATION_UUID);
        descriptor.set_value(b"AB").unwrap();
        assert_eq!(descriptor.value(), b"AB");
        assert_eq!(descriptor.len(), 2);

        let too_long = vec![1u8; MAX_ATTR_LEN + 1];
        assert!(matches!(
            descriptor.set_value(&too_long),
            Err(Error::ValueTooLong { .. })
        ));
        assert_eq!(descriptor.value(), b"AB");
        assert_eq!(descriptor.len(), 2);
    }

    #[test]
    fn test_create_issues_one_request() {
        let recorder = Arc::new(RecordingStack::new());
        let (descriptor, _) = created_descriptor(&recorder);

        assert_eq!(descriptor.owner(), Some(char_uuid()));
        assert_eq!(descriptor.handle(), 0);
        assert_eq!(
            recorder.requests(),
            vec![StackRequest::AddCharDescr {
                service_handle: SERVICE_HANDLE,
                uuid: CLIENT_CHARACTERISTIC_CONFIGURATION_UUID,
                permissions: AttributePermissions::READ_WRITE,
            }]
        );
    }

    #[test]
    fn test_create_with_handle_is_rejected() {
        let recorder = Arc::new(RecordingStack::new());
        let stack = StackHandle::new(recorder.clone());
        let mut descriptor = Descriptor::new(CLIENT_CHARACTERISTIC_CONFIGURATION_UUID);
        descriptor.set_handle(0x30);

        let result = descriptor.create(&owner(), &stack);
        assert!(matches!(result, Err(Error::AlreadyCreated { handle: 0x30, .. })));
        assert!(recorder.requests().is_empty());
        assert_eq!(descriptor.owner(), None);
    }

    #[test]
    fn test_create_stack_failure() {
        let recorder = Arc::new(RecordingStack::new());
        recorder.fail_with(EspErr::NO_MEM);
        let stack = StackHandle::new(recorder.clone());
        let mut descriptor = Descriptor::new(CLIENT_CHARACTERISTIC_CONFIGURATION_UUID);

        let result = descriptor.create(&owner(), &stack);
        assert!(matches!(
            result,
            Err(Error::Stack { code: EspErr::NO_MEM, .. })
        ));
    }

    #[test]
    fn test_adopts_handle_on_full_match() {
        let recorder = Arc::new(RecordingStack::new());
        let (mut descriptor, stack) = created_descriptor(&recorder);

        let completion = descriptor
            .handle_event(
                3,
                &added(CLIENT_CHARACTERISTIC_CONFIGURATION_UUID, 0x29),
                &scope(Some(char_uuid())),
                &stack,
            )
            .completion
            .unwrap();
        assert_eq!(completion.kind, AttributeKind::Descriptor);
        assert_eq!(completion.result.unwrap(), 0x29);
        assert_eq!(descriptor.handle(), 0x29);
    }

    #[test]
    fn test_ignores_partial_matches() {
        let recorder = Arc::new(RecordingStack::new());
        let (mut descriptor, stack) = created_descriptor(&recorder);

        // Different descriptor UUID.
        assert!(descriptor
            .handle_event(3, &added(uuid16(0x2901), 0x29), &scope(Some(char_uuid())), &stack)
            .completion
            .is_none());

        // Different service handle.
        let other_service = GattsEvent::DescriptorAdded {
            status: GattStatus::OK,
            attr_handle: 0x29,
            service_handle: SERVICE_HANDLE + 0x10,
            descr_uuid: CLIENT_CHARACTERISTIC_CONFIGURATION_UUID,
        };
        assert!(descriptor
            .handle_event(3, &other_service, &scope(Some(char_uuid())), &stack)
            .completion
            .is_none());

        // Owner is not the last created characteristic.
        assert!(descriptor
            .handle_event(
                3,
                &added(CLIENT_CHARACTERISTIC_CONFIGURATION_UUID, 0x29),
                &scope(Some(uuid16(0x2a38))),
                &stack
            )
            .completion
            .is_none());

        assert_eq!(descriptor.handle(), 0);
    }

    #[test]
    fn test_uncreated_descriptor_ignores_added_event() {
        let recorder = Arc::new(RecordingStack::new());
        let stack = StackHandle::new(recorder.clone());
        let mut descriptor = Descriptor::new(CLIENT_CHARACTERISTIC_CONFIGURATION_UUID);

        assert!(descriptor
            .handle_event(
                3,
                &added(CLIENT_CHARACTERISTIC_CONFIGURATION_UUID, 0x29),
                &scope(Some(char_uuid())),
                &stack
            )
            .completion
            .is_none());
        assert_eq!(descriptor.handle(), 0);
    }

    #[test]
    fn test_handle_is_never_reassigned() {
        let recorder = Arc::new(RecordingStack::new());
        let (mut descriptor, stack) = created_descriptor(&recorder);
        let scope = scope(Some(char_uuid()));

        descriptor.handle_event(3, &added(CLIENT_CHARACTERISTIC_CONFIGURATION_UUID, 0x29), &scope, &stack);
        let second =
            descriptor.handle_event(3, &added(CLIENT_CHARACTERISTIC_CONFIGURATION_UUID, 0x2b), &scope, &stack);

        assert!(second.completion.is_none());
        assert_eq!(descriptor.handle(), 0x29);
    }

    #[test]
    fn test_rejected_status() {
        let recorder = Arc::new(RecordingStack::new());
        let (mut descriptor, stack) = created_descriptor(&recorder);
        let event = GattsEvent::DescriptorAdded {
            status: GattStatus::DB_FULL,
            attr_handle: 0,
            service_handle: SERVICE_HANDLE,
            descr_uuid: CLIENT_CHARACTERISTIC_CONFIGURATION_UUID,
        };

        let completion = descriptor
            .handle_event(3, &event, &scope(Some(char_uuid())), &stack)
            .completion
            .unwrap();
        assert!(matches!(
            completion.result,
            Err(Error::Rejected { status: GattStatus::DB_FULL, .. })
        ));
        assert_eq!(descriptor.handle(), 0);
    }

    #[test]
    fn test_write_updates_value_and_responds() {
        let recorder = Arc::new(RecordingStack::new());
        let stack = StackHandle::new(recorder.clone());
        let mut descriptor = Descriptor::new(CLIENT_CHARACTERISTIC_CONFIGURATION_UUID);
        descriptor.set_handle(0x29);
        descriptor.set_value(b"AB").unwrap();

        let outcome = descriptor.handle_event(3, &write(0x29, b"CD"), &scope(None), &stack);

        assert_eq!(outcome.written, Some(CLIENT_CHARACTERISTIC_CONFIGURATION_UUID));
        assert_eq!(descriptor.value(), b"CD");
        assert_eq!(
            recorder.responses(),
            vec![StackRequest::SendResponse {
                gatts_if: 3,
                conn_id: 1,
                trans_id: 10,
                status: GattStatus::OK,
                response: GattResponse::new(0x29, 0, &AttributeValue::from_slice(b"CD").unwrap()),
            }]
        );
    }

    #[test]
    fn test_oversized_write_is_not_reported() {
        let recorder = Arc::new(RecordingStack::new());
        let stack = StackHandle::new(recorder.clone());
        let mut descriptor = Descriptor::new(CLIENT_CHARACTERISTIC_CONFIGURATION_UUID);
        descriptor.set_handle(0x29);
        descriptor.set_value(b"AB").unwrap();

        let oversized = vec![0u8; crate::gatt::MAX_ATTR_LEN + 1];
        let outcome = descriptor.handle_event(3, &write(0x29, &oversized), &scope(None), &stack);

        assert!(outcome.written.is_none());
        assert_eq!(descriptor.value(), b"AB");
        assert_eq!(recorder.responses().len(), 1);
    }

    #[test]
    fn test_write_to_other_handle_is_ignored() {
        let recorder = Arc::new(RecordingStack::new());
        let stack = StackHandle::new(recorder.clone());
        let mut descriptor = Descriptor::new(CLIENT_CHARACTERISTIC_CONFIGURATION_UUID);
        descriptor.set_handle(0x29);

        descriptor.handle_event(3, &write(0x2a, b"CD"), &scope(None), &stack);

        assert!(descriptor.is_empty());
        assert!(recorder.responses().is_empty());
    }

    #[test]
    fn test_read_responds_with_value() {
        let recorder = Arc::new(RecordingStack::new());
        let stack = StackHandle::new(recorder.clone());
        let mut descriptor = Descriptor::new(CLIENT_CHARACTERISTIC_CONFIGURATION_UUID);
        descriptor.set_handle(0x29);
        descriptor.set_value(&[0x01, 0x00]).unwrap();

        descriptor.handle_event(3, &read(0x29, true), &scope(None), &stack);
        descriptor.handle_event(3, &read(0x29, false), &scope(None), &stack);

        assert_eq!(
            recorder.responses(),
            vec![StackRequest::SendResponse {
                gatts_if: 3,
                conn_id: 1,
                trans_id: 9,
                status: GattStatus::OK,
                response: GattResponse::new(
                    0x29,
                    0,
                    &AttributeValue::from_slice(&[0x01, 0x00]).unwrap()
                ),
            }]
        );
    }

    #[test]
    fn test_unassigned_descriptor_never_responds() {
        let recorder = Arc::new(RecordingStack::new());
        let stack = StackHandle::new(recorder.clone());
        let mut descriptor = Descriptor::new(CLIENT_CHARACTERISTIC_CONFIGURATION_UUID);

        descriptor.handle_event(3, &read(0, true), &scope(None), &stack);
        descriptor.handle_event(3, &write(0, b"CD"), &scope(None), &stack);

        assert!(recorder.responses().is_empty());
        assert!(descriptor.is_empty());
    }

    #[test]
    fn test_display() {
        let mut descriptor = Descriptor::new(uuid16(0x2902));
        descriptor.set_handle(0x29);
        assert_eq!(
            descriptor.to_string(),
            "UUID: 00002902-0000-1000-8000-00805f9b34fb, handle: 0x29"
        );
    }
}
