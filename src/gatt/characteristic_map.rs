//! Characteristics of a service, by UUID and by handle.

use std::collections::HashMap;
use std::fmt;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::gatt::characteristic::Characteristic;

/// Owns the characteristics of a service in insertion order.
///
/// UUID lookup is available as soon as a characteristic is inserted; handle
/// lookup only after [`CharacteristicMap::set_handle`] records the handle the
/// stack assigned.
#[derive(Debug, Default, Clone)]
pub struct CharacteristicMap {
    entries: Vec<Characteristic>,
    by_uuid: HashMap<Uuid, usize>,
    by_handle: HashMap<u16, usize>,
}

impl CharacteristicMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a characteristic.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateCharacteristic`] if the UUID is already present.
    pub fn insert(&mut self, characteristic: Characteristic) -> Result<()> {
        let uuid = characteristic.uuid();
        if self.by_uuid.contains_key(&uuid) {
            return Err(Error::DuplicateCharacteristic {
                uuid: uuid.to_string(),
            });
        }
        self.by_uuid.insert(uuid, self.entries.len());
        self.entries.push(characteristic);
        Ok(())
    }

    /// Assign `handle` to the characteristic with `uuid` and index it.
    ///
    /// Returns `false` if no such characteristic exists.
    pub fn set_handle(&mut self, uuid: &Uuid, handle: u16) -> bool {
        let Some(&index) = self.by_uuid.get(uuid) else {
            return false;
        };
        self.entries[index].set_handle(handle);
        self.by_handle.insert(handle, index);
        true
    }

    /// Get a characteristic by UUID.
    pub fn get_by_uuid(&self, uuid: &Uuid) -> Option<&Characteristic> {
        self.by_uuid.get(uuid).map(|&i| &self.entries[i])
    }

    /// Get a mutable characteristic by UUID.
    pub fn get_by_uuid_mut(&mut self, uuid: &Uuid) -> Option<&mut Characteristic> {
        match self.by_uuid.get(uuid) {
            Some(&i) => Some(&mut self.entries[i]),
            None => None,
        }
    }

    /// Get a characteristic by its assigned handle.
    pub fn get_by_handle(&self, handle: u16) -> Option<&Characteristic> {
        self.by_handle.get(&handle).map(|&i| &self.entries[i])
    }

    /// UUIDs in insertion order.
    pub fn uuids(&self) -> Vec<Uuid> {
        self.entries.iter().map(Characteristic::uuid).collect()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Characteristic> {
        self.entries.iter()
    }

    /// Iterate mutably in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Characteristic> {
        self.entries.iter_mut()
    }

    /// Number of characteristics.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for CharacteristicMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, characteristic) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(
                f,
                "handle: 0x{:02x}, uuid: {}",
                characteristic.handle(),
                characteristic.uuid()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::uuids::uuid16;
    use crate::gatt::properties::CharacteristicProperties;

    fn characteristic(short: u16) -> Characteristic {
        Characteristic::new(uuid16(short), CharacteristicProperties::READ)
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let mut map = CharacteristicMap::new();
        for short in [0x2a29, 0x2a24, 0x2a25] {
            map.insert(characteristic(short)).unwrap();
        }
        assert_eq!(
            map.uuids(),
            vec![uuid16(0x2a29), uuid16(0x2a24), uuid16(0x2a25)]
        );
    }

    #[test]
    fn test_duplicate_uuid_keeps_original() {
        let mut map = CharacteristicMap::new();
        let mut first = characteristic(0x2a19);
        first.set_value(b"first").unwrap();
        map.insert(first).unwrap();

        let result = map.insert(characteristic(0x2a19));
        assert!(matches!(result, Err(Error::DuplicateCharacteristic { .. })));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get_by_uuid(&uuid16(0x2a19)).unwrap().value(), b"first");
    }

    #[test]
    fn test_handle_lookup_after_assignment() {
        let mut map = CharacteristicMap::new();
        map.insert(characteristic(0x2a19)).unwrap();
        assert!(map.get_by_handle(0x2a).is_none());

        assert!(map.set_handle(&uuid16(0x2a19), 0x2a));
        assert!(!map.set_handle(&uuid16(0x2a37), 0x2c));
        assert_eq!(map.get_by_handle(0x2a).unwrap().uuid(), uuid16(0x2a19));
        assert_eq!(map.get_by_uuid(&uuid16(0x2a19)).unwrap().handle(), 0x2a);
    }

    #[test]
    fn test_display_lists_entries() {
        let mut map = CharacteristicMap::new();
        map.insert(characteristic(0x2a19)).unwrap();
        map.set_handle(&uuid16(0x2a19), 0x2a);
        assert_eq!(
            map.to_string(),
            "handle: 0x2a, uuid: 00002a19-0000-1000-8000-00805f9b34fb"
        );
    }
}
