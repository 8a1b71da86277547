//! Bluetooth SIG UUIDs and helpers for 16/32-bit short forms.
//!
//! Short UUIDs expand onto the Bluetooth base UUID
//! `00000000-0000-1000-8000-00805f9b34fb`.

use uuid::Uuid;

/// The Bluetooth base UUID.
pub const BLUETOOTH_BASE_UUID: Uuid = Uuid::from_u128(0x0000_0000_0000_1000_8000_00805f9b34fb);

/// Expand a 16-bit SIG-assigned UUID.
pub const fn uuid16(short: u16) -> Uuid {
    uuid32(short as u32)
}

/// Expand a 32-bit SIG-assigned UUID.
pub const fn uuid32(short: u32) -> Uuid {
    Uuid::from_u128(BLUETOOTH_BASE_UUID.as_u128() | ((short as u128) << 96))
}

/// The 16-bit short form of `uuid`, if it is built on the base UUID.
pub fn as_uuid16(uuid: &Uuid) -> Option<u16> {
    let value = uuid.as_u128();
    let short = (value >> 96) as u32;
    if value & ((1u128 << 96) - 1) == BLUETOOTH_BASE_UUID.as_u128() && short <= u16::MAX as u32 {
        Some(short as u16)
    } else {
        None
    }
}

// Services
/// Generic Access service.
pub const GENERIC_ACCESS_SERVICE_UUID: Uuid = uuid16(0x1800);
/// Generic Attribute service.
pub const GENERIC_ATTRIBUTE_SERVICE_UUID: Uuid = uuid16(0x1801);
/// Device Information service.
pub const DEVICE_INFO_SERVICE_UUID: Uuid = uuid16(0x180a);
/// Heart Rate service.
pub const HEART_RATE_SERVICE_UUID: Uuid = uuid16(0x180d);
/// Battery service.
pub const BATTERY_SERVICE_UUID: Uuid = uuid16(0x180f);

// Descriptors
/// Characteristic Extended Properties descriptor.
pub const CHARACTERISTIC_EXTENDED_PROPERTIES_UUID: Uuid = uuid16(0x2900);
/// Characteristic User Description descriptor.
pub const CHARACTERISTIC_USER_DESCRIPTION_UUID: Uuid = uuid16(0x2901);
/// Client Characteristic Configuration descriptor (CCCD).
pub const CLIENT_CHARACTERISTIC_CONFIGURATION_UUID: Uuid = uuid16(0x2902);
/// Server Characteristic Configuration descriptor.
pub const SERVER_CHARACTERISTIC_CONFIGURATION_UUID: Uuid = uuid16(0x2903);
/// Characteristic Presentation Format descriptor.
pub const CHARACTERISTIC_PRESENTATION_FORMAT_UUID: Uuid = uuid16(0x2904);

/// Name of a well-known service, for log lines.
pub fn gatt_service_name(uuid: &Uuid) -> Option<&'static str> {
    match as_uuid16(uuid)? {
        0x1800 => Some("Generic Access"),
        0x1801 => Some("Generic Attribute"),
        0x180a => Some("Device Information"),
        0x180d => Some("Heart Rate"),
        0x180f => Some("Battery Service"),
        _ => None,
    }
}

/// Name of a well-known descriptor, for log lines.
pub fn descriptor_name(uuid: &Uuid) -> Option<&'static str> {
    match as_uuid16(uuid)? {
        0x2900 => Some("Characteristic Extended Properties"),
        0x2901 => Some("Characteristic User Description"),
        0x2902 => Some("Client Characteristic Configuration"),
        0x2903 => Some("Server Characteristic Configuration"),
        0x2904 => Some("Characteristic Presentation Format"),
        _ => None,
    }
}
