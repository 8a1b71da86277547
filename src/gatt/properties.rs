//! Characteristic properties and attribute permissions.

use bitflags::bitflags;

bitflags! {
    /// Characteristic properties (`esp_gatt_char_prop_t`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CharacteristicProperties: u8 {
        const BROADCAST = 0x01;
        const READ = 0x02;
        const WRITE_NR = 0x04;
        const WRITE = 0x08;
        const NOTIFY = 0x10;
        const INDICATE = 0x20;
        const AUTH = 0x40;
        const EXT_PROP = 0x80;
    }
}

bitflags! {
    /// Attribute permissions (`esp_gatt_perm_t`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AttributePermissions: u16 {
        const READ = 0x0001;
        const READ_ENCRYPTED = 0x0002;
        const READ_ENC_MITM = 0x0004;
        const WRITE = 0x0010;
        const WRITE_ENCRYPTED = 0x0020;
        const WRITE_ENC_MITM = 0x0040;
        const WRITE_SIGNED = 0x0080;
        const WRITE_SIGNED_MITM = 0x0100;
    }
}

impl AttributePermissions {
    /// Read and write without authentication, as used for every descriptor.
    pub const READ_WRITE: Self = Self::READ.union(Self::WRITE);
}

impl Default for AttributePermissions {
    fn default() -> Self {
        Self::READ_WRITE
    }
}
