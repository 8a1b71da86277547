//! Status codes returned and reported by the native GATT server.
//!
//! Two families exist: [`EspErr`] is the `esp_err_t` returned synchronously by
//! every `esp_ble_gatts_*` call, and [`GattStatus`] is the `esp_gatt_status_t`
//! carried by completion events and sent back in responses.

/// An `esp_err_t` result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EspErr(pub i32);

impl EspErr {
    /// `ESP_OK`.
    pub const OK: Self = Self(0);
    /// `ESP_FAIL`.
    pub const FAIL: Self = Self(-1);
    /// `ESP_ERR_NO_MEM`.
    pub const NO_MEM: Self = Self(0x101);
    /// `ESP_ERR_INVALID_ARG`.
    pub const INVALID_ARG: Self = Self(0x102);
    /// `ESP_ERR_INVALID_STATE`.
    pub const INVALID_STATE: Self = Self(0x103);
    /// `ESP_ERR_INVALID_SIZE`.
    pub const INVALID_SIZE: Self = Self(0x104);
    /// `ESP_ERR_NOT_FOUND`.
    pub const NOT_FOUND: Self = Self(0x105);
    /// `ESP_ERR_NOT_SUPPORTED`.
    pub const NOT_SUPPORTED: Self = Self(0x106);
    /// `ESP_ERR_TIMEOUT`.
    pub const TIMEOUT: Self = Self(0x107);

    /// Get the raw code.
    pub fn code(&self) -> i32 {
        self.0
    }

    /// Check if this is `ESP_OK`.
    pub fn is_ok(&self) -> bool {
        *self == Self::OK
    }

    /// The symbolic ESP-IDF name of this code, if it is a known one.
    pub fn name(&self) -> Option<&'static str> {
        let name = match *self {
            Self::OK => "ESP_OK",
            Self::FAIL => "ESP_FAIL",
            Self::NO_MEM => "ESP_ERR_NO_MEM",
            Self::INVALID_ARG => "ESP_ERR_INVALID_ARG",
            Self::INVALID_STATE => "ESP_ERR_INVALID_STATE",
            Self::INVALID_SIZE => "ESP_ERR_INVALID_SIZE",
            Self::NOT_FOUND => "ESP_ERR_NOT_FOUND",
            Self::NOT_SUPPORTED => "ESP_ERR_NOT_SUPPORTED",
            Self::TIMEOUT => "ESP_ERR_TIMEOUT",
            _ => return None,
        };
        Some(name)
    }
}

impl std::fmt::Display for EspErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Turns a native status code into text for log lines and errors.
///
/// Implemented by [`EspErrNames`] and by any `Fn(EspErr) -> String`, so a
/// firmware build can plug in `esp_err_to_name` while tests use a closure.
pub trait StatusDescriber: Send + Sync {
    /// Describe `code`.
    fn describe(&self, code: EspErr) -> String;
}

impl<F> StatusDescriber for F
where
    F: Fn(EspErr) -> String + Send + Sync,
{
    fn describe(&self, code: EspErr) -> String {
        self(code)
    }
}

/// Describes codes using the ESP-IDF symbolic names.
#[derive(Debug, Clone, Copy, Default)]
pub struct EspErrNames;

impl StatusDescriber for EspErrNames {
    fn describe(&self, code: EspErr) -> String {
        match code.name() {
            Some(name) => name.to_string(),
            None => format!("Unknown ESP_ERR Code: {}", code.0),
        }
    }
}

/// An `esp_gatt_status_t` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GattStatus(pub u8);

impl GattStatus {
    /// `ESP_GATT_OK`.
    pub const OK: Self = Self(0x00);
    /// `ESP_GATT_INVALID_HANDLE`.
    pub const INVALID_HANDLE: Self = Self(0x01);
    /// `ESP_GATT_READ_NOT_PERMIT`.
    pub const READ_NOT_PERMIT: Self = Self(0x02);
    /// `ESP_GATT_WRITE_NOT_PERMIT`.
    pub const WRITE_NOT_PERMIT: Self = Self(0x03);
    /// `ESP_GATT_INVALID_PDU`.
    pub const INVALID_PDU: Self = Self(0x04);
    /// `ESP_GATT_INSUF_AUTHENTICATION`.
    pub const INSUF_AUTHENTICATION: Self = Self(0x05);
    /// `ESP_GATT_REQ_NOT_SUPPORTED`.
    pub const REQ_NOT_SUPPORTED: Self = Self(0x06);
    /// `ESP_GATT_INVALID_OFFSET`.
    pub const INVALID_OFFSET: Self = Self(0x07);
    /// `ESP_GATT_NOT_FOUND`.
    pub const NOT_FOUND: Self = Self(0x0a);
    /// `ESP_GATT_INVALID_ATTR_LEN`.
    pub const INVALID_ATTR_LEN: Self = Self(0x0d);
    /// `ESP_GATT_NO_RESOURCES`.
    pub const NO_RESOURCES: Self = Self(0x80);
    /// `ESP_GATT_INTERNAL_ERROR`.
    pub const INTERNAL_ERROR: Self = Self(0x81);
    /// `ESP_GATT_WRONG_STATE`.
    pub const WRONG_STATE: Self = Self(0x82);
    /// `ESP_GATT_DB_FULL`.
    pub const DB_FULL: Self = Self(0x83);
    /// `ESP_GATT_BUSY`.
    pub const BUSY: Self = Self(0x84);
    /// `ESP_GATT_ERROR`.
    pub const ERROR: Self = Self(0x85);
    /// `ESP_GATT_ILLEGAL_PARAMETER`.
    pub const ILLEGAL_PARAMETER: Self = Self(0x87);

    /// Check if this is `ESP_GATT_OK`.
    pub fn is_ok(&self) -> bool {
        *self == Self::OK
    }
}

impl std::fmt::Display for GattStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match *self {
            Self::OK => "ESP_GATT_OK",
            Self::INVALID_HANDLE => "ESP_GATT_INVALID_HANDLE",
            Self::READ_NOT_PERMIT => "ESP_GATT_READ_NOT_PERMIT",
            Self::WRITE_NOT_PERMIT => "ESP_GATT_WRITE_NOT_PERMIT",
            Self::INVALID_PDU => "ESP_GATT_INVALID_PDU",
            Self::INSUF_AUTHENTICATION => "ESP_GATT_INSUF_AUTHENTICATION",
            Self::REQ_NOT_SUPPORTED => "ESP_GATT_REQ_NOT_SUPPORTED",
            Self::INVALID_OFFSET => "ESP_GATT_INVALID_OFFSET",
            Self::NOT_FOUND => "ESP_GATT_NOT_FOUND",
            Self::INVALID_ATTR_LEN => "ESP_GATT_INVALID_ATTR_LEN",
            Self::NO_RESOURCES => "ESP_GATT_NO_RESOURCES",
            Self::INTERNAL_ERROR => "ESP_GATT_INTERNAL_ERROR",
            Self::WRONG_STATE => "ESP_GATT_WRONG_STATE",
            Self::DB_FULL => "ESP_GATT_DB_FULL",
            Self::BUSY => "ESP_GATT_BUSY",
            Self::ERROR => "ESP_GATT_ERROR",
            Self::ILLEGAL_PARAMETER => "ESP_GATT_ILLEGAL_PARAMETER",
            _ => return write!(f, "ESP_GATT status {:#04x}", self.0),
        };
        f.write_str(name)
    }
}
