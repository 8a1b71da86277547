//! Bounded attribute value buffer.

use tracing::error;

use crate::error::{Error, Result};

/// Maximum length of an attribute value (`ESP_GATT_MAX_ATTR_LEN`).
pub const MAX_ATTR_LEN: usize = 600;

/// Attribute value whose length never exceeds [`MAX_ATTR_LEN`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttributeValue {
    bytes: Vec<u8>,
}

impl AttributeValue {
    /// Create an empty value.
    pub fn new() -> Self {
        Self {
            bytes: Vec::with_capacity(MAX_ATTR_LEN),
        }
    }

    /// Create a value from bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValueTooLong`] if `data` exceeds [`MAX_ATTR_LEN`].
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let mut value = Self::new();
        value.set(data)?;
        Ok(value)
    }

    /// Replace the contents. Oversized input leaves the value untouched.
    pub fn set(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > MAX_ATTR_LEN {
            error!(
                "Size {} too large, must be no bigger than {}",
                data.len(),
                MAX_ATTR_LEN
            );
            return Err(Error::ValueTooLong {
                len: data.len(),
                max: MAX_ATTR_LEN,
            });
        }
        self.bytes.clear();
        self.bytes.extend_from_slice(data);
        Ok(())
    }

    /// Get the current bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Get the current length.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the value is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Maximum length this value can hold.
    pub fn max_len(&self) -> usize {
        MAX_ATTR_LEN
    }
}

impl AsRef<[u8]> for AttributeValue {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_is_empty() {
        let value = AttributeValue::new();
        assert!(value.is_empty());
        assert_eq!(value.len(), 0);
        assert_eq!(value.max_len(), MAX_ATTR_LEN);
    }

    #[test]
    fn test_set_at_limit() {
        let data = vec![0xA5; MAX_ATTR_LEN];
        let value = AttributeValue::from_slice(&data).unwrap();
        assert_eq!(value.len(), MAX_ATTR_LEN);
        assert_eq!(value.as_bytes(), data.as_slice());
    }

    #[test]
    fn test_set_over_limit_is_rejected() {
        let mut value = AttributeValue::from_slice(b"AB").unwrap();
        let result = value.set(&vec![0; MAX_ATTR_LEN + 1]);
        assert!(matches!(
            result,
            Err(Error::ValueTooLong { len, max }) if len == MAX_ATTR_LEN + 1 && max == MAX_ATTR_LEN
        ));
        assert_eq!(value.as_bytes(), b"AB");
    }

    proptest! {
        #[test]
        fn prop_set_keeps_length_bounded(
            initial in proptest::collection::vec(any::<u8>(), 0..=MAX_ATTR_LEN),
            data in proptest::collection::vec(any::<u8>(), 0..(MAX_ATTR_LEN * 2)),
        ) {
            let mut value = AttributeValue::from_slice(&initial).unwrap();
            let result = value.set(&data);
            if data.len() <= MAX_ATTR_LEN {
                prop_assert!(result.is_ok());
                prop_assert_eq!(value.as_bytes(), data.as_slice());
            } else {
                prop_assert!(result.is_err());
                prop_assert_eq!(value.as_bytes(), initial.as_slice());
            }
            prop_assert!(value.len() <= MAX_ATTR_LEN);
        }
    }
}
