// Allow unusual byte groupings for UUIDs which have standard format
#![allow(clippy::unusual_byte_groupings)]

//! # esp-gatts
//!
//! A typed GATT server object model for the ESP-IDF Bluedroid stack.
//!
//! Services, characteristics and descriptors are plain Rust values. The native
//! stack is reached through the [`GattsStack`] trait, and its callbacks are fed
//! back into [`GattServer::handle_event`], which routes them to the attributes
//! they concern.
//!
//! ## Features
//!
//! - **Handle correlation**: stack-assigned handles are matched back to the
//!   attribute that requested them
//! - **Async creation**: service creation and start are awaitable, with a
//!   timeout on every stack round trip
//! - **Client I/O**: reads and writes are answered from attribute values, and
//!   accepted writes are broadcast to subscribers
//! - **Typed errors**: every failure is logged and returned as [`Error`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use esp_gatts::{
//!     ble::{uuid16, CLIENT_CHARACTERISTIC_CONFIGURATION_UUID, HEART_RATE_SERVICE_UUID},
//!     Characteristic, CharacteristicProperties, Descriptor, GattServer, GattServerConfig,
//!     GattsStack, Result, StackHandle,
//! };
//!
//! async fn run(stack: Arc<dyn GattsStack>) -> Result<()> {
//!     let server = GattServer::new(StackHandle::new(stack), GattServerConfig::default());
//!     // The stack callback must call `server.handle_event(gatts_if, &event)`.
//!     server.register_app()?;
//!
//!     server.create_service(HEART_RATE_SERVICE_UUID).await?;
//!
//!     let mut measurement = Characteristic::new(
//!         uuid16(0x2a37),
//!         CharacteristicProperties::READ | CharacteristicProperties::NOTIFY,
//!     );
//!     measurement.add_descriptor(Descriptor::new(CLIENT_CHARACTERISTIC_CONFIGURATION_UUID))?;
//!     server.add_characteristic(&HEART_RATE_SERVICE_UUID, measurement)?;
//!
//!     server.start_service(&HEART_RATE_SERVICE_UUID).await?;
//!
//!     let mut writes = server.subscribe_writes();
//!     while let Ok(write) = writes.recv().await {
//!         println!("{} <- {:02x?}", write.uuid, &write.value[..]);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization for configuration, status
//!   codes and events

// Public modules
pub mod ble;
pub mod error;
pub mod gatt;
pub mod stack;

// Re-exports for convenience
pub use error::{Error, Result};
pub use gatt::{
    AttributePermissions, AttributeValue, AttributeWrite, Characteristic,
    CharacteristicProperties, Descriptor, GattServer, GattServerConfig, GattsEvent, ReadRequest,
    Service, ServiceState, WriteRequest, MAX_ATTR_LEN,
};
pub use stack::{
    EspErr, EspErrNames, GattStatus, GattsIf, GattsStack, ServiceId, StackHandle, StackResult,
    StatusDescriber,
};
