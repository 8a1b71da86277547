//! GATT server: owns services and routes stack events to them.
//!
//! Creation of services, characteristics and descriptors is a request/event
//! round trip. The server runs one round trip at a time: a request is issued,
//! a pending slot is armed, and the matching completion event resolves it.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, Mutex, RwLock, RwLockReadGuard,
    RwLockWriteGuard,
};
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::gatt::characteristic::Characteristic;
use crate::gatt::event::{GattsEvent, WriteRequest};
use crate::gatt::service::Service;
use crate::gatt::{AttributeKind, Completion, EventOutcome};
use crate::stack::{GattStatus, GattsIf, StackHandle};

/// Capacity of the accepted-write broadcast channel.
const WRITE_CHANNEL_CAPACITY: usize = 64;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GattServerConfig {
    /// Application id passed to `app_register`.
    pub app_id: u16,
    /// Number of attribute handles reserved per service.
    pub service_handles: u16,
    /// How long to wait for a creation event before giving up.
    pub creation_timeout: Duration,
}

impl GattServerConfig {
    /// Default application id.
    pub const DEFAULT_APP_ID: u16 = 0;
    /// Default handle budget per service.
    pub const DEFAULT_SERVICE_HANDLES: u16 = 10;
    /// Default creation timeout.
    pub const DEFAULT_CREATION_TIMEOUT: Duration = Duration::from_secs(5);

    /// Set the application id.
    pub fn with_app_id(mut self, app_id: u16) -> Self {
        self.app_id = app_id;
        self
    }

    /// Set the creation timeout.
    pub fn with_creation_timeout(mut self, timeout: Duration) -> Self {
        self.creation_timeout = timeout;
        self
    }
}

impl Default for GattServerConfig {
    fn default() -> Self {
        Self {
            app_id: Self::DEFAULT_APP_ID,
            service_handles: Self::DEFAULT_SERVICE_HANDLES,
            creation_timeout: Self::DEFAULT_CREATION_TIMEOUT,
        }
    }
}

/// A client write accepted by one of the server's attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeWrite {
    /// Connection the write came from.
    pub conn_id: u16,
    /// Handle of the written attribute.
    pub handle: u16,
    /// UUID of the written attribute.
    pub uuid: Uuid,
    /// The new value.
    pub value: Bytes,
}

struct PendingCreation {
    kind: AttributeKind,
    tx: oneshot::Sender<Result<u16>>,
}

/// Removes a service whose creation did not finish, including when the
/// creating future is dropped mid-wait.
struct UnfinishedService<'a> {
    server: &'a GattServer,
    uuid: Uuid,
    created: bool,
}

impl Drop for UnfinishedService<'_> {
    fn drop(&mut self) {
        if self.created {
            return;
        }
        debug!("Discarding unfinished service {}", self.uuid);
        self.server.disarm();
        self.server.services.write().retain(|s| s.uuid() != self.uuid);
    }
}

/// A GATT server application.
///
/// Feed every callback from the native stack into [`GattServer::handle_event`];
/// the async creation methods complete as the corresponding events arrive.
pub struct GattServer {
    config: GattServerConfig,
    stack: StackHandle,
    gatts_if: RwLock<Option<GattsIf>>,
    services: RwLock<Vec<Service>>,
    creation_gate: tokio::sync::Mutex<()>,
    pending: Mutex<Option<PendingCreation>>,
    write_tx: broadcast::Sender<AttributeWrite>,
}

impl GattServer {
    /// Create a server on top of `stack`.
    pub fn new(stack: StackHandle, config: GattServerConfig) -> Arc<Self> {
        let (write_tx, _) = broadcast::channel(WRITE_CHANNEL_CAPACITY);
        Arc::new(Self {
            config,
            stack,
            gatts_if: RwLock::new(None),
            services: RwLock::new(Vec::new()),
            creation_gate: tokio::sync::Mutex::new(()),
            pending: Mutex::new(None),
            write_tx,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &GattServerConfig {
        &self.config
    }

    /// Register the application with the stack.
    ///
    /// The interface id arrives with the registration event.
    pub fn register_app(&self) -> Result<()> {
        info!("Registering GATT server application {}", self.config.app_id);
        let rc = self.stack.stack().app_register(self.config.app_id);
        self.stack.check("esp_ble_gatts_app_register", rc)
    }

    /// Interface id assigned at registration.
    pub fn gatts_if(&self) -> Option<GattsIf> {
        *self.gatts_if.read()
    }

    /// Create a service and wait for the stack to assign its handle.
    pub async fn create_service(&self, uuid: Uuid) -> Result<u16> {
        let gatts_if = self.gatts_if().ok_or(Error::NotRegistered)?;
        let _gate = self.creation_gate.lock().await;

        {
            let mut services = self.services.write();
            if services.iter().any(|s| s.uuid() == uuid) {
                error!("Service {} already exists", uuid);
                return Err(Error::DuplicateService {
                    uuid: uuid.to_string(),
                });
            }
            services.push(Service::new(uuid));
        }
        let mut unfinished = UnfinishedService {
            server: self,
            uuid,
            created: false,
        };

        let num_handles = self.config.service_handles;
        let result = self
            .round_trip(
                AttributeKind::Service,
                "esp_ble_gatts_create_service",
                |services| find_service(services, &uuid)?.create(gatts_if, num_handles, &self.stack),
            )
            .await;

        let handle = result?;
        unfinished.created = true;
        info!("Created service {} with handle 0x{:02x}", uuid, handle);
        Ok(handle)
    }

    /// Add a characteristic to a service that has not been started.
    pub fn add_characteristic(&self, service_uuid: &Uuid, characteristic: Characteristic) -> Result<()> {
        self.with_service_mut(service_uuid, |service| {
            service.add_characteristic(characteristic)
        })
    }

    /// Start a service, creating its characteristics and descriptors one at a
    /// time.
    ///
    /// A failed attribute is logged and the rest are still created; the first
    /// failure is returned once all have been tried and the service stays
    /// [`Starting`](crate::gatt::ServiceState::Starting). A timeout or
    /// cancellation stops the sequence at once.
    pub async fn start_service(&self, service_uuid: &Uuid) -> Result<()> {
        let _gate = self.creation_gate.lock().await;

        let order = self.with_service_mut(service_uuid, |service| service.start(&self.stack))?;
        let mut first_error = None;
        for char_uuid in order {
            let created = self
                .round_trip(
                    AttributeKind::Characteristic,
                    "esp_ble_gatts_add_char",
                    |services| {
                        find_service(services, service_uuid)?
                            .create_characteristic(&char_uuid, &self.stack)
                    },
                )
                .await;
            if let Err(e) = created {
                error!("Creating characteristic {} failed: {}", char_uuid, e);
                first_error.get_or_insert(stop_on_lost_sync(e)?);
                continue;
            }

            let descriptors: Vec<Uuid> = self
                .service(service_uuid)
                .and_then(|s| {
                    s.get_characteristic(&char_uuid)
                        .map(|c| c.descriptors().iter().map(|d| d.uuid()).collect())
                })
                .unwrap_or_default();
            for descr_uuid in descriptors {
                let created = self
                    .round_trip(
                        AttributeKind::Descriptor,
                        "esp_ble_gatts_add_char_descr",
                        |services| {
                            find_service(services, service_uuid)?.create_descriptor(
                                &char_uuid,
                                &descr_uuid,
                                &self.stack,
                            )
                        },
                    )
                    .await;
                if let Err(e) = created {
                    error!(
                        "Creating descriptor {} of characteristic {} failed: {}",
                        descr_uuid, char_uuid, e
                    );
                    first_error.get_or_insert(stop_on_lost_sync(e)?);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        self.with_service_mut(service_uuid, |service| {
            service.finish_start();
            service.dump();
            Ok(())
        })?;
        info!("Started service {}", service_uuid);
        Ok(())
    }

    /// Get a service by UUID.
    pub fn service(&self, uuid: &Uuid) -> Option<MappedRwLockReadGuard<'_, Service>> {
        RwLockReadGuard::try_map(self.services.read(), |services| {
            services.iter().find(|s| s.uuid() == *uuid)
        })
        .ok()
    }

    /// Get a mutable service by UUID.
    pub fn service_mut(&self, uuid: &Uuid) -> Option<MappedRwLockWriteGuard<'_, Service>> {
        RwLockWriteGuard::try_map(self.services.write(), |services| {
            services.iter_mut().find(|s| s.uuid() == *uuid)
        })
        .ok()
    }

    /// All services in creation order.
    pub fn services(&self) -> MappedRwLockReadGuard<'_, [Service]> {
        RwLockReadGuard::map(self.services.read(), |services| services.as_slice())
    }

    /// Subscribe to accepted client writes.
    pub fn subscribe_writes(&self) -> broadcast::Receiver<AttributeWrite> {
        self.write_tx.subscribe()
    }

    /// Entry point for every event delivered by the native stack.
    pub fn handle_event(&self, gatts_if: GattsIf, event: &GattsEvent) {
        trace!("handle_event: {} on gatts_if {}", event.name(), gatts_if);

        if let GattsEvent::Registered { status, app_id } = event {
            if *app_id == self.config.app_id {
                self.on_registered(gatts_if, *status);
            }
            return;
        }

        if self.gatts_if() != Some(gatts_if) {
            trace!("Ignoring {} for gatts_if {}", event.name(), gatts_if);
            return;
        }

        let outcome = self
            .services
            .write()
            .iter_mut()
            .fold(EventOutcome::default(), |outcome, service| {
                outcome.or(service.handle_event(gatts_if, event, &self.stack))
            });

        if let (GattsEvent::Write(request), Some(uuid)) = (event, outcome.written) {
            self.publish_write(request, uuid);
        }
        if let Some(completion) = outcome.completion {
            self.complete(completion);
        }
    }

    fn on_registered(&self, gatts_if: GattsIf, status: GattStatus) {
        if !status.is_ok() {
            error!("Application {} registration failed: {}", self.config.app_id, status);
            return;
        }
        info!(
            "Application {} registered, gatts_if={}",
            self.config.app_id, gatts_if
        );
        *self.gatts_if.write() = Some(gatts_if);
    }

    fn publish_write(&self, request: &WriteRequest, uuid: Uuid) {
        // No subscribers is fine.
        let _ = self.write_tx.send(AttributeWrite {
            conn_id: request.conn_id,
            handle: request.handle,
            uuid,
            value: request.value.clone(),
        });
    }

    /// Issue a creation request and wait for its completion event.
    async fn round_trip<F>(
        &self,
        kind: AttributeKind,
        operation: &'static str,
        request: F,
    ) -> Result<u16>
    where
        F: FnOnce(&mut Vec<Service>) -> Result<()>,
    {
        let rx = self.arm(kind);

        let issued = {
            let mut services = self.services.write();
            request(&mut services)
        };
        if let Err(e) = issued {
            self.disarm();
            return Err(e);
        }

        match tokio::time::timeout(self.config.creation_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::Cancelled { operation }),
            Err(_) => {
                warn!(
                    "No completion for {} within {:?}",
                    operation, self.config.creation_timeout
                );
                self.disarm();
                if kind == AttributeKind::Service {
                    for service in self.services.write().iter_mut() {
                        service.abandon_creation();
                    }
                }
                Err(Error::Timeout { operation })
            }
        }
    }

    fn arm(&self, kind: AttributeKind) -> oneshot::Receiver<Result<u16>> {
        let (tx, rx) = oneshot::channel();
        if let Some(stale) = self.pending.lock().replace(PendingCreation { kind, tx }) {
            debug!("Replacing stale pending {:?} creation", stale.kind);
        }
        rx
    }

    fn disarm(&self) {
        self.pending.lock().take();
    }

    fn complete(&self, completion: Completion) {
        let mut pending = self.pending.lock();
        match pending.take() {
            Some(waiting) if waiting.kind == completion.kind => {
                if waiting.tx.send(completion.result).is_err() {
                    debug!("{:?} creation completed after its waiter left", completion.kind);
                }
            }
            other => {
                *pending = other;
                warn!(
                    "Dropping unexpected {:?} completion: {:?}",
                    completion.kind, completion.result
                );
            }
        }
    }

    fn with_service_mut<T>(
        &self,
        uuid: &Uuid,
        f: impl FnOnce(&mut Service) -> Result<T>,
    ) -> Result<T> {
        let mut services = self.services.write();
        f(find_service(&mut services, uuid)?)
    }
}

impl std::fmt::Debug for GattServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GattServer")
            .field("config", &self.config)
            .field("gatts_if", &self.gatts_if())
            .field("services", &self.services.read().len())
            .finish_non_exhaustive()
    }
}

/// Pass on an attribute failure, or stop when the stack can no longer be
/// trusted to answer the next request in order.
fn stop_on_lost_sync(error: Error) -> Result<Error> {
    match error {
        Error::Timeout { .. } | Error::Cancelled { .. } => Err(error),
        other => Ok(other),
    }
}

fn find_service<'a>(services: &'a mut [Service], uuid: &Uuid) -> Result<&'a mut Service> {
    services
        .iter_mut()
        .find(|s| s.uuid() == *uuid)
        .ok_or_else(|| Error::ServiceNotFound {
            uuid: uuid.to_string(),
        })
}
