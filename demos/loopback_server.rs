//! Loopback GATT server example
//!
//! Runs a heart rate service against an in-process stand-in for the native
//! stack, then plays a client writing and reading the CCCD.
//!
//! Run with: cargo run --example loopback_server
//!
//! Set `RUST_LOG=esp_gatts=trace` to see every routed event.

use std::sync::Arc;

use bytes::Bytes;
use esp_gatts::ble::{uuid16, CLIENT_CHARACTERISTIC_CONFIGURATION_UUID, HEART_RATE_SERVICE_UUID};
use esp_gatts::gatt::GattResponse;
use esp_gatts::{
    AttributePermissions, AttributeValue, Characteristic, CharacteristicProperties, Descriptor,
    GattServer, GattServerConfig, GattStatus, GattsEvent, GattsIf, GattsStack, ReadRequest,
    Result, ServiceId, StackHandle, StackResult, WriteRequest,
};
use tokio::sync::mpsc;
use uuid::Uuid;

const GATTS_IF: GattsIf = 3;
const HEART_RATE_MEASUREMENT: Uuid = uuid16(0x2a37);

/// Requests the loopback stack has to answer.
#[derive(Debug)]
enum Request {
    Register(u16),
    CreateService(ServiceId),
    StartService(u16),
    AddChar(u16, Uuid),
    AddDescr(u16, Uuid),
}

/// Queues every request for the responder task and prints responses.
struct LoopbackStack {
    tx: mpsc::UnboundedSender<Request>,
}

impl LoopbackStack {
    fn queue(&self, request: Request) -> StackResult {
        self.tx
            .send(request)
            .map_err(|_| esp_gatts::EspErr::INVALID_STATE)
    }
}

impl GattsStack for LoopbackStack {
    fn app_register(&self, app_id: u16) -> StackResult {
        self.queue(Request::Register(app_id))
    }

    fn create_service(&self, _gatts_if: GattsIf, service_id: &ServiceId, _num_handles: u16) -> StackResult {
        self.queue(Request::CreateService(*service_id))
    }

    fn start_service(&self, service_handle: u16) -> StackResult {
        self.queue(Request::StartService(service_handle))
    }

    fn add_char(
        &self,
        service_handle: u16,
        uuid: &Uuid,
        _permissions: AttributePermissions,
        _properties: CharacteristicProperties,
        _value: &AttributeValue,
    ) -> StackResult {
        self.queue(Request::AddChar(service_handle, *uuid))
    }

    fn add_char_descr(
        &self,
        service_handle: u16,
        uuid: &Uuid,
        _permissions: AttributePermissions,
        _value: &AttributeValue,
    ) -> StackResult {
        self.queue(Request::AddDescr(service_handle, *uuid))
    }

    fn send_response(
        &self,
        _gatts_if: GattsIf,
        conn_id: u16,
        trans_id: u32,
        status: GattStatus,
        response: &GattResponse,
    ) -> StackResult {
        println!(
            "  response conn={} trans={} status={} handle=0x{:02x} value={:02x?}",
            conn_id,
            trans_id,
            status,
            response.handle,
            response.value.as_bytes()
        );
        Ok(())
    }
}

/// Turn queued requests into the events the native stack would deliver.
fn spawn_responder(server: Arc<GattServer>, mut rx: mpsc::UnboundedReceiver<Request>) {
    tokio::spawn(async move {
        let mut next_handle: u16 = 0x28;
        while let Some(request) = rx.recv().await {
            let event = match request {
                Request::Register(app_id) => GattsEvent::Registered {
                    status: GattStatus::OK,
                    app_id,
                },
                Request::CreateService(service_id) => {
                    next_handle += 1;
                    GattsEvent::ServiceCreated {
                        status: GattStatus::OK,
                        service_handle: next_handle,
                        service_id,
                    }
                }
                Request::StartService(service_handle) => GattsEvent::ServiceStarted {
                    status: GattStatus::OK,
                    service_handle,
                },
                Request::AddChar(service_handle, char_uuid) => {
                    next_handle += 1;
                    GattsEvent::CharacteristicAdded {
                        status: GattStatus::OK,
                        attr_handle: next_handle,
                        service_handle,
                        char_uuid,
                    }
                }
                Request::AddDescr(service_handle, descr_uuid) => {
                    next_handle += 1;
                    GattsEvent::DescriptorAdded {
                        status: GattStatus::OK,
                        attr_handle: next_handle,
                        service_handle,
                        descr_uuid,
                    }
                }
            };
            server.handle_event(GATTS_IF, &event);
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "esp_gatts=info".into()),
        )
        .init();

    println!("Loopback GATT server");
    println!("====================\n");

    let (tx, rx) = mpsc::unbounded_channel();
    let server = GattServer::new(
        StackHandle::new(Arc::new(LoopbackStack { tx })),
        GattServerConfig::default(),
    );
    spawn_responder(server.clone(), rx);

    server.register_app()?;
    while server.gatts_if().is_none() {
        tokio::task::yield_now().await;
    }

    let service_handle = server.create_service(HEART_RATE_SERVICE_UUID).await?;
    println!("Service handle: 0x{:02x}", service_handle);

    let mut measurement = Characteristic::new(
        HEART_RATE_MEASUREMENT,
        CharacteristicProperties::READ | CharacteristicProperties::NOTIFY,
    );
    measurement.set_value(&[0x00, 72])?;
    measurement.add_descriptor(Descriptor::new(CLIENT_CHARACTERISTIC_CONFIGURATION_UUID))?;
    server.add_characteristic(&HEART_RATE_SERVICE_UUID, measurement)?;
    server.start_service(&HEART_RATE_SERVICE_UUID).await?;

    let (value_handle, cccd_handle) = {
        let service = server
            .service(&HEART_RATE_SERVICE_UUID)
            .ok_or_else(|| esp_gatts::Error::ServiceNotFound {
                uuid: HEART_RATE_SERVICE_UUID.to_string(),
            })?;
        service.dump();
        let characteristic = service
            .get_characteristic(&HEART_RATE_MEASUREMENT)
            .ok_or_else(|| esp_gatts::Error::CharacteristicNotFound {
                uuid: HEART_RATE_MEASUREMENT.to_string(),
            })?;
        let cccd = characteristic
            .descriptor(&CLIENT_CHARACTERISTIC_CONFIGURATION_UUID)
            .map(Descriptor::handle)
            .unwrap_or_default();
        (characteristic.handle(), cccd)
    };
    println!(
        "Measurement handle: 0x{:02x}, CCCD handle: 0x{:02x}\n",
        value_handle, cccd_handle
    );

    let mut writes = server.subscribe_writes();

    println!("Client enables notifications:");
    server.handle_event(
        GATTS_IF,
        &GattsEvent::Write(WriteRequest {
            conn_id: 0,
            trans_id: 1,
            bda: [0x24, 0x0a, 0xc4, 0x00, 0x00, 0x01],
            handle: cccd_handle,
            offset: 0,
            need_rsp: true,
            is_prep: false,
            value: Bytes::from_static(&[0x01, 0x00]),
        }),
    );
    if let Ok(write) = writes.try_recv() {
        println!("  accepted write to {}: {:02x?}", write.uuid, &write.value[..]);
    }

    println!("Client reads the measurement:");
    server.handle_event(
        GATTS_IF,
        &GattsEvent::Read(ReadRequest {
            conn_id: 0,
            trans_id: 2,
            bda: [0x24, 0x0a, 0xc4, 0x00, 0x00, 0x01],
            handle: value_handle,
            offset: 0,
            is_long: false,
            need_rsp: true,
        }),
    );

    Ok(())
}
