//! BLE client for the encoder's zone service.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use btleplug::api::{
    Central, CharPropFlags, Characteristic, Descriptor, Manager as _, Peripheral as _,
    ScanFilter, ValueNotification,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::time::timeout;
use uuid::Uuid;

/// Bluetooth base UUID with a 16-bit value filled in
const fn uuid16(short: u16) -> Uuid {
    Uuid::from_u128(0x0000_0000_0000_1000_8000_0080_5f9b_34fb | ((short as u128) << 96))
}

pub const ZONE_SERVICE_UUID: Uuid = uuid16(0x00FF);
pub const ZONE_CHAR_UUID: Uuid = uuid16(0xFF01);
pub const CCCD_UUID: Uuid = uuid16(0x2902);

/// Default advertised name of the firmware
pub const DEVICE_NAME: &str = "BLE_Encoder";

/// BLE client connected to an encoder.
pub struct EncoderClient {
    peripheral: Peripheral,
    zone_char: Characteristic,
    /// Notification payloads received since the last drain
    notifications: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl EncoderClient {
    /// Scan for a device by name and connect.
    pub async fn connect_by_name(name: &str, scan_timeout: Duration) -> Result<Self> {
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;
        let adapter = adapters
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No Bluetooth adapters found"))?;

        adapter.start_scan(ScanFilter::default()).await?;
        let peripheral = Self::find_device_by_name(&adapter, name, scan_timeout).await?;
        adapter.stop_scan().await?;

        peripheral.connect().await?;
        peripheral.discover_services().await?;

        let zone_char = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.service_uuid == ZONE_SERVICE_UUID && c.uuid == ZONE_CHAR_UUID)
            .ok_or_else(|| anyhow!("Zone characteristic not found"))?;

        Ok(Self {
            peripheral,
            zone_char,
            notifications: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Find a device by name within the scan timeout.
    async fn find_device_by_name(
        adapter: &Adapter,
        name: &str,
        scan_timeout: Duration,
    ) -> Result<Peripheral> {
        let start = std::time::Instant::now();

        while start.elapsed() < scan_timeout {
            for peripheral in adapter.peripherals().await? {
                if let Some(props) = peripheral.properties().await? {
                    if props.local_name.as_deref() == Some(name) {
                        return Ok(peripheral);
                    }
                }
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        Err(anyhow!("Device '{}' not found within timeout", name))
    }

    /// Whether the zone service is among the discovered primary services.
    pub fn has_zone_service(&self) -> bool {
        self.peripheral
            .services()
            .iter()
            .any(|s| s.uuid == ZONE_SERVICE_UUID && s.primary)
    }

    pub fn zone_properties(&self) -> CharPropFlags {
        self.zone_char.properties
    }

    pub fn cccd(&self) -> Option<&Descriptor> {
        self.zone_char.descriptors.iter().find(|d| d.uuid == CCCD_UUID)
    }

    /// Read the zone characteristic value.
    pub async fn read_zone(&self) -> Result<Vec<u8>> {
        Ok(self.peripheral.read(&self.zone_char).await?)
    }

    /// Write raw bytes to the zone CCCD.
    pub async fn write_cccd(&self, data: &[u8]) -> Result<()> {
        let cccd = self.cccd().ok_or_else(|| anyhow!("Zone CCCD not found"))?;
        Ok(self.peripheral.write_descriptor(cccd, data).await?)
    }

    /// Raw notification stream for the zone characteristic.
    pub async fn zone_stream(&self) -> Result<BoxStream<'static, ValueNotification>> {
        let stream = self.peripheral.notifications().await?;
        Ok(stream.filter(|n| futures::future::ready(n.uuid == ZONE_CHAR_UUID)).boxed())
    }

    /// Enable notifications without collecting them.
    pub async fn enable_notifications(&self) -> Result<()> {
        Ok(self.peripheral.subscribe(&self.zone_char).await?)
    }

    /// Subscribe and collect zone notifications in the background.
    pub async fn subscribe(&self) -> Result<()> {
        let mut stream = self.zone_stream().await?;
        self.enable_notifications().await?;

        let buffer = self.notifications.clone();
        tokio::spawn(async move {
            while let Some(n) = stream.next().await {
                buffer.lock().await.push(n.value);
            }
        });

        Ok(())
    }

    pub async fn unsubscribe(&self) -> Result<()> {
        Ok(self.peripheral.unsubscribe(&self.zone_char).await?)
    }

    /// Wait for the next notification payload.
    pub async fn wait_for_notification(&self, wait: Duration) -> Result<Vec<u8>> {
        let result = timeout(wait, async {
            loop {
                {
                    let mut buf = self.notifications.lock().await;
                    if !buf.is_empty() {
                        return buf.remove(0);
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;

        result.map_err(|_| anyhow!("Timeout waiting for notification"))
    }

    /// Take every notification received so far.
    pub async fn drain_notifications(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.notifications.lock().await)
    }

    pub async fn is_connected(&self) -> Result<bool> {
        Ok(self.peripheral.is_connected().await?)
    }

    /// Disconnect from the device.
    pub async fn disconnect(&self) -> Result<()> {
        self.peripheral.disconnect().await?;
        Ok(())
    }
}
