//! [`SerialLink`] adapter over the `serialport` crate.
//!
//! The crate's calls are blocking, so each operation runs on the blocking
//! thread pool. Enumerated USB ports are reported with a synthesized
//! `USB\VID_xxxx&PID_xxxx` identifier, the same shape the device directory
//! keys on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serialport::{SerialPort, SerialPortType};
use tokio::task;
use tracing::{debug, info};

use crate::core::Peripheral;
use crate::error::{Result, RunnerError};
use crate::transport::SerialLink;

const OPEN_TIMEOUT: Duration = Duration::from_millis(500);

/// Live serial transport backed by the host's port list.
#[derive(Default)]
pub struct SystemSerialLink {
    handle: Arc<Mutex<Option<Box<dyn SerialPort>>>>,
}

impl SystemSerialLink {
    pub fn new() -> Self {
        Self::default()
    }
}

fn transport_error(path: &str, err: &serialport::Error) -> RunnerError {
    RunnerError::Transport {
        path: path.to_string(),
        message: err.to_string(),
    }
}

#[async_trait]
impl SerialLink for SystemSerialLink {
    async fn connect(&self, path: &str, baudrate: u32, exclusive: bool) -> Result<()> {
        let owned_path = path.to_string();
        let port = task::spawn_blocking(move || {
            serialport::new(&owned_path, baudrate)
                .timeout(OPEN_TIMEOUT)
                .open()
                .map_err(|e| transport_error(&owned_path, &e))
        })
        .await
        .map_err(|e| RunnerError::Transport {
            path: path.to_string(),
            message: e.to_string(),
        })??;

        info!(%path, baudrate, exclusive, "serial port opened");
        *self.handle.lock() = Some(port);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        // Dropping the handle closes the descriptor.
        let dropped = self.handle.lock().take();
        if dropped.is_some() {
            info!("serial port closed");
        }
        Ok(())
    }

    async fn list(&self) -> Result<Option<Vec<Peripheral>>> {
        let ports = task::spawn_blocking(serialport::available_ports)
            .await
            .map_err(|e| RunnerError::Transport {
                path: String::new(),
                message: e.to_string(),
            })?;

        let ports = match ports {
            Ok(ports) => ports,
            Err(e) => {
                debug!(error = %e, "port enumeration failed");
                return Ok(None);
            }
        };

        let peripherals: Vec<Peripheral> = ports
            .into_iter()
            .filter_map(|port| match port.port_type {
                SerialPortType::UsbPort(usb) => Some(Peripheral {
                    path: port.port_name,
                    usb_identifier: format!("USB\\VID_{:04X}&PID_{:04X}", usb.vid, usb.pid),
                }),
                _ => None,
            })
            .collect();

        debug!(count = peripherals.len(), "enumerated usb serial ports");
        Ok(Some(peripherals))
    }
}
