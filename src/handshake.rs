//! Bootloader-entry handshake for touch-reset boards.
//!
//! Opening and closing the serial connection at 1200 baud signals the board
//! to reboot into its bootloader. The board then re-enumerates on the USB
//! bus, usually under a different device path, so the handshake finishes by
//! rescanning the peripheral list for the expected device.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info};

use crate::devices;
use crate::error::Result;
use crate::transport::SerialLink;

/// Magic baud rate boards interpret as a reset request.
pub const TOUCH_BAUD: u32 = 1200;

/// Wait after the 1200-baud open, letting the open register on the device.
pub const SETTLE_AFTER_OPEN: Duration = Duration::from_millis(100);

/// Wait after the close, while the board reboots into its bootloader and
/// the OS re-enumerates it. A plain timeout, not an event wait: there is no
/// ready signal to listen for.
pub const SETTLE_AFTER_CLOSE: Duration = Duration::from_millis(1000);

/// Perform the touch reset on `port` and rediscover the board as
/// `target_device`, returning its new device path.
pub async fn touch_reset(
    link: &dyn SerialLink,
    port: &str,
    target_device: &str,
) -> Result<String> {
    info!(%port, device = target_device, "touching port at {} baud", TOUCH_BAUD);
    link.connect(port, TOUCH_BAUD, true).await?;
    sleep(SETTLE_AFTER_OPEN).await;
    link.disconnect().await?;
    sleep(SETTLE_AFTER_CLOSE).await;

    let peripherals = link.list().await?.unwrap_or_default();
    debug!(count = peripherals.len(), "rescanning for {}", target_device);
    let resolved = devices::resolve_port(&peripherals, target_device)?;
    info!(path = %resolved, "board rediscovered");
    Ok(resolved)
}
