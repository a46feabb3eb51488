//! Known-device directory and post-reset port rediscovery.

use tracing::debug;

use crate::core::Peripheral;
use crate::error::{Result, RunnerError};

/// Sentinel returned for identifiers the directory does not know.
pub const UNKNOWN_DEVICE: &str = "Unknown device";

/// Length of the `USB\VID_xxxx&PID_xxxx` prefix used as the directory key.
pub const PNP_KEY_LEN: usize = 21;

/// PnP identifier prefix to human-readable device name. Bootloader-mode
/// product ids map to the same name as the runtime ids so a board that just
/// rebooted into its bootloader still resolves to itself.
const DEVICE_DIRECTORY: &[(&str, &str)] = &[
    ("USB\\VID_2341&PID_0001", "Arduino Uno"),
    ("USB\\VID_2341&PID_0043", "Arduino Uno"),
    ("USB\\VID_2A03&PID_0043", "Arduino Uno"),
    ("USB\\VID_2341&PID_0010", "Arduino Mega 2560"),
    ("USB\\VID_2341&PID_0042", "Arduino Mega 2560"),
    ("USB\\VID_2341&PID_8036", "Arduino Leonardo"),
    ("USB\\VID_2341&PID_0036", "Arduino Leonardo"),
    ("USB\\VID_1B4F&PID_2B74", "Makey Makey"),
    ("USB\\VID_1B4F&PID_2B75", "Makey Makey"),
    ("USB\\VID_0403&PID_6001", "Arduino Nano"),
    ("USB\\VID_1A86&PID_7523", "Arduino Uno"),
];

/// Pure lookup over the static table; never fails.
pub fn lookup(identifier_prefix: &str) -> &'static str {
    DEVICE_DIRECTORY
        .iter()
        .find(|(prefix, _)| *prefix == identifier_prefix)
        .map(|(_, name)| *name)
        .unwrap_or(UNKNOWN_DEVICE)
}

/// Resolve the port of the peripheral whose identifier maps to
/// `target_name`.
///
/// Scans the whole list; if several entries resolve to the target the last
/// one in scan order wins. An empty or absent list, or a full scan without a
/// match, is a [`RunnerError::DeviceNotFound`].
pub fn resolve_port(peripherals: &[Peripheral], target_name: &str) -> Result<String> {
    let mut resolved = None;
    for peripheral in peripherals {
        let key: String = peripheral.usb_identifier.chars().take(PNP_KEY_LEN).collect();
        let name = lookup(&key);
        debug!(path = %peripheral.path, %name, "scanned peripheral");
        if name == target_name {
            resolved = Some(peripheral.path.clone());
        }
    }

    resolved.ok_or_else(|| RunnerError::DeviceNotFound {
        device: target_name.to_string(),
    })
}
