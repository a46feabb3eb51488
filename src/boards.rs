//! Static board knowledge: known profiles, which boards need the 1200-baud
//! touch reset, and which realtime firmware artifact each board runs.

use crate::core::BoardProfile;

impl BoardProfile {
    pub fn uno() -> Self {
        Self {
            fqbn: "arduino:avr:uno".to_string(),
            partno: "atmega328p".to_string(),
            programmer_id: "arduino".to_string(),
            baudrate: 115_200,
        }
    }

    pub fn leonardo() -> Self {
        Self {
            fqbn: "arduino:avr:leonardo".to_string(),
            partno: "atmega32u4".to_string(),
            programmer_id: "avr109".to_string(),
            baudrate: 57_600,
        }
    }

    pub fn mega2560() -> Self {
        Self {
            fqbn: "arduino:avr:mega:cpu=atmega2560".to_string(),
            partno: "atmega2560".to_string(),
            programmer_id: "wiring".to_string(),
            baudrate: 115_200,
        }
    }

    pub fn makey_makey() -> Self {
        Self {
            fqbn: "SparkFun:avr:makeymakey".to_string(),
            partno: "atmega32u4".to_string(),
            programmer_id: "avr109".to_string(),
            baudrate: 57_600,
        }
    }
}

/// Boards that enter their bootloader through the 1200-baud touch, paired
/// with the device name they re-enumerate under. Boards not listed here are
/// programmed over their original port without a reset handshake.
const TOUCH_RESET_BOARDS: &[(&str, &str)] = &[
    ("arduino:avr:leonardo", "Arduino Leonardo"),
    ("SparkFun:avr:makeymakey", "Makey Makey"),
];

/// Device name to rediscover after a touch reset, or `None` if the board
/// does not use the touch-reset sequence.
pub fn touch_reset_device(fqbn: &str) -> Option<&'static str> {
    TOUCH_RESET_BOARDS
        .iter()
        .find(|(board, _)| *board == fqbn)
        .map(|(_, device)| *device)
}

/// Prebuilt realtime-mode firmware image shipped per board, relative to the
/// tool installation's firmware directory.
const REALTIME_FIRMWARE: &[(&str, &str)] = &[
    ("arduino:avr:uno", "realtime-uno.hex"),
    ("arduino:avr:leonardo", "realtime-leonardo.hex"),
    ("arduino:avr:mega:cpu=atmega2560", "realtime-mega2560.hex"),
    ("SparkFun:avr:makeymakey", "realtime-makeymakey.hex"),
];

pub fn realtime_firmware(fqbn: &str) -> Option<&'static str> {
    REALTIME_FIRMWARE
        .iter()
        .find(|(board, _)| *board == fqbn)
        .map(|(_, file)| *file)
}
