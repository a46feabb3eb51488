use serde::{Deserialize, Serialize};

/// Identifies the target board and the parameters the programmer tool needs.
///
/// Immutable for the lifetime of one runner instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardProfile {
    /// Fully-qualified board name, e.g. `arduino:avr:leonardo`.
    pub fqbn: String,
    /// AVR part number passed to the programmer (`-p`).
    pub partno: String,
    /// Programmer protocol id passed to the programmer (`-c`).
    pub programmer_id: String,
    /// Upload baud rate passed to the programmer (`-b`).
    pub baudrate: u32,
}

/// A live serial device visible to the host.
///
/// The first 21 characters of `usb_identifier` (`USB\VID_xxxx&PID_xxxx`) are
/// the lookup key into the device directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peripheral {
    pub path: String,
    pub usb_identifier: String,
}

/// Which external tool a stream chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tool {
    Builder,
    Programmer,
}

impl Tool {
    pub fn name(self) -> &'static str {
        match self {
            Tool::Builder => "arduino-builder",
            Tool::Programmer => "avrdude",
        }
    }
}

/// Which stream of the tool a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    Stdout,
    Stderr,
}

/// Semantic tag attached to a classified span of tool output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// A read/write progress bar opened.
    ProgressStart,
    /// A progress bar closed at its percentage report.
    ProgressEnd,
    /// A summary banner (memory usage report, programmer sign-off).
    Banner,
    Error,
    Plain,
}

/// The unit emitted to the caller's output sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEvent {
    pub kind: EventKind,
    pub text: String,
}

impl OutputEvent {
    pub fn new(kind: EventKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(EventKind::Plain, text)
    }
}
