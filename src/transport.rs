//! Capability seams: the serial transport the orchestrator drives and the
//! sink that receives classified tool output.

use async_trait::async_trait;

use crate::core::{EventKind, OutputEvent, Peripheral};
use crate::error::Result;

/// Serial-transport lifecycle operations, injected into the runner.
///
/// `list` may report `None` or an empty vector; both mean "no devices
/// visible" and are not transport errors.
#[async_trait]
pub trait SerialLink: Send + Sync {
    async fn connect(&self, path: &str, baudrate: u32, exclusive: bool) -> Result<()>;
    async fn disconnect(&self) -> Result<()>;
    async fn list(&self) -> Result<Option<Vec<Peripheral>>>;
}

/// Receives every classified output event, in per-stream emission order.
///
/// Rendering (colors, prefixes) is entirely the sink's concern; the events
/// carry the raw tool text.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: OutputEvent);
}

/// Renders events to the terminal, coloring tagged spans with ANSI escapes.
pub struct StdoutSink;

impl EventSink for StdoutSink {
    fn emit(&self, event: OutputEvent) {
        match event.kind {
            EventKind::Error => eprint!("\x1b[31m{}\x1b[0m", event.text),
            EventKind::Banner => print!("\x1b[32m{}\x1b[0m", event.text),
            EventKind::ProgressStart => print!("\x1b[36m{}", event.text),
            EventKind::ProgressEnd => print!("{}\x1b[0m", event.text),
            EventKind::Plain => print!("{}", event.text),
        }
    }
}

/// Discards every event. Useful when the caller only cares about outcomes.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: OutputEvent) {}
}
