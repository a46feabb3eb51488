pub mod boards;
pub mod build;
pub mod classify;
pub mod core;
pub mod devices;
pub mod error;
pub mod flash;
pub mod handshake;
mod process;
pub mod serial;
pub mod transport;
pub mod workspace;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::BoardProfile;
use crate::error::Result;
use crate::transport::{EventSink, SerialLink};
use crate::workspace::WorkspaceLayout;

/// Builds a sketch and flashes the resulting artifact onto the attached
/// board.
///
/// Operations are sequential per runner: callers must resolve a build's
/// outcome before starting a flash, and must not overlap two operations on
/// one runner (the `&mut self` receivers enforce this within one owner).
/// None of the operations support cancellation; a caller that wraps one in
/// its own timeout abandons the external tool rather than killing it.
#[async_trait]
pub trait SketchRunner {
    /// Write `sketch` into the workspace and compile it. The payload is
    /// expected to be already text-encoded by the caller.
    async fn build(&mut self, sketch: &[u8]) -> Result<()>;

    /// Upload `firmware`, or the artifact of the last build when `None`.
    /// Touch-reset boards get the bootloader handshake first; their port is
    /// re-resolved on every call.
    async fn flash(&mut self, firmware: Option<PathBuf>) -> Result<()>;
}

/// Orchestrates `arduino-builder` and `avrdude` for one board on one
/// workspace, over an injected serial transport and output sink.
pub struct ArduinoRunner {
    board: BoardProfile,
    workspace: WorkspaceLayout,
    port: String,
    link: Arc<dyn SerialLink>,
    sink: Arc<dyn EventSink>,
}

impl ArduinoRunner {
    pub fn new(
        board: BoardProfile,
        workspace: WorkspaceLayout,
        port: impl Into<String>,
        link: Arc<dyn SerialLink>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            board,
            workspace,
            port: port.into(),
            link,
            sink,
        }
    }

    pub fn board(&self) -> &BoardProfile {
        &self.board
    }

    pub fn workspace(&self) -> &WorkspaceLayout {
        &self.workspace
    }

    /// Upload the board's prebuilt realtime firmware from the static table,
    /// bypassing the build artifact entirely.
    pub async fn flash_realtime_firmware(&mut self) -> Result<()> {
        flash::run_flash_realtime(
            &self.board,
            &self.workspace,
            self.link.as_ref(),
            &self.sink,
            &self.port,
        )
        .await
    }
}

#[async_trait]
impl SketchRunner for ArduinoRunner {
    async fn build(&mut self, sketch: &[u8]) -> Result<()> {
        build::run_build(&self.board, &self.workspace, &self.sink, sketch).await
    }

    async fn flash(&mut self, firmware: Option<PathBuf>) -> Result<()> {
        flash::run_flash(
            &self.board,
            &self.workspace,
            self.link.as_ref(),
            &self.sink,
            &self.port,
            firmware.as_deref(),
        )
        .await
    }
}
