//! Flash orchestration: optional bootloader handshake, per-call target
//! resolution, programmer invocation, exit-code interpretation.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::info;

use crate::boards;
use crate::core::{BoardProfile, Tool};
use crate::error::{Result, RunnerError};
use crate::handshake;
use crate::process;
use crate::transport::{EventSink, SerialLink};
use crate::workspace::WorkspaceLayout;

/// Wait after a successful upload to a touch-reset board, while it leaves
/// the bootloader and re-enumerates under its runtime USB identity.
pub const REENUMERATION_SETTLE: Duration = Duration::from_millis(1000);

pub(crate) async fn run_flash(
    board: &BoardProfile,
    workspace: &WorkspaceLayout,
    link: &dyn SerialLink,
    sink: &Arc<dyn EventSink>,
    port: &str,
    firmware: Option<&Path>,
) -> Result<()> {
    let touch_device = boards::touch_reset_device(&board.fqbn);

    // The resolved target lives only for this call. A rediscovered path is
    // never cached on the runner, so a later flash cannot pick up a stale
    // port from an earlier board reset.
    let target = match touch_device {
        Some(device) => handshake::touch_reset(link, port, device).await?,
        None => port.to_string(),
    };

    let firmware = firmware
        .map(Path::to_path_buf)
        .unwrap_or_else(|| workspace.artifact_path());
    let args = programmer_args(board, workspace, &target, &firmware);

    info!(fqbn = %board.fqbn, port = %target, firmware = %firmware.display(), "uploading");
    let code =
        process::run_supervised(Tool::Programmer, &workspace.avrdude_bin(), &args, sink).await?;
    map_flash_exit(code)?;

    if touch_device.is_some() {
        sleep(REENUMERATION_SETTLE).await;
    }
    Ok(())
}

/// Upload the board's prebuilt realtime firmware instead of the last build
/// artifact. Fails for boards without a table entry; it never falls back to
/// the default artifact path.
pub(crate) async fn run_flash_realtime(
    board: &BoardProfile,
    workspace: &WorkspaceLayout,
    link: &dyn SerialLink,
    sink: &Arc<dyn EventSink>,
    port: &str,
) -> Result<()> {
    let file = boards::realtime_firmware(&board.fqbn).ok_or_else(|| {
        RunnerError::NoRealtimeFirmware {
            fqbn: board.fqbn.clone(),
        }
    })?;
    let firmware = workspace.firmware_path(file);
    run_flash(board, workspace, link, sink, port, Some(&firmware)).await
}

fn programmer_args(
    board: &BoardProfile,
    workspace: &WorkspaceLayout,
    target: &str,
    firmware: &Path,
) -> Vec<String> {
    vec![
        format!("-C{}", workspace.avrdude_conf().display()),
        "-v".to_string(),
        format!("-p{}", board.partno),
        format!("-c{}", board.programmer_id),
        format!("-P{}", target),
        format!("-b{}", board.baudrate),
        "-D".to_string(),
        format!("-Uflash:w:{}:i", firmware.display()),
    ]
}

fn map_flash_exit(code: i32) -> Result<()> {
    match code {
        0 => Ok(()),
        1 => Err(RunnerError::FlashFailed),
        other => Err(RunnerError::UnrecognizedExitCode {
            tool: Tool::Programmer.name(),
            code: other,
        }),
    }
}
