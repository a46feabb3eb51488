//! Supervised spawning of the external tools.
//!
//! Each spawn pipes both output streams and drains them with two
//! independent tasks, so per-stream ordering is preserved while the relative
//! order across streams stays whatever the OS pipes deliver. The supervisor
//! resolves only after both streams close and the exit status is known.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::classify::classify;
use crate::core::{Channel, Tool};
use crate::error::{Result, RunnerError};
use crate::transport::EventSink;

/// Spawn `bin` with `args`, route its streams through the classifier into
/// `sink`, and return the exit code (-1 when the child died to a signal).
pub(crate) async fn run_supervised(
    tool: Tool,
    bin: &Path,
    args: &[String],
    sink: &Arc<dyn EventSink>,
) -> Result<i32> {
    debug!(tool = tool.name(), bin = %bin.display(), "spawning");

    let mut child = Command::new(bin)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| RunnerError::Spawn {
            tool: tool.name(),
            source,
        })?;

    let stdout = child.stdout.take().unwrap();
    let stderr = child.stderr.take().unwrap();

    let stdout_pump = spawn_pump(stdout, tool, Channel::Stdout, Arc::clone(sink));
    let stderr_pump = spawn_pump(stderr, tool, Channel::Stderr, Arc::clone(sink));

    let status = child.wait().await.map_err(|source| RunnerError::Spawn {
        tool: tool.name(),
        source,
    })?;

    let _ = stdout_pump.await;
    let _ = stderr_pump.await;

    let code = status.code().unwrap_or(-1);
    debug!(tool = tool.name(), code, "tool exited");
    Ok(code)
}

fn spawn_pump<R>(
    mut reader: R,
    tool: Tool,
    channel: Channel,
    sink: Arc<dyn EventSink>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    let chunk = String::from_utf8_lossy(&buf[..n]);
                    for event in classify(tool, channel, &chunk) {
                        sink.emit(event);
                    }
                }
                Err(e) => {
                    warn!(tool = tool.name(), ?channel, error = %e, "stream read failed");
                    break;
                }
            }
        }
    })
}
