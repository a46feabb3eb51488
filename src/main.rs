use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;

use sketch_runner::core::BoardProfile;
use sketch_runner::serial::SystemSerialLink;
use sketch_runner::transport::StdoutSink;
use sketch_runner::workspace::WorkspaceLayout;
use sketch_runner::{ArduinoRunner, SketchRunner};

fn board_by_name(name: &str) -> Option<BoardProfile> {
    match name {
        "uno" => Some(BoardProfile::uno()),
        "leonardo" => Some(BoardProfile::leonardo()),
        "mega2560" => Some(BoardProfile::mega2560()),
        "makeymakey" => Some(BoardProfile::makey_makey()),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 4 {
        bail!("usage: sketch-runner <uno|leonardo|mega2560|makeymakey> <port> <sketch.ino>");
    }

    let Some(board) = board_by_name(&args[1]) else {
        bail!("unknown board: {}", args[1]);
    };
    let port = args[2].clone();
    let sketch = tokio::fs::read(&args[3])
        .await
        .with_context(|| format!("reading sketch {}", args[3]))?;

    let root = env::var("SKETCH_WORKSPACE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("sketch-runner"));
    let arduino_dir = env::var("ARDUINO_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| root.join("Arduino"));
    let extensions = env::var("EXTENSION_LIBRARIES").ok().map(PathBuf::from);

    let workspace = WorkspaceLayout::new(root, arduino_dir, extensions);
    let mut runner = ArduinoRunner::new(
        board,
        workspace,
        port,
        Arc::new(SystemSerialLink::new()),
        Arc::new(StdoutSink),
    );

    info!("building sketch");
    runner.build(&sketch).await?;

    info!("flashing board");
    runner.flash(None).await?;

    info!("done");
    Ok(())
}
