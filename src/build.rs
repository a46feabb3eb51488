//! Build orchestration: workspace preparation, builder invocation,
//! exit-code interpretation.

use std::sync::Arc;

use tracing::info;

use crate::core::{BoardProfile, Tool};
use crate::error::{Result, RunnerError};
use crate::process;
use crate::transport::EventSink;
use crate::workspace::WorkspaceLayout;

pub(crate) async fn run_build(
    board: &BoardProfile,
    workspace: &WorkspaceLayout,
    sink: &Arc<dyn EventSink>,
    source: &[u8],
) -> Result<()> {
    workspace.ensure_build_dirs().await?;
    workspace.write_sketch(source).await?;

    let args = builder_args(board, workspace);
    info!(fqbn = %board.fqbn, "compiling sketch");
    let code = process::run_supervised(Tool::Builder, &workspace.builder_bin(), &args, sink).await?;
    map_build_exit(code)
}

fn builder_args(board: &BoardProfile, workspace: &WorkspaceLayout) -> Vec<String> {
    let mut args = vec![
        "-compile".to_string(),
        "-logger=human".to_string(),
        "-hardware".to_string(),
        workspace.hardware_dir().display().to_string(),
        "-tools".to_string(),
        workspace.tools_builder_dir().display().to_string(),
        "-tools".to_string(),
        workspace.avr_tools_dir().display().to_string(),
        "-built-in-libraries".to_string(),
        workspace.builtin_libraries_dir().display().to_string(),
    ];

    // The builder consults declared libraries paths in argument order, with
    // the built-in libraries as the final fallback, so extension libraries
    // must follow the built-in flag directly.
    if let Some(extensions) = workspace.extension_libraries_dir() {
        if extensions.exists() {
            args.push("-libraries".to_string());
            args.push(extensions.display().to_string());
        }
    }

    args.extend([
        "-fqbn".to_string(),
        board.fqbn.clone(),
        "-build-path".to_string(),
        workspace.build_dir().display().to_string(),
        "-build-cache".to_string(),
        workspace.cache_dir().display().to_string(),
        "-warnings=none".to_string(),
        "-verbose".to_string(),
        workspace.sketch_path().display().to_string(),
    ]);

    args
}

fn map_build_exit(code: i32) -> Result<()> {
    match code {
        0 => Ok(()),
        1 => Err(RunnerError::BuildFailed),
        2 => Err(RunnerError::SketchNotFound),
        3 => Err(RunnerError::InvalidArguments),
        4 => Err(RunnerError::UnknownPreference),
        other => Err(RunnerError::UnrecognizedExitCode {
            tool: Tool::Builder.name(),
            code: other,
        }),
    }
}
